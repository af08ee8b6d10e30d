use crate::config::{STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::heap::{Cell, Heap};
use crate::symbol::{sym, SymbolTable};
use crate::value::{SymbolId, Value};

/// Print a value to a string. This is the canonical surface shared by the
/// output device, `:EDIT` and `:SAVE`.
///
/// A top-level nil prints as `NIL`; nested nils print as `()` so that the
/// text reads back as the same structure.
pub fn print_val(val: Value, heap: &Heap, symbols: &SymbolTable) -> String {
    if val.is_nil() {
        return symbols.name(sym::NIL).to_string();
    }
    let mut out = String::new();
    print_inner(val, heap, symbols, &mut out);
    out
}

fn print_inner(val: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String) {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
        print_form(val, heap, symbols, out)
    })
}

fn print_form(val: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String) {
    match val {
        Value::Nil => out.push_str("()"),
        Value::Symbol(id) => out.push_str(symbols.name(id)),
        Value::Cell(_) => match heap.get(val) {
            Some(Cell::Number(n)) => out.push_str(&format_number(n)),
            Some(Cell::Cons(car, cdr)) => {
                out.push('(');
                print_items(car, cdr, heap, symbols, out);
                out.push(')');
            }
            Some(Cell::Lambda(params, body)) => {
                open_form(sym::LAMBDA, symbols, out);
                print_items(params, body, heap, symbols, out);
                out.push(')');
            }
            Some(Cell::Quote(inner)) => {
                out.push('\'');
                print_inner(inner, heap, symbols, out);
            }
            Some(Cell::Builtin(prim)) => {
                out.push_str("#<builtin:");
                out.push_str(prim.name());
                out.push('>');
            }
            Some(Cell::Free(_)) | None => out.push_str("#<free>"),
        },
    }
}

/// Print `first` followed by the elements of `rest`, space separated, with an
/// improper tail rendered as `. tail`.
fn print_items(first: Value, rest: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String) {
    print_inner(first, heap, symbols, out);
    let mut current = rest;
    loop {
        match heap.get(current) {
            _ if current.is_nil() => break,
            Some(Cell::Cons(car, cdr)) => {
                out.push(' ');
                print_inner(car, heap, symbols, out);
                current = cdr;
            }
            _ => {
                out.push_str(" . ");
                print_inner(current, heap, symbols, out);
                break;
            }
        }
    }
}

/// The source form that recreates a binding: `(DEFUN name params body...)`
/// for closures, `(SETQ name 'value)` for data. Builtins have no source form.
pub fn definition_form(
    name: Value,
    value: Value,
    heap: &Heap,
    symbols: &SymbolTable,
) -> Option<String> {
    let mut out = String::new();
    match heap.get(value) {
        Some(Cell::Builtin(_)) | Some(Cell::Free(_)) => return None,
        Some(Cell::Lambda(params, body)) => {
            open_form(sym::DEFUN, symbols, &mut out);
            print_inner(name, heap, symbols, &mut out);
            out.push(' ');
            print_items(params, body, heap, symbols, &mut out);
        }
        _ if value.is_nil() => {
            open_form(sym::SETQ, symbols, &mut out);
            print_inner(name, heap, symbols, &mut out);
            out.push(' ');
            out.push_str(symbols.name(sym::NIL));
        }
        _ => {
            open_form(sym::SETQ, symbols, &mut out);
            print_inner(name, heap, symbols, &mut out);
            out.push_str(" '");
            print_inner(value, heap, symbols, &mut out);
        }
    }
    out.push(')');
    Some(out)
}

/// `(NAME ` for a form headed by a well-known symbol.
fn open_form(head: SymbolId, symbols: &SymbolTable, out: &mut String) {
    out.push('(');
    out.push_str(symbols.name(head));
    out.push(' ');
}

/// Format a number as decimal text.
///
/// Integers below 10^7 print without a fraction. Other values print in fixed
/// point with `6 - exponent` fraction digits, or in scientific notation
/// (`d.ddddddE+dd`) when the decimal exponent is negative or above 6.
pub fn format_number(value: f64) -> String {
    let mut out = String::new();
    let mut f = value;
    if f < 0.0 {
        f = -f;
        out.push('-');
    }
    if f.is_nan() {
        out.push_str("NAN");
        return out;
    }
    if f.is_infinite() {
        out.push_str("INF");
        return out;
    }

    let fraction = f != f.floor() || f >= 10_000_000.0;

    // Scale into [1, 10), first in steps of 1000, then of 10.
    let mut exp: i32 = 0;
    if f != 0.0 {
        while f >= 1000.0 {
            f /= 1000.0;
            exp += 3;
        }
        while f < 1.0 {
            f *= 1000.0;
            exp -= 3;
        }
        while f >= 10.0 {
            f /= 10.0;
            exp += 1;
        }
    }

    let mut scientific = fraction && !(0..=6).contains(&exp);
    let mut fdigits: i32 = match (fraction, scientific) {
        (false, _) => 0,
        (true, true) => 6,
        (true, false) => 6 - exp,
    };

    if scientific {
        f += 0.5 / 10f64.powi(fdigits);
        if f >= 10.0 {
            f /= 10.0;
            exp += 1;
        }
    } else {
        f += 0.5 / 10f64.powi(fdigits + exp);
        if f >= 10.0 {
            // Rounding carried into a new leading digit. Past 10^7 the value
            // no longer fits fixed point.
            f /= 10.0;
            exp += 1;
            if fraction && exp > 6 {
                scientific = true;
                fdigits = 6;
            } else {
                fdigits = (fdigits - 1).max(0);
            }
        }
    }
    let digits = if scientific { fdigits + 1 } else { fdigits + exp + 1 };

    let int_digits = digits - fdigits;
    for i in 0..digits.min(20) {
        if i == int_digits {
            out.push('.');
        }
        let d = (f as u32).min(9);
        f = (f - d as f64) * 10.0;
        out.push(char::from_digit(d, 10).unwrap_or('0'));
    }

    if scientific {
        out.push('E');
        out.push(if exp < 0 { '-' } else { '+' });
        out.push_str(&format!("{:02}", exp.abs()));
    }
    out
}
