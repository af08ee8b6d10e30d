use tracing::debug;

use crate::error::LispResult;
use crate::eval::{Machine, Scope};
use crate::globals::env_bindings;
use crate::printer::definition_form;
use crate::reader::read_line;
use crate::symbol::sym;
use crate::value::Value;

/// A native primitive. Builtins are ordinary values bound in the global
/// scope; this enum is what a builtin cell carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Add,
    Mul,
    Sub,
    Div,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Cons,
    Car,
    Cdr,
    Setq,
    Lambda,
    If,
    Let,
    Defun,
    List,
    Save,
    Load,
    Edit,
    Reset,
}

impl Primitive {
    /// Every primitive, in installation order.
    pub const ALL: &'static [Primitive] = &[
        Primitive::Add,
        Primitive::Mul,
        Primitive::Sub,
        Primitive::Div,
        Primitive::Equal,
        Primitive::NotEqual,
        Primitive::Less,
        Primitive::Greater,
        Primitive::LessEqual,
        Primitive::GreaterEqual,
        Primitive::Cons,
        Primitive::Car,
        Primitive::Cdr,
        Primitive::Setq,
        Primitive::Lambda,
        Primitive::If,
        Primitive::Let,
        Primitive::Defun,
        Primitive::List,
        Primitive::Save,
        Primitive::Load,
        Primitive::Edit,
        Primitive::Reset,
    ];

    /// The global name the primitive is bound to.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Add => "+",
            Primitive::Mul => "*",
            Primitive::Sub => "-",
            Primitive::Div => "/",
            Primitive::Equal => "=",
            Primitive::NotEqual => "/=",
            Primitive::Less => "<",
            Primitive::Greater => ">",
            Primitive::LessEqual => "<=",
            Primitive::GreaterEqual => ">=",
            Primitive::Cons => "CONS",
            Primitive::Car => "CAR",
            Primitive::Cdr => "CDR",
            Primitive::Setq => "SETQ",
            Primitive::Lambda => "LAMBDA",
            Primitive::If => "IF",
            Primitive::Let => "LET",
            Primitive::Defun => "DEFUN",
            Primitive::List => ":LIST",
            Primitive::Save => ":SAVE",
            Primitive::Load => ":LOAD",
            Primitive::Edit => ":EDIT",
            Primitive::Reset => ":RESET",
        }
    }
}

/// Dispatch a primitive call.
/// `args` is the unevaluated operand list; each primitive evaluates what it
/// needs in `scope`.
pub fn call_primitive(
    m: &mut Machine,
    prim: Primitive,
    scope: &mut Scope,
    args: Value,
) -> LispResult<Value> {
    match prim {
        Primitive::Add => prim_fold(m, scope, args, |a, b| a + b),
        Primitive::Mul => prim_fold(m, scope, args, |a, b| a * b),
        Primitive::Sub => prim_fold(m, scope, args, |a, b| a - b),
        Primitive::Div => prim_fold(m, scope, args, |a, b| a / b),
        Primitive::Equal => prim_compare(m, scope, args, |a, b| a == b),
        Primitive::NotEqual => prim_compare(m, scope, args, |a, b| a != b),
        Primitive::Less => prim_compare(m, scope, args, |a, b| a < b),
        Primitive::Greater => prim_compare(m, scope, args, |a, b| a > b),
        Primitive::LessEqual => prim_compare(m, scope, args, |a, b| a <= b),
        Primitive::GreaterEqual => prim_compare(m, scope, args, |a, b| a >= b),
        Primitive::Cons => prim_cons(m, scope, args),
        Primitive::Car => {
            let val = eval_nth(m, scope, args, 0)?;
            Ok(m.heap.car(val))
        }
        Primitive::Cdr => {
            let val = eval_nth(m, scope, args, 0)?;
            Ok(m.heap.cdr(val))
        }
        Primitive::Setq => prim_setq(m, scope, args),
        Primitive::Lambda => {
            let (params, body) = (m.heap.car(args), m.heap.cdr(args));
            m.heap.lambda(params, body)
        }
        Primitive::If => prim_if(m, scope, args),
        Primitive::Let => prim_let(m, scope, args),
        Primitive::Defun => prim_defun(m, scope, args),
        Primitive::List => prim_list(m, scope),
        Primitive::Save => prim_save(m),
        Primitive::Load => prim_load(m),
        Primitive::Edit => prim_edit(m, scope, args),
        Primitive::Reset => {
            m.reset()?;
            debug!("global scope reset");
            Ok(Value::Nil)
        }
    }
}

/// The n-th operand expression of `args`, nil if missing.
fn nth(m: &Machine, args: Value, n: usize) -> Value {
    let mut current = args;
    for _ in 0..n {
        current = m.heap.cdr(current);
    }
    m.heap.car(current)
}

fn eval_nth(m: &mut Machine, scope: &mut Scope, args: Value, n: usize) -> LispResult<Value> {
    let expr = nth(m, args, n);
    m.eval(scope, expr)
}

/// Evaluate the n-th operand as a number; non-numbers read as 0.
fn eval_number(m: &mut Machine, scope: &mut Scope, args: Value, n: usize) -> LispResult<f64> {
    let val = eval_nth(m, scope, args, n)?;
    Ok(m.heap.num(val))
}

/// (+ a b ...) and friends: left fold starting from the first operand.
fn prim_fold(
    m: &mut Machine,
    scope: &mut Scope,
    args: Value,
    op: impl Fn(f64, f64) -> f64,
) -> LispResult<Value> {
    let mut acc = eval_number(m, scope, args, 0)?;
    let mut rest = m.heap.cdr(args);
    while !rest.is_nil() {
        let n = eval_number(m, scope, rest, 0)?;
        acc = op(acc, n);
        rest = m.heap.cdr(rest);
    }
    m.heap.number(acc)
}

/// (= a b) and friends: compare the first two operands, T or nil.
fn prim_compare(
    m: &mut Machine,
    scope: &mut Scope,
    args: Value,
    op: impl Fn(f64, f64) -> bool,
) -> LispResult<Value> {
    let a = eval_number(m, scope, args, 0)?;
    let b = eval_number(m, scope, args, 1)?;
    Ok(truth(op(a, b)))
}

fn truth(b: bool) -> Value {
    if b {
        Value::Symbol(sym::T)
    } else {
        Value::Nil
    }
}

/// (CONS a b): create a new pair.
fn prim_cons(m: &mut Machine, scope: &mut Scope, args: Value) -> LispResult<Value> {
    let car = eval_nth(m, scope, args, 0)?;
    let cdr = eval_nth(m, scope, args, 1)?;
    m.heap.cons(car, cdr)
}

/// (SETQ name expr): bind-or-update, returns the value.
fn prim_setq(m: &mut Machine, scope: &mut Scope, args: Value) -> LispResult<Value> {
    let val = eval_nth(m, scope, args, 1)?;
    let name = m.heap.car(args);
    m.bind(scope, name, val)?;
    Ok(val)
}

/// (DEFUN name params body...): bind a new closure, returns it.
fn prim_defun(m: &mut Machine, scope: &mut Scope, args: Value) -> LispResult<Value> {
    let name = m.heap.car(args);
    let rest = m.heap.cdr(args);
    let (params, body) = (m.heap.car(rest), m.heap.cdr(rest));
    let lambda = m.heap.lambda(params, body)?;
    m.bind(scope, name, lambda)?;
    Ok(lambda)
}

/// (IF cond then else)
fn prim_if(m: &mut Machine, scope: &mut Scope, args: Value) -> LispResult<Value> {
    let cond = eval_nth(m, scope, args, 0)?;
    if cond.is_nil() {
        eval_nth(m, scope, args, 2)
    } else {
        eval_nth(m, scope, args, 1)
    }
}

/// (LET ((name init) ...) body...): parallel binding, every initializer
/// sees the outer scope only.
fn prim_let(m: &mut Machine, scope: &mut Scope, args: Value) -> LispResult<Value> {
    let mut frame = m.scope_head(scope);
    for var in m.heap.list_to_vec(m.heap.car(args)) {
        let init = nth(m, var, 1);
        let val = m.eval(scope, init)?;
        let name = m.heap.car(var);
        let binding = m.heap.cons(name, val)?;
        frame = m.heap.cons(binding, frame)?;
    }
    let body = m.heap.cdr(args);
    m.eval_body(&mut Scope::Local(&mut frame), body)
}

/// (:LIST): every symbol bound in the current scope chain, oldest first.
fn prim_list(m: &mut Machine, scope: &mut Scope) -> LispResult<Value> {
    let head = m.scope_head(scope);
    let names: Vec<Value> = env_bindings(head, &m.heap)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    m.heap.list(&names)
}

/// (:SAVE): write every global binding except builtins as a source form,
/// one per line, oldest first.
fn prim_save(m: &mut Machine) -> LispResult<Value> {
    let mut text = String::new();
    let mut count = 0;
    for (name, value) in env_bindings(m.globe, &m.heap) {
        if name == Value::Symbol(sym::NIL) {
            continue;
        }
        if let Some(form) = definition_form(name, value, &m.heap, &m.symbols) {
            text.push_str(&form);
            text.push('\n');
            count += 1;
        }
    }
    m.storage().write(&text)?;
    debug!(forms = count, "saved");
    Ok(Value::Symbol(sym::T))
}

/// (:LOAD): evaluate every stored line as a top-level form.
fn prim_load(m: &mut Machine) -> LispResult<Value> {
    let lines = m.storage().read_lines()?;
    let mut count = 0;
    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        let form = read_line(line, &mut m.heap, &mut m.symbols)?;
        m.eval(&mut Scope::Global, form)?;
        count += 1;
    }
    debug!(forms = count, "loaded");
    Ok(Value::Symbol(sym::T))
}

/// (:EDIT name): queue the binding's source form for the line editor.
fn prim_edit(m: &mut Machine, scope: &mut Scope, args: Value) -> LispResult<Value> {
    let name = m.heap.car(args);
    let value = m.eval(scope, name)?;
    let text = definition_form(name, value, &m.heap, &m.symbols);
    m.set_edit(text);
    Ok(name)
}
