use crate::config::{STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::symbol::{sym, SymbolTable};
use crate::value::Value;

const NBSP: char = '\u{a0}';

/// Recursive-descent reader over a single line of text.
/// One character of lookahead, explicit cursor.
pub struct Reader<'a> {
    input: Vec<char>,
    pos: usize,
    /// Lists and quotes currently open.
    depth: usize,
    heap: &'a mut Heap,
    symbols: &'a mut SymbolTable,
}

/// Read the first form on a line. An empty line reads as nil.
pub fn read_line(line: &str, heap: &mut Heap, symbols: &mut SymbolTable) -> LispResult<Value> {
    Reader::new(line, heap, symbols).read()
}

impl<'a> Reader<'a> {
    pub fn new(input: &str, heap: &'a mut Heap, symbols: &'a mut SymbolTable) -> Self {
        Reader {
            input: input.chars().collect(),
            pos: 0,
            depth: 0,
            heap,
            symbols,
        }
    }

    /// Read one form. End of input yields nil, as does a stray `)`.
    ///
    /// Every open list or quote costs at least one cell, so nesting deeper
    /// than the free cells can never complete and is refused up front.
    pub fn read(&mut self) -> LispResult<Value> {
        if self.depth > self.heap.free_count() {
            return Err(LispError::StackExhausted);
        }
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.read_form());
        self.depth -= 1;
        result
    }

    fn read_form(&mut self) -> LispResult<Value> {
        self.skip_spaces();
        match self.peek() {
            None => Ok(Value::Nil),
            Some('(') => {
                self.advance();
                self.read_list()
            }
            Some(')') => {
                self.advance();
                Ok(Value::Nil)
            }
            Some('\'') => {
                self.advance();
                let inner = self.read()?;
                self.heap.quote(inner)
            }
            Some('-') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                let n = self.read_number();
                self.heap.number(-n)
            }
            Some(c) if c.is_ascii_digit() => {
                let n = self.read_number();
                self.heap.number(n)
            }
            Some(_) => self.read_symbol(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }
    }

    /// Read list elements after an opening `(` up to the matching `)` or end
    /// of input. Produces a nil-terminated chain, or a dotted tail when the
    /// elements are followed by ` . x`.
    fn read_list(&mut self) -> LispResult<Value> {
        let mut elements = Vec::new();
        let mut tail = Value::Nil;

        loop {
            self.skip_spaces();
            match self.peek() {
                None => break,
                Some(')') => {
                    self.advance();
                    break;
                }
                Some('.') if !elements.is_empty() && self.is_dot_separator() => {
                    self.advance();
                    tail = self.read()?;
                    self.skip_spaces();
                    if self.peek() == Some(')') {
                        self.advance();
                    }
                    break;
                }
                Some(_) => elements.push(self.read()?),
            }
        }

        let mut result = tail;
        for val in elements.into_iter().rev() {
            result = self.heap.cons(val, result)?;
        }
        Ok(result)
    }

    /// A `.` is a separator only when it stands alone as a token.
    fn is_dot_separator(&self) -> bool {
        match self.peek_at(1) {
            None => true,
            Some(next) => is_delimiter(next),
        }
    }

    /// Integer digits, then an optional `.` and fraction digits, then an
    /// optional `E[+-]dd` exponent as written by the printer.
    fn read_number(&mut self) -> f64 {
        let mut value = 0.0;
        let mut scale = 1.0;

        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            value = value * 10.0 + d as f64;
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
                value = value * 10.0 + d as f64;
                scale *= 10.0;
                self.pos += 1;
            }
            value /= scale;
        }
        if let Some(exp) = self.read_exponent() {
            value *= 10f64.powi(exp);
        }
        value
    }

    fn read_exponent(&mut self) -> Option<i32> {
        if self.peek() != Some('E') {
            return None;
        }
        let (negative, digits_at) = match self.peek_at(1) {
            Some('-') => (true, 2),
            Some('+') => (false, 2),
            _ => (false, 1),
        };
        if !self.peek_at(digits_at).is_some_and(|c| c.is_ascii_digit()) {
            return None;
        }
        self.pos += digits_at;
        let mut exp = 0i32;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(10)) {
            exp = exp.saturating_mul(10).saturating_add(d as i32);
            self.pos += 1;
        }
        Some(if negative { -exp } else { exp })
    }

    fn read_symbol(&mut self) -> LispResult<Value> {
        let start = self.pos;
        // The first character is taken unconditionally.
        self.pos += 1;
        while self.peek().is_some_and(|c| !is_delimiter(c)) {
            self.pos += 1;
        }
        let name: String = self.input[start..self.pos].iter().collect();
        match name.as_str() {
            "-" => Ok(Value::Symbol(sym::MINUS)),
            // Non-finite numbers as the printer writes them.
            "INF" => self.heap.number(f64::INFINITY),
            "-INF" => self.heap.number(f64::NEG_INFINITY),
            "NAN" => self.heap.number(f64::NAN),
            _ => Ok(Value::Symbol(self.symbols.intern(&name))),
        }
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | NBSP | '\t' | '\r' | '\n')
}

fn is_delimiter(c: char) -> bool {
    is_space(c) || matches!(c, '(' | ')' | '\'')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Tag;

    fn read(input: &str) -> (Value, Heap, SymbolTable) {
        let mut heap = Heap::new(256);
        let mut symbols = SymbolTable::new();
        let val = read_line(input, &mut heap, &mut symbols).unwrap();
        (val, heap, symbols)
    }

    #[test]
    fn test_read_numbers() {
        let (val, heap, _) = read("42");
        assert_eq!(heap.num(val), 42.0);

        let (val, heap, _) = read("  3.25");
        assert_eq!(heap.num(val), 3.25);

        let (val, heap, _) = read("-7.5");
        assert_eq!(heap.num(val), -7.5);

        let (val, heap, _) = read("1.500000E+03");
        assert_eq!(heap.num(val), 1500.0);

        let (val, heap, _) = read("2.000000E-02");
        assert!((heap.num(val) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_minus_alone_is_symbol() {
        let (val, _, symbols) = read("-");
        assert_eq!(val, Value::Symbol(sym::MINUS));
        assert_eq!(symbols.name(sym::MINUS), "-");

        let (val, _, symbols) = read("-X");
        assert_eq!(symbols.name(val.as_symbol().unwrap()), "-X");
    }

    #[test]
    fn test_symbols_keep_case() {
        let (val, _, mut symbols) = read("Foo");
        assert_eq!(val, Value::Symbol(symbols.intern("Foo")));
        assert_ne!(val, Value::Symbol(symbols.intern("FOO")));
    }

    #[test]
    fn test_read_list() {
        let (val, heap, mut symbols) = read("(+ 1 (CAR X))");
        let items = heap.list_to_vec(val);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Value::Symbol(symbols.intern("+")));
        assert_eq!(heap.num(items[1]), 1.0);
        let inner = heap.list_to_vec(items[2]);
        assert_eq!(inner[0], Value::Symbol(symbols.intern("CAR")));
        assert_eq!(inner[1], Value::Symbol(symbols.intern("X")));
    }

    #[test]
    fn test_empty_list_and_empty_input() {
        let (val, _, _) = read("()");
        assert_eq!(val, Value::Nil);

        let (val, _, _) = read("   ");
        assert_eq!(val, Value::Nil);

        let (val, _, _) = read(")");
        assert_eq!(val, Value::Nil);
    }

    #[test]
    fn test_unterminated_list_closes_at_end_of_line() {
        let (val, heap, _) = read("(1 2");
        assert_eq!(heap.list_to_vec(val).len(), 2);
        assert_eq!(heap.cdr(heap.cdr(val)), Value::Nil);
    }

    #[test]
    fn test_quote_wraps_single_form() {
        let (val, heap, _) = read("'(1 2)");
        assert_eq!(heap.tag(val), Tag::Quote);

        let (val, heap, _) = read("('A B)");
        let items = heap.list_to_vec(val);
        assert_eq!(items.len(), 2);
        assert_eq!(heap.tag(items[0]), Tag::Quote);
        assert_eq!(heap.tag(items[1]), Tag::Symbol);
    }

    #[test]
    fn test_delimiters_split_symbols() {
        let (val, heap, symbols) = read("(A'B\u{a0}C)");
        let items = heap.list_to_vec(val);
        assert_eq!(items.len(), 3);
        assert_eq!(symbols.name(items[0].as_symbol().unwrap()), "A");
        assert_eq!(heap.tag(items[1]), Tag::Quote);
        assert_eq!(symbols.name(items[2].as_symbol().unwrap()), "C");
    }

    #[test]
    fn test_dotted_tail() {
        let (val, heap, _) = read("(1 . 2)");
        assert_eq!(heap.num(heap.car(val)), 1.0);
        assert_eq!(heap.num(heap.cdr(val)), 2.0);

        let (val, _, symbols) = read(".");
        assert_eq!(symbols.name(val.as_symbol().unwrap()), ".");
    }

    #[test]
    fn test_read_non_finite_numbers() {
        let (val, heap, _) = read("INF");
        assert_eq!(heap.num(val), f64::INFINITY);

        let (val, heap, _) = read("(-INF NAN)");
        let items = heap.list_to_vec(val);
        assert_eq!(heap.num(items[0]), f64::NEG_INFINITY);
        assert!(heap.num(items[1]).is_nan());

        let (val, _, symbols) = read("INFO");
        assert_eq!(symbols.name(val.as_symbol().unwrap()), "INFO");
    }

    #[test]
    fn test_nesting_beyond_free_cells_is_refused() {
        let mut heap = Heap::new(64);
        let mut symbols = SymbolTable::new();
        let line = format!("'{}{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(
            read_line(&line, &mut heap, &mut symbols),
            Err(LispError::StackExhausted)
        );

        let line = format!("{}{}", "(".repeat(40), ")".repeat(40));
        let val = read_line(&line, &mut heap, &mut symbols).unwrap();
        assert_eq!(heap.tag(val), Tag::Cons);
    }
}
