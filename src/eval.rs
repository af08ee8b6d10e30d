use tracing::{trace, warn};

use crate::config::{Config, STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::error::{LispError, LispResult};
use crate::globals::{self, env_lookup, env_set};
use crate::heap::{Cell, Heap};
use crate::primitives;
use crate::printer;
use crate::reader;
use crate::storage::{FileStorage, Storage};
use crate::symbol::SymbolTable;
use crate::value::Value;

/// The scope an evaluation step runs in.
///
/// `Global` is the machine's own global chain; `Local` is a frame chain owned
/// by a closure call or `LET`. Either way the chain is a list of
/// (symbol . value) pairs, and bindings added at this level are prepended to
/// the head held here.
pub enum Scope<'a> {
    Global,
    Local(&'a mut Value),
}

/// One finished top-level cycle, both sides unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub form: String,
    pub value: String,
}

/// The interpreter session.
/// All interpreter state lives here so GC can find its one root.
pub struct Machine {
    pub heap: Heap,
    pub symbols: SymbolTable,

    /// The global scope: alist of (name . value) pairs, newest first.
    pub globe: Value,

    storage: Box<dyn Storage>,
    /// Source text produced by `:EDIT`, waiting for the line editor.
    pending_edit: Option<String>,

    /// Closure calls currently in progress.
    depth: usize,
    max_depth: usize,
}

impl Machine {
    pub fn new(config: &Config) -> LispResult<Self> {
        Self::with_storage(config, Box::new(FileStorage::new(&config.storage)))
    }

    pub fn with_storage(config: &Config, storage: Box<dyn Storage>) -> LispResult<Self> {
        let mut heap = Heap::new(config.cells);
        let mut symbols = SymbolTable::new();
        let globe = globals::build_globals(&mut heap, &mut symbols)?;
        Ok(Machine {
            heap,
            symbols,
            globe,
            storage,
            pending_edit: None,
            depth: 0,
            max_depth: config.max_depth,
        })
    }

    // ========================================================================
    // Top-level cycle
    // ========================================================================

    /// Run one collection rooted at the global scope.
    /// Returns the free-cell count for the status surface.
    pub fn collect(&mut self) -> usize {
        self.heap.collect(self.globe)
    }

    /// Read the first form on `line`, evaluate it in the global scope and
    /// unparse both. A fatal error abandons the whole cycle.
    pub fn run_line(&mut self, line: &str) -> LispResult<Cycle> {
        self.depth = 0;
        let result = self.read(line).and_then(|form| {
            let text = self.print(form);
            let value = self.eval(&mut Scope::Global, form)?;
            Ok(Cycle {
                form: text,
                value: self.print(value),
            })
        });
        if let Err(e) = &result {
            warn!(error = %e, "evaluation aborted");
        }
        result
    }

    /// Parse the first form on a line.
    pub fn read(&mut self, line: &str) -> LispResult<Value> {
        reader::read_line(line, &mut self.heap, &mut self.symbols)
    }

    pub fn print(&self, val: Value) -> String {
        printer::print_val(val, &self.heap, &self.symbols)
    }

    /// The current global value of `name`, if bound.
    pub fn global(&self, name: &str) -> Option<Value> {
        let sym = self.symbols.lookup(name)?;
        env_lookup(Value::Symbol(sym), self.globe, &self.heap).map(|b| self.heap.cdr(b))
    }

    /// Hand over the text produced by the last `:EDIT`, once.
    pub fn take_edit(&mut self) -> Option<String> {
        self.pending_edit.take()
    }

    pub(crate) fn set_edit(&mut self, text: Option<String>) {
        self.pending_edit = text;
    }

    pub(crate) fn storage(&mut self) -> &mut dyn Storage {
        self.storage.as_mut()
    }

    /// Discard every user binding: the global scope goes back to the
    /// builtins. The old cells become garbage for the next collection.
    pub fn reset(&mut self) -> LispResult<()> {
        self.globe = globals::build_globals(&mut self.heap, &mut self.symbols)?;
        Ok(())
    }

    // ========================================================================
    // Scope access
    // ========================================================================

    pub fn scope_head(&self, scope: &Scope) -> Value {
        match scope {
            Scope::Global => self.globe,
            Scope::Local(head) => **head,
        }
    }

    /// Bind-or-update `name` starting from the head of `scope`.
    pub fn bind(&mut self, scope: &mut Scope, name: Value, val: Value) -> LispResult<()> {
        match scope {
            Scope::Global => env_set(name, val, &mut self.globe, &mut self.heap),
            Scope::Local(head) => env_set(name, val, &mut **head, &mut self.heap),
        }
    }

    // ========================================================================
    // Core evaluation
    // ========================================================================

    /// Evaluate an expression.
    ///
    /// Symbols look themselves up (unbound ones evaluate to themselves),
    /// quotes unwrap, pairs call their evaluated head. Builtins receive the
    /// current scope and the unevaluated operands; calling anything that is
    /// not callable returns the form unchanged.
    ///
    /// Every recursive path of the evaluator passes through here, so this is
    /// where the native stack is grown.
    pub fn eval(&mut self, scope: &mut Scope, expr: Value) -> LispResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(scope, expr))
    }

    fn eval_inner(&mut self, scope: &mut Scope, expr: Value) -> LispResult<Value> {
        match expr {
            Value::Symbol(_) => {
                let binding = env_lookup(expr, self.scope_head(scope), &self.heap);
                Ok(binding.map_or(expr, |b| self.heap.cdr(b)))
            }
            Value::Nil => Ok(expr),
            Value::Cell(_) => match self.heap.get(expr) {
                Some(Cell::Quote(inner)) => Ok(inner),
                Some(Cell::Cons(head, args)) => {
                    let f = self.eval(scope, head)?;
                    match self.heap.get(f) {
                        Some(Cell::Builtin(prim)) => primitives::call_primitive(self, prim, scope, args),
                        Some(Cell::Lambda(params, body)) => self.apply(params, body, scope, args),
                        _ => {
                            trace!(head = ?self.heap.tag(f), "not callable");
                            Ok(expr)
                        }
                    }
                }
                _ => Ok(expr),
            },
        }
    }

    /// Call a closure. Arguments are evaluated in the caller's scope and
    /// bound in a frame layered over that same scope, so free symbols in the
    /// body resolve against the caller at call time.
    fn apply(&mut self, params: Value, body: Value, scope: &mut Scope, args: Value) -> LispResult<Value> {
        if self.depth >= self.max_depth {
            return Err(LispError::StackExhausted);
        }
        self.depth += 1;
        trace!(depth = self.depth, "call");
        let result = self.call_closure(params, body, scope, args);
        self.depth -= 1;
        result
    }

    fn call_closure(&mut self, params: Value, body: Value, scope: &mut Scope, args: Value) -> LispResult<Value> {
        let mut frame = self.scope_head(scope);
        let mut param = params;
        let mut arg = args;
        while let Some(Cell::Cons(name, rest)) = self.heap.get(param) {
            let expr = self.heap.car(arg);
            let val = self.eval(scope, expr)?;
            let binding = self.heap.cons(name, val)?;
            frame = self.heap.cons(binding, frame)?;
            param = rest;
            arg = self.heap.cdr(arg);
        }

        self.eval_body(&mut Scope::Local(&mut frame), body)
    }

    /// Evaluate each expression of `body` in turn; the last value wins.
    /// An empty body is nil.
    pub fn eval_body(&mut self, scope: &mut Scope, body: Value) -> LispResult<Value> {
        let mut result = Value::Nil;
        let mut current = body;
        while let Some(Cell::Cons(expr, rest)) = self.heap.get(current) {
            result = self.eval(scope, expr)?;
            current = rest;
        }
        Ok(result)
    }
}
