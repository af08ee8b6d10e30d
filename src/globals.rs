use crate::error::LispResult;
use crate::heap::Heap;
use crate::primitives::Primitive;
use crate::symbol::{sym, SymbolTable};
use crate::value::Value;

/// Build the initial global scope.
/// The scope is a list of (name . value) pairs, newest first.
/// Pre-installs:
///   - NIL = nil
///   - every builtin, in table order
pub fn build_globals(heap: &mut Heap, symbols: &mut SymbolTable) -> LispResult<Value> {
    let mut globe = Value::Nil;

    // Helper: prepend (name . val) to globe
    macro_rules! def_global {
        ($sym:expr, $val:expr) => {
            let binding = heap.cons(Value::Symbol($sym), $val)?;
            globe = heap.cons(binding, globe)?;
        };
    }

    def_global!(sym::NIL, Value::Nil);

    for &prim in Primitive::ALL {
        let name = symbols.intern(prim.name());
        let cell = heap.builtin(prim)?;
        def_global!(name, cell);
    }

    Ok(globe)
}

/// Look up a binding in a scope chain by identity.
/// Returns the (name . value) pair if found, or None.
pub fn env_lookup(name: Value, env: Value, heap: &Heap) -> Option<Value> {
    let mut current = env;
    while !current.is_nil() {
        let binding = heap.car(current);
        if heap.car(binding) == name {
            return Some(binding);
        }
        current = heap.cdr(current);
    }
    None
}

/// Bind-or-update: if `name` is bound anywhere in the chain starting at
/// `env`, overwrite that binding's value in place. Otherwise prepend a new
/// (name . val) pair onto `env`.
pub fn env_set(name: Value, val: Value, env: &mut Value, heap: &mut Heap) -> LispResult<()> {
    if let Some(binding) = env_lookup(name, *env, heap) {
        heap.set_cdr(binding, val);
        return Ok(());
    }

    // Not found: prepend a new binding
    let binding = heap.cons(name, val)?;
    *env = heap.cons(binding, *env)?;
    Ok(())
}

/// Every (name . value) binding in the chain, oldest first.
pub fn env_bindings(env: Value, heap: &Heap) -> Vec<(Value, Value)> {
    let mut bindings: Vec<_> = heap
        .list_to_vec(env)
        .into_iter()
        .map(|binding| (heap.car(binding), heap.cdr(binding)))
        .collect();
    bindings.reverse();
    bindings
}
