use tracing::debug;

use crate::error::{LispError, LispResult};
use crate::primitives::Primitive;
use crate::value::{CellId, Tag, Value};

/// A single heap cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Cons(Value, Value),
    Number(f64),
    Builtin(Primitive),
    /// (parameters . body), told apart from a pair only by the tag.
    Lambda(Value, Value),
    Quote(Value),
    /// Free-list link to the next unused cell.
    Free(Option<CellId>),
}

/// The cell arena. All cells are preallocated; capacity never changes.
/// CellId is an index into `cells`.
pub struct Heap {
    cells: Vec<Cell>,
    /// Mark bits, only meaningful while `collect` runs.
    marks: Vec<bool>,
    free: Option<CellId>,
    free_count: usize,
}

impl Heap {
    pub fn new(capacity: usize) -> Self {
        let cells = (0..capacity)
            .map(|i| {
                let next = i + 1;
                Cell::Free((next < capacity).then(|| CellId(next as u32)))
            })
            .collect();
        Heap {
            cells,
            marks: vec![false; capacity],
            free: (capacity > 0).then_some(CellId(0)),
            free_count: capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of cells on the free list.
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Take a cell off the free list.
    /// Returns Err(OutOfMemory) once the free list is exhausted.
    pub fn alloc(&mut self, cell: Cell) -> LispResult<CellId> {
        let id = self.free.ok_or(LispError::OutOfMemory)?;
        let slot = &mut self.cells[id.0 as usize];
        self.free = match *slot {
            Cell::Free(next) => next,
            _ => return Err(LispError::OutOfMemory),
        };
        *slot = cell;
        self.free_count -= 1;
        Ok(id)
    }

    pub fn cons(&mut self, car: Value, cdr: Value) -> LispResult<Value> {
        self.alloc(Cell::Cons(car, cdr)).map(Value::Cell)
    }

    pub fn number(&mut self, n: f64) -> LispResult<Value> {
        self.alloc(Cell::Number(n)).map(Value::Cell)
    }

    pub fn lambda(&mut self, params: Value, body: Value) -> LispResult<Value> {
        self.alloc(Cell::Lambda(params, body)).map(Value::Cell)
    }

    pub fn quote(&mut self, inner: Value) -> LispResult<Value> {
        self.alloc(Cell::Quote(inner)).map(Value::Cell)
    }

    pub fn builtin(&mut self, prim: Primitive) -> LispResult<Value> {
        self.alloc(Cell::Builtin(prim)).map(Value::Cell)
    }

    /// The live cell behind a value, if any.
    pub fn get(&self, val: Value) -> Option<Cell> {
        match val {
            Value::Cell(id) => match self.cells.get(id.0 as usize) {
                Some(Cell::Free(_)) | None => None,
                Some(cell) => Some(*cell),
            },
            _ => None,
        }
    }

    pub fn tag(&self, val: Value) -> Tag {
        match val {
            Value::Nil => Tag::Nil,
            Value::Symbol(_) => Tag::Symbol,
            Value::Cell(id) => match self.cells.get(id.0 as usize) {
                Some(Cell::Cons(..)) => Tag::Cons,
                Some(Cell::Number(_)) => Tag::Number,
                Some(Cell::Builtin(_)) => Tag::Builtin,
                Some(Cell::Lambda(..)) => Tag::Lambda,
                Some(Cell::Quote(_)) => Tag::Quote,
                Some(Cell::Free(_)) | None => Tag::Free,
            },
        }
    }

    /// Head of a pair; nil for anything else.
    #[inline]
    pub fn car(&self, val: Value) -> Value {
        match self.get(val) {
            Some(Cell::Cons(car, _)) => car,
            _ => Value::Nil,
        }
    }

    /// Tail of a pair; nil for anything else.
    #[inline]
    pub fn cdr(&self, val: Value) -> Value {
        match self.get(val) {
            Some(Cell::Cons(_, cdr)) => cdr,
            _ => Value::Nil,
        }
    }

    /// Numeric payload; 0.0 for anything that is not a number.
    #[inline]
    pub fn num(&self, val: Value) -> f64 {
        match self.get(val) {
            Some(Cell::Number(n)) => n,
            _ => 0.0,
        }
    }

    /// Set the tail of a pair. No-op on anything else.
    pub fn set_cdr(&mut self, val: Value, cdr: Value) {
        if let Value::Cell(id) = val {
            if let Some(Cell::Cons(_, tail)) = self.cells.get_mut(id.0 as usize) {
                *tail = cdr;
            }
        }
    }

    /// Build a proper list from a slice of values.
    pub fn list(&mut self, values: &[Value]) -> LispResult<Value> {
        let mut result = Value::Nil;
        for &val in values.iter().rev() {
            result = self.cons(val, result)?;
        }
        Ok(result)
    }

    /// Collect the elements of a list, stopping at the first non-pair tail.
    pub fn list_to_vec(&self, val: Value) -> Vec<Value> {
        let mut result = Vec::new();
        let mut current = val;
        while let Some(Cell::Cons(car, cdr)) = self.get(current) {
            result.push(car);
            current = cdr;
        }
        result
    }

    // === GC methods ===

    /// Mark everything reachable from `root`, then sweep.
    /// Returns the number of free cells afterwards.
    pub fn collect(&mut self, root: Value) -> usize {
        self.mark(root);
        self.sweep();
        debug!(free = self.free_count, capacity = self.capacity(), "collected");
        self.free_count
    }

    fn mark(&mut self, root: Value) {
        let mut worklist = vec![root];
        while let Some(val) = worklist.pop() {
            let Value::Cell(id) = val else { continue };
            let idx = id.0 as usize;
            if idx >= self.cells.len() || self.marks[idx] {
                continue;
            }
            self.marks[idx] = true;
            match self.cells[idx] {
                Cell::Cons(car, cdr) | Cell::Lambda(car, cdr) => {
                    worklist.push(cdr);
                    worklist.push(car);
                }
                Cell::Quote(inner) => worklist.push(inner),
                _ => {}
            }
        }
    }

    /// Rebuild the free list from every unmarked cell and clear the marks.
    fn sweep(&mut self) {
        let mut free = None;
        let mut count = 0;
        for idx in 0..self.cells.len() {
            if self.marks[idx] {
                self.marks[idx] = false;
            } else {
                self.cells[idx] = Cell::Free(free);
                free = Some(CellId(idx as u32));
                count += 1;
            }
        }
        self.free = free;
        self.free_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_list_len(heap: &Heap) -> usize {
        let mut len = 0;
        let mut current = heap.free;
        while let Some(id) = current {
            len += 1;
            current = match heap.cells[id.0 as usize] {
                Cell::Free(next) => next,
                other => panic!("live cell {:?} on free list", other),
            };
        }
        len
    }

    #[test]
    fn test_alloc_and_get() {
        let mut heap = Heap::new(10);
        let a = heap.number(10.0).unwrap();
        let b = heap.number(2.5).unwrap();
        let pair = heap.cons(a, b).unwrap();

        assert_eq!(heap.tag(pair), Tag::Cons);
        assert_eq!(heap.num(heap.car(pair)), 10.0);
        assert_eq!(heap.num(heap.cdr(pair)), 2.5);
        assert_eq!(heap.free_count(), 7);
        assert_eq!(free_list_len(&heap), 7);
    }

    #[test]
    fn test_mismatched_access_degrades() {
        let mut heap = Heap::new(4);
        let n = heap.number(3.0).unwrap();
        let lambda = heap.lambda(n, n).unwrap();

        assert_eq!(heap.car(n), Value::Nil);
        assert_eq!(heap.cdr(Value::Nil), Value::Nil);
        assert_eq!(heap.car(lambda), Value::Nil);
        assert_eq!(heap.num(lambda), 0.0);
        assert_eq!(heap.tag(Value::Cell(CellId(3))), Tag::Free);
    }

    #[test]
    fn test_out_of_memory() {
        let mut heap = Heap::new(3);
        for _ in 0..3 {
            heap.number(0.0).unwrap();
        }
        assert_eq!(heap.number(0.0), Err(LispError::OutOfMemory));
        assert_eq!(heap.free_count(), 0);
    }

    #[test]
    fn test_gc_keeps_reachable() {
        let mut heap = Heap::new(16);
        let one = heap.number(1.0).unwrap();
        let two = heap.number(2.0).unwrap();
        let inner = heap.list(&[one, two]).unwrap();
        let quoted = heap.quote(inner).unwrap();
        let lambda = heap.lambda(Value::Nil, quoted).unwrap();
        let root = heap.cons(lambda, Value::Nil).unwrap();

        let free = heap.collect(root);

        assert_eq!(free, 16 - 7);
        assert_eq!(heap.num(one), 1.0);
        assert_eq!(heap.num(two), 2.0);
        assert_eq!(heap.tag(lambda), Tag::Lambda);
        assert_eq!(heap.tag(quoted), Tag::Quote);
        assert_eq!(free_list_len(&heap), free);
    }

    #[test]
    fn test_gc_reclaims_unreachable() {
        let mut heap = Heap::new(8);
        let keep = heap.number(1.0).unwrap();
        let root = heap.cons(keep, Value::Nil).unwrap();
        let dead = heap.number(100.0).unwrap();
        let _dead_pair = heap.cons(dead, dead).unwrap();
        assert_eq!(heap.free_count(), 4);

        let free = heap.collect(root);

        assert_eq!(free, 6);
        assert_eq!(heap.tag(dead), Tag::Free);
        assert_eq!(heap.get(dead), None);

        // Freed slots are handed out again.
        for _ in 0..6 {
            heap.number(0.0).unwrap();
        }
        assert_eq!(heap.number(0.0), Err(LispError::OutOfMemory));
    }

    #[test]
    fn test_gc_handles_shared_and_cyclic_structure() {
        let mut heap = Heap::new(8);
        let n = heap.number(4.0).unwrap();
        let root = heap.cons(n, n).unwrap();
        heap.set_cdr(root, root);

        assert_eq!(heap.collect(root), 6);
        assert_eq!(heap.cdr(root), root);
    }

    #[test]
    fn test_marks_cleared_after_collect() {
        let mut heap = Heap::new(4);
        let n = heap.number(1.0).unwrap();
        heap.collect(n);
        assert!(heap.marks.iter().all(|m| !m));
    }
}
