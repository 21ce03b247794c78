use crate::error::{EvalError, EvalResult};
use crate::value::{PairId, Value};

/// A single cons cell on the heap.
pub struct ConsCell {
    pub first: Value,
    pub second: Value,
}

/// The cons cell heap. All pairs are allocated here and addressed by
/// `PairId`, so shared and cyclic structure needs no ownership tricks.
///
/// Cells are never reclaimed; the heap only grows up to `capacity`.
pub struct Heap {
    cells: Vec<ConsCell>,
    capacity: usize,
}

impl Heap {
    /// Cell 0 is reserved as the empty-environment sentinel.
    pub const EMPTY_ENV: PairId = PairId(0);

    pub fn new(capacity: usize) -> Self {
        let mut cells = Vec::with_capacity(1024);
        cells.push(ConsCell {
            first: Value::Null,
            second: Value::Null,
        });
        Heap { cells, capacity }
    }

    /// Allocate a new cons cell. Returns Err(HeapOverflow) if capacity is exceeded.
    pub fn alloc(&mut self, first: Value, second: Value) -> EvalResult<PairId> {
        if self.cells.len() >= self.capacity {
            return Err(EvalError::HeapOverflow(self.capacity));
        }
        let id = PairId(self.cells.len() as u32);
        self.cells.push(ConsCell { first, second });
        Ok(id)
    }

    /// Allocate a cell and wrap it as a value.
    pub fn cons(&mut self, first: Value, second: Value) -> EvalResult<Value> {
        Ok(Value::Pair(self.alloc(first, second)?))
    }

    #[inline]
    pub fn car(&self, id: PairId) -> Value {
        self.cells[id.0 as usize].first
    }

    #[inline]
    pub fn cdr(&self, id: PairId) -> Value {
        self.cells[id.0 as usize].second
    }

    pub fn first(&self, val: Value) -> EvalResult<Value> {
        match val {
            Value::Pair(id) => Ok(self.car(id)),
            other => Err(EvalError::Type(format!("first of {}, expected Pair", other.kind()))),
        }
    }

    pub fn second(&self, val: Value) -> EvalResult<Value> {
        match val {
            Value::Pair(id) => Ok(self.cdr(id)),
            other => Err(EvalError::Type(format!("second of {}, expected Pair", other.kind()))),
        }
    }

    /// Overwrite the first field in place. Visible through every alias.
    pub fn set_first(&mut self, pair: Value, val: Value) -> EvalResult<()> {
        match pair {
            Value::Pair(id) => {
                self.cells[id.0 as usize].first = val;
                Ok(())
            }
            other => Err(EvalError::Type(format!("set-first of {}, expected Pair", other.kind()))),
        }
    }

    /// Overwrite the second field in place. Visible through every alias.
    pub fn set_second(&mut self, pair: Value, val: Value) -> EvalResult<()> {
        match pair {
            Value::Pair(id) => {
                self.cells[id.0 as usize].second = val;
                Ok(())
            }
            other => Err(EvalError::Type(format!("set-second of {}, expected Pair", other.kind()))),
        }
    }

    pub fn cadr(&self, val: Value) -> EvalResult<Value> {
        self.first(self.second(val)?)
    }

    pub fn cddr(&self, val: Value) -> EvalResult<Value> {
        self.second(self.second(val)?)
    }

    pub fn caddr(&self, val: Value) -> EvalResult<Value> {
        self.first(self.cddr(val)?)
    }

    pub fn cdddr(&self, val: Value) -> EvalResult<Value> {
        self.second(self.cddr(val)?)
    }

    pub fn cadddr(&self, val: Value) -> EvalResult<Value> {
        self.first(self.cdddr(val)?)
    }

    /// Build a proper list from a slice of values. An empty slice yields Null.
    pub fn list(&mut self, values: &[Value]) -> EvalResult<Value> {
        self.list_with_tail(values, Value::Null)
    }

    /// Build a chain of pairs over `values` ending in `tail`.
    pub fn list_with_tail(&mut self, values: &[Value], tail: Value) -> EvalResult<Value> {
        let mut result = tail;
        for &val in values.iter().rev() {
            result = self.cons(val, result)?;
        }
        Ok(result)
    }

    /// Copy the spine of `l1` in front of `l2`. `l2` is shared, not copied,
    /// and neither argument is mutated.
    pub fn append(&mut self, l1: Value, l2: Value) -> EvalResult<Value> {
        let items = self.list_to_vec(l1)?;
        self.list_with_tail(&items, l2)
    }

    /// Number of elements of a proper list. Fails on an improper tail.
    pub fn length(&self, list: Value) -> EvalResult<usize> {
        let mut count = 0;
        let mut current = list;
        loop {
            match current {
                Value::Null => return Ok(count),
                Value::Pair(id) => {
                    count += 1;
                    current = self.cdr(id);
                }
                other => {
                    return Err(EvalError::Type(format!(
                        "length of improper list ending in {}",
                        other.kind()
                    )))
                }
            }
        }
    }

    /// Collect a proper list into a Vec. Fails on an improper tail.
    pub fn list_to_vec(&self, list: Value) -> EvalResult<Vec<Value>> {
        let mut result = Vec::new();
        let mut current = list;
        loop {
            match current {
                Value::Null => return Ok(result),
                Value::Pair(id) => {
                    result.push(self.car(id));
                    current = self.cdr(id);
                }
                other => {
                    return Err(EvalError::Type(format!(
                        "expected a proper list, found tail of kind {}",
                        other.kind()
                    )))
                }
            }
        }
    }

    /// Returns the number of allocated cells, including the sentinel.
    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }
}
