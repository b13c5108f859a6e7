//! Byte-budgeted execution stacks.
//!
//! The data stack and the alt stack share one byte-footprint counter: each
//! element costs its length plus a fixed per-element overhead, and any push
//! that would carry the combined footprint past the configured ceiling fails
//! with `StackSizeExceeded`. Pops release their footprint, so the accounting
//! stays exact across rolls and cross-stack moves.

use std::cell::Cell;
use std::rc::Rc;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Accounting cost added to every element beyond its payload length.
pub const ELEMENT_OVERHEAD: u64 = 32;

/// Convert a byte string to a boolean. False iff all bytes are zero or the
/// value is negative zero (zeros with a trailing 0x80).
pub fn as_bool(t: &[u8]) -> bool {
    for (i, &b) in t.iter().enumerate() {
        if b != 0 {
            return !(i == t.len() - 1 && b == 0x80);
        }
    }
    false
}

/// Convert a boolean to its canonical stack encoding.
pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        vec![]
    }
}

/// A stack of byte strings with shared footprint accounting.
pub struct Stack {
    elems: Vec<Vec<u8>>,
    /// Combined footprint in bytes, shared with any child stack.
    used: Rc<Cell<u64>>,
    max_bytes: u64,
    underflow: InterpreterErrorCode,
    pub max_num_length: usize,
    pub after_genesis: bool,
    pub verify_minimal_data: bool,
}

fn element_cost(data: &[u8]) -> u64 {
    data.len() as u64 + ELEMENT_OVERHEAD
}

impl Stack {
    /// Create a root stack owning a fresh footprint counter.
    pub fn new(
        max_bytes: u64,
        max_num_length: usize,
        after_genesis: bool,
        verify_minimal_data: bool,
    ) -> Self {
        Stack {
            elems: Vec::new(),
            used: Rc::new(Cell::new(0)),
            max_bytes,
            underflow: InterpreterErrorCode::InvalidStackOperation,
            max_num_length,
            after_genesis,
            verify_minimal_data,
        }
    }

    /// Create a child stack that counts against this stack's footprint
    /// ceiling. Used for the alt stack.
    pub fn make_child_stack(&self) -> Self {
        Stack {
            elems: Vec::new(),
            used: Rc::clone(&self.used),
            max_bytes: self.max_bytes,
            underflow: InterpreterErrorCode::InvalidAltStackOperation,
            max_num_length: self.max_num_length,
            after_genesis: self.after_genesis,
            verify_minimal_data: self.verify_minimal_data,
        }
    }

    /// Combined byte footprint over this stack and any stacks sharing its
    /// counter.
    pub fn combined_size(&self) -> u64 {
        self.used.get()
    }

    pub fn depth(&self) -> i32 {
        self.elems.len() as i32
    }

    fn grow(&self, cost: u64) -> Result<(), InterpreterError> {
        let used = self.used.get();
        if used.saturating_add(cost) > self.max_bytes {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackSizeExceeded,
                format!(
                    "stack footprint {} + {} exceeds limit {}",
                    used, cost, self.max_bytes
                ),
            ));
        }
        self.used.set(used + cost);
        Ok(())
    }

    fn release(&self, cost: u64) {
        self.used.set(self.used.get().saturating_sub(cost));
    }

    pub fn push(&mut self, data: Vec<u8>) -> Result<(), InterpreterError> {
        self.grow(element_cost(&data))?;
        self.elems.push(data);
        Ok(())
    }

    pub fn push_num(&mut self, n: &ScriptNumber) -> Result<(), InterpreterError> {
        self.push(n.to_bytes())
    }

    pub fn push_bool(&mut self, val: bool) -> Result<(), InterpreterError> {
        self.push(from_bool(val))
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.nip(0)
    }

    pub fn pop_num(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let data = self.pop()?;
        ScriptNumber::from_bytes(
            &data,
            self.max_num_length,
            self.verify_minimal_data,
            self.after_genesis,
        )
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop()?))
    }

    /// Copy of the element `idx` entries down from the top.
    pub fn peek(&self, idx: i32) -> Result<Vec<u8>, InterpreterError> {
        let sz = self.elems.len() as i32;
        if idx < 0 || idx >= sz {
            return Err(InterpreterError::new(
                self.underflow,
                format!("index {} is invalid for stack depth {}", idx, sz),
            ));
        }
        Ok(self.elems[(sz - idx - 1) as usize].clone())
    }

    pub fn peek_num(&self, idx: i32) -> Result<ScriptNumber, InterpreterError> {
        let data = self.peek(idx)?;
        ScriptNumber::from_bytes(
            &data,
            self.max_num_length,
            self.verify_minimal_data,
            self.after_genesis,
        )
    }

    pub fn peek_bool(&self, idx: i32) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.peek(idx)?))
    }

    /// Remove and return the element `idx` entries down from the top,
    /// releasing its footprint.
    pub fn nip(&mut self, idx: i32) -> Result<Vec<u8>, InterpreterError> {
        let sz = self.elems.len() as i32;
        if idx < 0 || idx >= sz {
            return Err(InterpreterError::new(
                self.underflow,
                format!("index {} is invalid for stack depth {}", idx, sz),
            ));
        }
        let elem = self.elems.remove((sz - idx - 1) as usize);
        self.release(element_cost(&elem));
        Ok(elem)
    }

    pub fn nip_discard(&mut self, idx: i32) -> Result<(), InterpreterError> {
        self.nip(idx)?;
        Ok(())
    }

    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let second = self.pop()?;
        let first = self.pop()?;
        self.push(second.clone())?;
        self.push(first)?;
        self.push(second)
    }

    pub fn drop_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                self.underflow,
                format!("attempt to drop {} items", n),
            ));
        }
        for _ in 0..n {
            self.pop()?;
        }
        Ok(())
    }

    pub fn dup_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                self.underflow,
                format!("attempt to dup {} items", n),
            ));
        }
        for _ in 0..n {
            let elem = self.peek(n - 1)?;
            self.push(elem)?;
        }
        Ok(())
    }

    pub fn over_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                self.underflow,
                format!("attempt to over {} items", n),
            ));
        }
        let entry = 2 * n - 1;
        for _ in 0..n {
            let elem = self.peek(entry)?;
            self.push(elem)?;
        }
        Ok(())
    }

    pub fn rot_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                self.underflow,
                format!("attempt to rotate {} items", n),
            ));
        }
        let entry = 3 * n - 1;
        for _ in 0..n {
            let elem = self.nip(entry)?;
            self.push(elem)?;
        }
        Ok(())
    }

    pub fn swap_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        if n < 1 {
            return Err(InterpreterError::new(
                self.underflow,
                format!("attempt to swap {} items", n),
            ));
        }
        let entry = 2 * n - 1;
        for _ in 0..n {
            let elem = self.nip(entry)?;
            self.push(elem)?;
        }
        Ok(())
    }

    pub fn pick_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        let elem = self.peek(n)?;
        self.push(elem)
    }

    pub fn roll_n(&mut self, n: i32) -> Result<(), InterpreterError> {
        let elem = self.nip(n)?;
        self.push(elem)
    }

    /// Snapshot of the stack contents, bottom to top.
    pub fn elements(&self) -> Vec<Vec<u8>> {
        self.elems.clone()
    }

    /// Replace the stack contents, re-charging the footprint for the new
    /// elements.
    pub fn set_elements(&mut self, data: Vec<Vec<u8>>) -> Result<(), InterpreterError> {
        self.clear();
        for elem in &data {
            self.grow(element_cost(elem))?;
        }
        self.elems = data;
        Ok(())
    }

    /// Remove every element, releasing the footprint.
    pub fn clear(&mut self) {
        for elem in &self.elems {
            self.release(element_cost(elem));
        }
        self.elems.clear();
    }
}

/// Boolean stack tracking whether an OP_ELSE may still toggle each open
/// conditional.
pub struct BoolStack {
    elems: Vec<bool>,
}

impl BoolStack {
    pub fn new() -> Self {
        BoolStack { elems: Vec::new() }
    }

    pub fn push_bool(&mut self, b: bool) {
        self.elems.push(b);
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        self.elems.pop().ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "bool stack empty",
            )
        })
    }

    pub fn depth(&self) -> i32 {
        self.elems.len() as i32
    }
}

impl Default for BoolStack {
    fn default() -> Self {
        BoolStack::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbounded() -> Stack {
        Stack::new(u64::MAX, 4, false, false)
    }

    #[test]
    fn boolean_conversion() {
        assert!(!as_bool(&[]));
        assert!(!as_bool(&[0x00]));
        assert!(!as_bool(&[0x80])); // negative zero
        assert!(as_bool(&[0x01]));
        assert!(as_bool(&[0x00, 0x01]));
        assert!(!as_bool(&[0x00, 0x00]));
        assert!(!as_bool(&[0x00, 0x80])); // negative zero
        assert!(as_bool(&[0x80, 0x00]));
    }

    #[test]
    fn push_pop_and_depth() {
        let mut s = unbounded();
        s.push(vec![1, 2, 3]).unwrap();
        s.push(vec![4, 5]).unwrap();
        assert_eq!(s.depth(), 2);
        assert_eq!(s.pop().unwrap(), vec![4, 5]);
        assert_eq!(s.depth(), 1);
        assert!(s.nip(3).is_err());
    }

    #[test]
    fn footprint_is_exact() {
        let mut s = unbounded();
        assert_eq!(s.combined_size(), 0);
        s.push(vec![0u8; 10]).unwrap();
        assert_eq!(s.combined_size(), 10 + ELEMENT_OVERHEAD);
        s.push(vec![]).unwrap();
        assert_eq!(s.combined_size(), 10 + 2 * ELEMENT_OVERHEAD);
        s.dup_n(1).unwrap();
        assert_eq!(s.combined_size(), 10 + 3 * ELEMENT_OVERHEAD);
        s.swap_n(1).unwrap();
        assert_eq!(s.combined_size(), 10 + 3 * ELEMENT_OVERHEAD);
        s.pop().unwrap();
        s.pop().unwrap();
        s.pop().unwrap();
        assert_eq!(s.combined_size(), 0);
    }

    #[test]
    fn child_stack_shares_budget() {
        let mut main = Stack::new(3 * ELEMENT_OVERHEAD + 8, 4, true, false);
        let mut alt = main.make_child_stack();
        main.push(vec![1; 4]).unwrap();
        alt.push(vec![2; 4]).unwrap();
        assert_eq!(main.combined_size(), 2 * ELEMENT_OVERHEAD + 8);
        assert_eq!(alt.combined_size(), main.combined_size());

        let err = main.push(vec![3]).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::StackSizeExceeded);

        // Releasing on the alt side makes room on the main side.
        alt.pop().unwrap();
        main.push(vec![3]).unwrap();
    }

    #[test]
    fn ceiling_blocks_oversized_push() {
        let mut s = Stack::new(ELEMENT_OVERHEAD + 4, 4, true, false);
        assert!(s.push(vec![0u8; 4]).is_ok());
        s.pop().unwrap();
        let err = s.push(vec![0u8; 5]).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::StackSizeExceeded);
    }

    #[test]
    fn dup_swap_roll() {
        let mut s = unbounded();
        s.push(vec![1]).unwrap();
        s.push(vec![2]).unwrap();
        s.dup_n(2).unwrap();
        assert_eq!(s.depth(), 4);
        assert_eq!(s.pop().unwrap(), vec![2]);
        assert_eq!(s.pop().unwrap(), vec![1]);
        s.swap_n(1).unwrap();
        assert_eq!(s.pop().unwrap(), vec![1]);
        assert_eq!(s.pop().unwrap(), vec![2]);
    }

    #[test]
    fn clear_releases_everything() {
        let mut s = unbounded();
        let alt = s.make_child_stack();
        s.push(vec![9; 100]).unwrap();
        s.push(vec![8; 50]).unwrap();
        s.clear();
        assert_eq!(alt.combined_size(), 0);
    }
}
