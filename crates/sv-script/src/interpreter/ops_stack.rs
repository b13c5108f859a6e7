//! Stack manipulation opcodes.

use super::error::InterpreterError;
use super::stack::as_bool;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let data = self.dstack.pop()?;
        self.astack.push(data)
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let data = self.astack.pop()?;
        self.dstack.push(data)
    }

    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        let top = self.dstack.peek(0)?;
        if as_bool(&top) {
            self.dstack.push(top)?;
        }
        Ok(())
    }

    pub(crate) fn op_pick(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_num()?;
        self.dstack.pick_n(n.to_i32())
    }

    pub(crate) fn op_roll(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_num()?;
        self.dstack.roll_n(n.to_i32())
    }
}
