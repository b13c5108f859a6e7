//! Flow control and locktime opcodes.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::stack::as_bool;
use super::thread::Thread;

const COND_FALSE: i32 = 0;
const COND_TRUE: i32 = 1;
const COND_SKIP: i32 = 2;

/// Locktimes below this are block heights; at or above, unix timestamps.
const LOCK_TIME_THRESHOLD: i64 = 500_000_000;

const MAX_INPUT_SEQUENCE: u32 = 0xffffffff;
const SEQUENCE_LOCK_TIME_DISABLED: i64 = 1 << 31;
const SEQUENCE_LOCK_TIME_IS_SECONDS: i64 = 1 << 22;
const SEQUENCE_LOCK_TIME_MASK: i64 = 0x0000ffff;

impl<'a> Thread<'a> {
    pub(crate) fn op_reserved(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::ReservedOpcode,
            format!("attempt to execute reserved opcode {}", pop.name()),
        ))
    }

    pub(crate) fn op_ver_conditional(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.after_genesis && !self.should_exec(pop) {
            return Ok(());
        }
        self.op_reserved(pop)
    }

    fn pop_if_bool(&mut self) -> Result<bool, InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_MINIMAL_IF) {
            return self.dstack.pop_bool();
        }
        let cond = self.dstack.pop()?;
        if cond.len() > 1 || (cond.len() == 1 && cond[0] != 1) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalIf,
                "conditional argument must be empty or 0x01",
            ));
        }
        Ok(as_bool(&cond))
    }

    pub(crate) fn op_if(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.begin_conditional(pop, false)
    }

    pub(crate) fn op_notif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.begin_conditional(pop, true)
    }

    fn begin_conditional(
        &mut self,
        pop: &ParsedOpcode,
        negate: bool,
    ) -> Result<(), InterpreterError> {
        let mut cond = COND_FALSE;
        if self.should_exec(pop) {
            if self.is_branch_executing() {
                if self.pop_if_bool()? != negate {
                    cond = COND_TRUE;
                }
            } else {
                cond = COND_SKIP;
            }
        }
        self.cond_stack.push(cond);
        self.else_stack.push_bool(false);
        Ok(())
    }

    pub(crate) fn op_else(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        let unbalanced = || {
            InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!("{} without an open conditional", pop.name()),
            )
        };

        if self.cond_stack.is_empty() {
            return Err(unbalanced());
        }
        // A second OP_ELSE for the same OP_IF is invalid.
        if self.else_stack.pop_bool()? {
            return Err(unbalanced());
        }

        let idx = self.cond_stack.len() - 1;
        match self.cond_stack[idx] {
            COND_TRUE => self.cond_stack[idx] = COND_FALSE,
            COND_FALSE => self.cond_stack[idx] = COND_TRUE,
            _ => {} // COND_SKIP stays
        }

        self.else_stack.push_bool(true);
        Ok(())
    }

    pub(crate) fn op_endif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!("{} without an open conditional", pop.name()),
            ));
        }
        self.cond_stack.pop();
        self.else_stack.pop_bool()?;
        Ok(())
    }

    pub(crate) fn op_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.abstract_verify(pop, InterpreterErrorCode::Verify)
    }

    pub(crate) fn abstract_verify(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        if self.dstack.pop_bool()? {
            Ok(())
        } else {
            Err(InterpreterError::new(code, format!("{} failed", pop.name())))
        }
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        if !self.after_genesis {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EarlyReturn,
                "script returned early",
            ));
        }
        self.early_return_after_genesis = true;
        if self.cond_stack.is_empty() {
            // Top-level return ends the script successfully; the Ok code is
            // caught by the step loop.
            return Err(InterpreterError::new(InterpreterErrorCode::Ok, "success"));
        }
        Ok(())
    }

    pub(crate) fn op_check_locktime_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_CHECKLOCKTIMEVERIFY) || self.after_genesis {
            return self.upgradable_nop("OP_NOP2");
        }

        let ctx = self.require_tx_context("OP_CHECKLOCKTIMEVERIFY")?;

        let top = self.dstack.peek(0)?;
        let lock_time = ScriptNumber::from_bytes(
            &top,
            5,
            self.dstack.verify_minimal_data,
            self.after_genesis,
        )?;

        if lock_time.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative lock time {}", lock_time.to_i64()),
            ));
        }

        verify_lock_time(ctx.lock_time() as i64, LOCK_TIME_THRESHOLD, lock_time.to_i64())?;

        if ctx.input_sequence(self.input_idx) == MAX_INPUT_SEQUENCE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "transaction input is finalized",
            ));
        }

        Ok(())
    }

    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::VERIFY_CHECKSEQUENCEVERIFY) || self.after_genesis {
            return self.upgradable_nop("OP_NOP3");
        }

        let ctx = self.require_tx_context("OP_CHECKSEQUENCEVERIFY")?;

        let top = self.dstack.peek(0)?;
        let stack_seq = ScriptNumber::from_bytes(
            &top,
            5,
            self.dstack.verify_minimal_data,
            self.after_genesis,
        )?;

        if stack_seq.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative sequence {}", stack_seq.to_i64()),
            ));
        }

        let sequence = stack_seq.to_i64();
        if sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Ok(());
        }

        if ctx.tx_version() < 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("invalid transaction version {}", ctx.tx_version()),
            ));
        }

        let tx_sequence = ctx.input_sequence(self.input_idx) as i64;
        if tx_sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!(
                    "input sequence 0x{:x} has the locktime-disabled bit set",
                    tx_sequence
                ),
            ));
        }

        let lock_time_mask = SEQUENCE_LOCK_TIME_IS_SECONDS | SEQUENCE_LOCK_TIME_MASK;
        verify_lock_time(
            tx_sequence & lock_time_mask,
            SEQUENCE_LOCK_TIME_IS_SECONDS,
            sequence & lock_time_mask,
        )
    }

    fn upgradable_nop(&self, name: &str) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("{} reserved for soft-fork upgrades", name),
            ));
        }
        Ok(())
    }
}

pub(crate) fn verify_lock_time(
    tx_lock_time: i64,
    threshold: i64,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    // Both values must be on the same side of the threshold to compare.
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "mismatched locktime types: tx {}, stack {}",
                tx_lock_time, lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "locktime {} is greater than the transaction locktime {}",
                lock_time, tx_lock_time
            ),
        ));
    }
    Ok(())
}
