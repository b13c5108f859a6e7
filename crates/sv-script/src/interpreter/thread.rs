//! The script execution thread.
//!
//! A thread runs the unlocking script, then the locking script over the
//! surviving stack, and for BIP16 a third redeem script popped from the
//! saved unlocking stack. One opcode executes per step; the step loop polls
//! the cancellation token so long-running scripts can be aborted.

use super::config::Config;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::HashOp;
use super::parsed_opcode::{is_push_only, parse_script, ParsedOpcode, ParsedScript};
use super::scriptnum::ScriptNumber;
use super::stack::{BoolStack, Stack};
use super::{CancellationToken, TxContext};
use crate::opcodes::*;
use crate::Script;

const COND_TRUE: i32 = 1;
const COND_FALSE: i32 = 0;

pub struct Thread<'a> {
    /// Main data stack.
    pub dstack: Stack,
    /// Alternate stack; shares the footprint budget with `dstack`.
    pub astack: Stack,
    /// Tracks whether OP_ELSE may still toggle each open conditional.
    pub else_stack: BoolStack,
    pub cfg: Config,
    /// Unlocking, locking, and optionally the BIP16 redeem script.
    pub scripts: Vec<ParsedScript>,
    /// FALSE/TRUE/SKIP entry per open conditional.
    pub cond_stack: Vec<i32>,
    /// Data stack snapshot after the unlocking script, for BIP16.
    saved_first_stack: Vec<Vec<u8>>,
    pub script_idx: usize,
    pub script_off: usize,
    /// Offset of the most recent OP_CODESEPARATOR in the current script.
    pub last_code_sep: usize,
    /// Non-push opcodes executed so far, checked against the op budget.
    pub num_ops: usize,
    pub flags: ScriptFlags,
    pub bip16: bool,
    pub after_genesis: bool,
    /// Set once a post-genesis OP_RETURN has run inside a conditional.
    pub early_return_after_genesis: bool,
    pub tx_context: Option<&'a dyn TxContext>,
    pub input_idx: usize,
    token: Option<CancellationToken>,
}

impl<'a> Thread<'a> {
    /// Build a thread for the given scripts, validating sizes, flag
    /// combinations and push-only requirements up front. Limits are the
    /// stock pre- or post-genesis set selected by `UTXO_AFTER_GENESIS`.
    pub fn new(
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
        token: Option<CancellationToken>,
    ) -> Result<Self, InterpreterError> {
        let cfg = if flags.has_flag(ScriptFlags::UTXO_AFTER_GENESIS) {
            Config::after_genesis()
        } else {
            Config::before_genesis()
        };
        Self::with_config(
            unlocking_script,
            locking_script,
            flags,
            cfg,
            tx_context,
            input_idx,
            token,
        )
    }

    /// Like [`new`](Thread::new) but with caller-supplied limits, for
    /// policy ceilings such as a tighter stack byte footprint.
    pub fn with_config(
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        cfg: Config,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
        token: Option<CancellationToken>,
    ) -> Result<Self, InterpreterError> {
        let after_genesis = flags.has_flag(ScriptFlags::UTXO_AFTER_GENESIS);
        if cfg.after_genesis != after_genesis {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "config genesis setting disagrees with UTXO_AFTER_GENESIS",
            ));
        }

        let mut actual_flags = flags;

        // Fork-id sighashes imply strict encoding checks.
        if actual_flags.has_flag(ScriptFlags::ENABLE_SIGHASH_FORKID) {
            actual_flags.add_flag(ScriptFlags::VERIFY_STRICT_ENCODING);
        }

        if actual_flags.has_flag(ScriptFlags::VERIFY_CLEAN_STACK)
            && !actual_flags.has_flag(ScriptFlags::BIP16)
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "CLEAN_STACK requires BIP16",
            ));
        }

        for (label, script) in [("unlocking", unlocking_script), ("locking", locking_script)] {
            if script.len() > cfg.max_script_size() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ScriptSize,
                    format!(
                        "{} script size {} is larger than the max allowed size {}",
                        label,
                        script.len(),
                        cfg.max_script_size()
                    ),
                ));
            }
        }

        if unlocking_script.is_empty() && locking_script.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }

        let error_on_checksig = tx_context.is_none();
        let uscript = parse_script(unlocking_script, error_on_checksig)?;
        let lscript = parse_script(locking_script, error_on_checksig)?;

        if actual_flags.has_flag(ScriptFlags::VERIFY_SIG_PUSH_ONLY) && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "signature script is not push only",
            ));
        }

        let bip16 = actual_flags.has_flag(ScriptFlags::BIP16) && locking_script.is_p2sh();
        if bip16 && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "pay to script hash is not push only",
            ));
        }

        let scripts = vec![uscript, lscript];
        let script_idx = usize::from(unlocking_script.is_empty());

        let dstack = Stack::new(
            cfg.max_stack_bytes(),
            cfg.max_number_length(),
            after_genesis,
            actual_flags.has_flag(ScriptFlags::VERIFY_MINIMAL_DATA),
        );
        let astack = dstack.make_child_stack();

        Ok(Thread {
            dstack,
            astack,
            else_stack: BoolStack::new(),
            cfg,
            scripts,
            cond_stack: Vec::new(),
            saved_first_stack: Vec::new(),
            script_idx,
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            flags: actual_flags,
            bip16,
            after_genesis,
            early_return_after_genesis: false,
            tx_context,
            input_idx,
            token,
        })
    }

    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    pub fn has_any(&self, flags: &[ScriptFlags]) -> bool {
        self.flags.has_any(flags)
    }

    pub(crate) fn require_tx_context(
        &self,
        opcode: &str,
    ) -> Result<&'a dyn TxContext, InterpreterError> {
        self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                format!("no transaction context for {}", opcode),
            )
        })
    }

    /// True while the innermost conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        match self.cond_stack.last() {
            Some(&cond) => cond == COND_TRUE,
            None => true,
        }
    }

    /// Whether this opcode runs given conditionals and any early return.
    pub fn should_exec(&self, pop: &ParsedOpcode) -> bool {
        if !self.after_genesis {
            return true;
        }
        let all_open = self.cond_stack.iter().all(|&v| v != COND_FALSE);
        all_open && (!self.early_return_after_genesis || pop.opcode == OP_RETURN)
    }

    /// Run all scripts to completion and check the terminal stack state.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        while !self.step()? {}
        self.check_error_condition(true)
    }

    /// Execute one opcode. Returns true when execution is complete.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        if let Some(token) = &self.token {
            if token.is_cancelled() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::Cancelled,
                    "script execution cancelled",
                ));
            }
        }

        if self.script_idx >= self.scripts.len()
            || self.script_off >= self.scripts[self.script_idx].len()
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidProgramCounter,
                format!(
                    "program counter {}:{} is past the end",
                    self.script_idx, self.script_off
                ),
            ));
        }

        let opcode = self.scripts[self.script_idx][self.script_off].clone();

        if let Err(e) = self.execute_opcode(&opcode) {
            if e.code == InterpreterErrorCode::Ok {
                // Early success from a top-level post-genesis OP_RETURN.
                self.shift_script();
                return Ok(self.script_idx >= self.scripts.len());
            }
            return Err(e);
        }

        self.script_off += 1;

        let combined_depth = self.dstack.depth() + self.astack.depth();
        if combined_depth > self.cfg.max_stack_depth() as i32 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack depth {} > max allowed {}",
                    combined_depth,
                    self.cfg.max_stack_depth()
                ),
            ));
        }

        if self.script_off < self.scripts[self.script_idx].len() {
            return Ok(false);
        }

        // End of the current script.
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution",
            ));
        }

        // The alt stack does not persist between scripts.
        self.astack.clear();

        self.shift_script();

        if self.bip16 && !self.after_genesis && self.script_idx <= 2 {
            match self.script_idx {
                1 => {
                    self.saved_first_stack = self.dstack.elements();
                }
                2 => {
                    self.check_error_condition(false)?;
                    let redeem_bytes = self.saved_first_stack.last().cloned().unwrap_or_default();
                    let redeem = Script::from_bytes(&redeem_bytes);
                    self.scripts.push(parse_script(&redeem, false)?);
                    let len = self.saved_first_stack.len();
                    let restored = self.saved_first_stack[..len.saturating_sub(1)].to_vec();
                    self.dstack.set_elements(restored)?;
                }
                _ => {}
            }
        }

        // Skip zero-length scripts.
        if self.script_idx < self.scripts.len()
            && self.script_off >= self.scripts[self.script_idx].len()
        {
            self.script_idx += 1;
        }

        self.last_code_sep = 0;
        Ok(self.script_idx >= self.scripts.len())
    }

    fn shift_script(&mut self) {
        self.num_ops = 0;
        self.script_off = 0;
        self.script_idx += 1;
        self.early_return_after_genesis = false;
    }

    fn check_error_condition(&mut self, final_script: bool) -> Result<(), InterpreterError> {
        if self.dstack.depth() < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution",
            ));
        }

        if final_script
            && self.has_flag(ScriptFlags::VERIFY_CLEAN_STACK)
            && self.dstack.depth() != 1
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("stack contains {} unexpected items", self.dstack.depth() - 1),
            ));
        }

        if !self.dstack.pop_bool()? {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }

        Ok(())
    }

    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if pop.data.len() > self.cfg.max_element_size() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::PushSize,
                format!(
                    "element size {} exceeds max allowed size {}",
                    pop.data.len(),
                    self.cfg.max_element_size()
                ),
            ));
        }

        let exec = self.should_exec(pop);

        // Disabled opcodes fail even inside unexecuted branches.
        if pop.is_disabled() && (!self.after_genesis || exec) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }

        if pop.always_illegal() && !self.after_genesis {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", pop.name()),
            ));
        }

        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > self.cfg.max_ops() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", self.cfg.max_ops()),
                ));
            }
        }

        // In a skipped branch only conditional opcodes still run.
        if !self.is_branch_executing() && !pop.is_conditional() {
            return Ok(());
        }

        if self.dstack.verify_minimal_data
            && self.is_branch_executing()
            && pop.opcode <= OP_PUSHDATA4
            && exec
        {
            pop.enforce_minimum_data_push()?;
        }

        // After an OP_RETURN only conditionals still run, to keep balance.
        if !exec && !pop.is_conditional() {
            return Ok(());
        }

        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            OP_0 => self.dstack.push(vec![]),
            op if (OP_DATA_1..=OP_DATA_75).contains(&op) => self.dstack.push(pop.data.clone()),
            OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => self.dstack.push(pop.data.clone()),
            OP_1NEGATE => self
                .dstack
                .push_num(&ScriptNumber::new(-1, self.after_genesis)),
            OP_RESERVED | OP_VER => self.op_reserved(pop),
            op if (OP_1..=OP_16).contains(&op) => self.dstack.push(vec![op - (OP_1 - 1)]),
            OP_NOP => Ok(()),
            OP_IF => self.op_if(pop),
            OP_NOTIF => self.op_notif(pop),
            OP_VERIF | OP_VERNOTIF => self.op_ver_conditional(pop),
            OP_ELSE => self.op_else(pop),
            OP_ENDIF => self.op_endif(pop),
            OP_VERIFY => self.op_verify(pop),
            OP_RETURN => self.op_return(),

            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(),
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(),

            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.dstack.drop_n(2),
            OP_2DUP => self.dstack.dup_n(2),
            OP_3DUP => self.dstack.dup_n(3),
            OP_2OVER => self.dstack.over_n(2),
            OP_2ROT => self.dstack.rot_n(2),
            OP_2SWAP => self.dstack.swap_n(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => {
                let depth = self.dstack.depth();
                self.dstack
                    .push_num(&ScriptNumber::new(depth as i64, self.after_genesis))
            }
            OP_DROP => self.dstack.drop_n(1),
            OP_DUP => self.dstack.dup_n(1),
            OP_NIP => self.dstack.nip_discard(1),
            OP_OVER => self.dstack.over_n(1),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.dstack.rot_n(1),
            OP_SWAP => self.dstack.swap_n(1),
            OP_TUCK => self.dstack.tuck(),

            OP_CAT => self.op_cat(),
            OP_SPLIT => self.op_split(),
            OP_NUM2BIN => self.op_num2bin(),
            OP_BIN2NUM => self.op_bin2num(),
            OP_SIZE => self.op_size(),

            OP_INVERT => self.op_invert(),
            OP_AND => self.op_bitwise(|a, b| a & b),
            OP_OR => self.op_bitwise(|a, b| a | b),
            OP_XOR => self.op_bitwise(|a, b| a ^ b),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => self.op_equalverify(pop),
            OP_RESERVED1 | OP_RESERVED2 => self.op_reserved(pop),

            OP_1ADD => self.op_unary_num(|n| {
                n.incr();
            }),
            OP_1SUB => self.op_unary_num(|n| {
                n.decr();
            }),
            OP_NEGATE => self.op_unary_num(|n| {
                n.neg();
            }),
            OP_ABS => self.op_unary_num(|n| {
                n.abs();
            }),
            OP_NOT => self.op_not(),
            OP_0NOTEQUAL => self.op_0notequal(),
            OP_ADD => self.op_add(),
            OP_SUB => self.op_sub(),
            OP_MUL => self.op_mul(),
            OP_DIV => self.op_div(),
            OP_MOD => self.op_mod(),
            OP_LSHIFT => self.op_lshift(),
            OP_RSHIFT => self.op_rshift(),
            OP_BOOLAND => self.op_bool_binop(|a, b| !a.is_zero() && !b.is_zero()),
            OP_BOOLOR => self.op_bool_binop(|a, b| !a.is_zero() || !b.is_zero()),
            OP_NUMEQUAL => self.op_bool_binop(|a, b| a.equal(b)),
            OP_NUMEQUALVERIFY => self.op_numequalverify(pop),
            OP_NUMNOTEQUAL => self.op_bool_binop(|a, b| !a.equal(b)),
            OP_LESSTHAN => self.op_bool_binop(|a, b| a.less_than(b)),
            OP_GREATERTHAN => self.op_bool_binop(|a, b| a.greater_than(b)),
            OP_LESSTHANOREQUAL => self.op_bool_binop(|a, b| a.less_than_or_equal(b)),
            OP_GREATERTHANOREQUAL => self.op_bool_binop(|a, b| a.greater_than_or_equal(b)),
            OP_MIN => self.op_min(),
            OP_MAX => self.op_max(),
            OP_WITHIN => self.op_within(),

            OP_RIPEMD160 => self.op_hash(HashOp::Ripemd160),
            OP_SHA1 => self.op_hash(HashOp::Sha1),
            OP_SHA256 => self.op_hash(HashOp::Sha256),
            OP_HASH160 => self.op_hash(HashOp::Hash160),
            OP_HASH256 => self.op_hash(HashOp::Hash256),
            OP_CODESEPARATOR => {
                self.last_code_sep = self.script_off;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => self.op_checksigverify(pop),
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => self.op_checkmultisigverify(pop),

            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
                if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::DiscourageUpgradableNOPs,
                        format!(
                            "OP_NOP{} reserved for soft-fork upgrades",
                            pop.opcode - (OP_NOP1 - 1)
                        ),
                    ));
                }
                Ok(())
            }

            _ => Err(InterpreterError::new(
                InterpreterErrorCode::BadOpcode,
                format!("attempt to execute invalid opcode {}", pop.name()),
            )),
        }
    }
}
