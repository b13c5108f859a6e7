//! Script interpreter.
//!
//! Executes unlocking and locking scripts to verify transaction inputs.
//! The interpreter is a state machine stepping one opcode at a time over
//! byte-budgeted stacks, with pre- and post-genesis limit sets selected by
//! the `UTXO_AFTER_GENESIS` flag. Signature checking is delegated through
//! the [`TxContext`] trait so this crate stays independent of the
//! transaction wire format.
//!
//! ```no_run
//! use sv_script::interpreter::{Engine, ScriptFlags};
//! use sv_script::Script;
//!
//! let unlocking = Script::from_asm("OP_1").unwrap();
//! let locking = Script::from_asm("OP_1 OP_EQUAL").unwrap();
//! Engine::new()
//!     .execute(&unlocking, &locking, ScriptFlags::NONE, None, 0)
//!     .unwrap();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod config;
pub mod error;
pub mod flags;
mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

pub use config::Config;
pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::{Stack, ELEMENT_OVERHEAD};
pub use thread::Thread;

use crate::Script;

/// Transaction state the interpreter needs for signature and locktime
/// opcodes. Implemented by the transaction crate.
pub trait TxContext {
    /// Verify `full_sig` (DER body plus trailing sighash directive byte)
    /// over `sub_script` for the given input.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u32,
    ) -> Result<bool, InterpreterError>;

    fn lock_time(&self) -> u32;

    fn tx_version(&self) -> u32;

    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// Cheap cloneable handle for aborting an in-flight execution.
///
/// The step loop polls the token once per opcode, so cancellation lands
/// within one opcode of the request.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Script execution engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Execute the unlocking script followed by the locking script.
    ///
    /// Succeeds iff execution completes with a true value on top of the
    /// stack. `tx_context` is required for checksig and locktime opcodes.
    pub fn execute(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(
            unlocking_script,
            locking_script,
            flags,
            tx_context,
            input_idx,
            None,
        )?;
        thread.execute()
    }

    /// Like [`execute`](Engine::execute), but with caller-supplied limits.
    /// The config's genesis setting must agree with `UTXO_AFTER_GENESIS`.
    pub fn execute_with_config(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        cfg: Config,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::with_config(
            unlocking_script,
            locking_script,
            flags,
            cfg,
            tx_context,
            input_idx,
            None,
        )?;
        thread.execute()
    }

    /// Like [`execute`](Engine::execute), but polls the token between
    /// opcodes and fails with `Cancelled` once it fires.
    pub fn execute_with_token(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
        token: &CancellationToken,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(
            unlocking_script,
            locking_script,
            flags,
            tx_context,
            input_idx,
            Some(token.clone()),
        )?;
        thread.execute()
    }
}
