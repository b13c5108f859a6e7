//! Interpreter error codes and the error type carried out of script execution.

use std::fmt;

/// Machine-readable failure codes for script execution.
///
/// `Ok` is an internal sentinel used to signal early success from a
/// post-genesis `OP_RETURN`; it never escapes `Engine::execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterErrorCode {
    Ok,
    Internal,
    InvalidFlags,
    InvalidParams,
    InvalidProgramCounter,

    // Terminal stack state
    EvalFalse,
    EmptyStack,
    CleanStack,

    // Opcode legality
    BadOpcode,
    DisabledOpcode,
    ReservedOpcode,
    EarlyReturn,
    DiscourageUpgradableNOPs,

    // Structural limits
    ScriptSize,
    PushSize,
    ElementTooBig,
    TooManyOperations,
    StackOverflow,
    StackSizeExceeded,
    MalformedPush,

    // Stack and number handling
    InvalidStackOperation,
    InvalidAltStackOperation,
    InvalidNumberRange,
    InvalidSplitRange,
    ImpossibleEncoding,
    DivideByZero,
    MinimalData,
    MinimalIf,
    UnbalancedConditional,
    InvalidInputLength,

    // Verify family
    Verify,
    EqualVerify,
    NumEqualVerify,
    CheckSigVerify,
    CheckMultiSigVerify,

    // Signature and key encoding
    SigDER,
    SigHashType,
    SigHighS,
    SigNullDummy,
    NullFail,
    PubKeyType,
    PubKeyCount,
    SigCount,
    NotPushOnly,
    IllegalForkID,

    // Locktime
    NegativeLockTime,
    UnsatisfiedLockTime,

    // External interruption
    Cancelled,
}

impl fmt::Display for InterpreterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A script execution failure: a code plus human-readable context.
#[derive(Debug, Clone)]
pub struct InterpreterError {
    pub code: InterpreterErrorCode,
    pub description: String,
}

impl InterpreterError {
    pub fn new(code: InterpreterErrorCode, description: impl Into<String>) -> Self {
        InterpreterError {
            code,
            description: description.into(),
        }
    }

    /// Check whether this error carries the given code.
    pub fn is_code(&self, code: InterpreterErrorCode) -> bool {
        self.code == code
    }
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

impl std::error::Error for InterpreterError {}
