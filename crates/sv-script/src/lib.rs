//! Bitcoin script representation and execution.
//!
//! Provides the [`Script`] byte container, opcode definitions, chunk-level
//! parsing, and the interpreter [`Engine`](interpreter::Engine).

pub mod chunk;
pub mod interpreter;
pub mod opcodes;
pub mod script;

mod error;
pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use script::Script;
