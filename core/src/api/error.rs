use thiserror::Error;

use crate::emitter::EmitError;
use crate::vm::RuntimeError;

/// Embedding-facing error type.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more compile diagnostics were reported; they have already
    /// been delivered to the compiler-error handler.
    #[error("compilation failed with {count} error(s)")]
    Compile { count: usize },

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),

    #[error("`{0}` is not a callable function")]
    NotAFunction(String),

    #[error("`{0}` is not a global variable")]
    NotAGlobal(String),

    #[error("no program has been run in this context")]
    NoProgram,

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}
