//! Emitter: typed AST -> bytecode.
//!
//! Two passes. The first interns every constant into a read-only slot so
//! literals live at known addresses before any user code runs; the second
//! lowers statements and expressions, mirroring the runtime's stack-frame
//! discipline in a compile-time frame chain that assigns slots to names.
//! Function labels are pre-assigned in declaration order so call sites may
//! precede definitions. Emission is deterministic: the same typed tree
//! always produces a byte-identical opcode sequence.

mod emitter;


use ecow::EcoString;
use hashbrown::HashMap;
use thiserror::Error;

use crate::source::SourceLocation;
use crate::vm::{LabelId, OpCode};

pub use emitter::emit;

/// A compiled program: the opcode sequence plus the global symbols the
/// embedding surface resolves names through.
#[derive(Debug, Clone)]
pub struct Program {
    pub ops: Vec<OpCode>,
    pub symbols: HashMap<EcoString, Symbol>,
}

impl Program {
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(&EcoString::from(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// A top-level variable: absolute slot number and byte size.
    Global { slot: i32, size: usize },
    /// A function or method: entry label and return-value size.
    Function { label: LabelId, return_size: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error("Operator {op} is not supported by the instruction set")]
    UnsupportedOperator {
        op: &'static str,
        location: SourceLocation,
    },

    #[error("Call to undefined function {name}")]
    UndefinedFunction {
        name: String,
        location: SourceLocation,
    },

    #[error("internal emitter error: {message}")]
    Internal { message: &'static str },
}

impl EmitError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            EmitError::UnsupportedOperator { location, .. }
            | EmitError::UndefinedFunction { location, .. } => Some(*location),
            EmitError::Internal { .. } => None,
        }
    }
}
