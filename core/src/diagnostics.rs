//! Compile-time diagnostic sink.
//!
//! The lexer, parser, and type checker all report through one [`Diagnostics`]
//! value and keep going; the embedding context drains the accumulated
//! diagnostics into the registered compiler-error callback and refuses to
//! emit bytecode if any stage reported.

use crate::source::SourceLocation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: SourceLocation,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, location: SourceLocation, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(line = location.line, column = location.column, %message, "compile diagnostic");
        self.entries.push(Diagnostic { location, message });
    }

    pub fn has_errors(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }
}
