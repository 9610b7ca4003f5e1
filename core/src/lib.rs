//! BlackLua: an ahead-of-time compiler and stack-based virtual machine for
//! a small statically-typed imperative language with C-like syntax.
//!
//! The pipeline is `lexer -> parser -> analyzer -> emitter -> vm`: source
//! text becomes a token stream, an arena-allocated AST, a type-resolved
//! tree with implicit casts made explicit, and finally a linear opcode
//! sequence executed against a byte-addressable operand stack. Hosts embed
//! the VM through [`api::Context`] and register native functions callable
//! from compiled code.

pub mod analyzer;
pub mod api;
pub mod diagnostics;
pub mod emitter;
pub mod lexer;
pub mod parser;
pub mod scope_stack;
pub mod source;
pub mod stdlib;
pub mod vm;
