//! Embedding surface.
//!
//! A [`Context`] owns one VM and drives the compile pipeline. Hosts compile
//! source into a [`Program`](crate::emitter::Program), run its top-level
//! code, then call functions and read globals by name through the program's
//! symbol table.
//!
//! # Example
//!
//! ```ignore
//! use blacklua_core::api::Context;
//!
//! let mut ctx = Context::new();
//! let program = ctx.compile_string("int add(int x, int y) { return x + y; } ")?;
//! ctx.run(&program, "example")?;
//! ctx.call("add", "example")?; // with arguments set up by the host
//! ```

mod context;
mod error;


pub use context::{CompilerErrorHandler, Context, RuntimeErrorHandler};
pub use error::Error;
