//! The stack-based virtual machine and its instruction set.

mod disassembler;
mod error;
mod numeric;
pub mod opcode;
mod runtime;


pub use disassembler::disassemble;
pub use error::RuntimeError;
pub use opcode::{ArithOp, CmpOp, LabelId, Op, OpCode, Scalar, SlotIndex, StoreBytes};
pub use runtime::{DebugTrapFn, ExternFn, Vm};
