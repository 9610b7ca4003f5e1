use ecow::EcoString;
use thiserror::Error;

/// A fault raised by the VM while executing bytecode or servicing a host
/// call. Execution is not resumable after a fault: the run loop reports it
/// through the installed handler and stops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("stack slot {0} is out of range")]
    SlotOutOfRange(i32),

    #[error("stack slot 0 is not addressable")]
    SlotZero,

    #[error("pop on an empty stack")]
    StackUnderflow,

    #[error("no active stack frame")]
    NoStackFrame,

    #[error("write to a read-only stack slot")]
    ReadOnlySlot,

    #[error("slot size mismatch: expected {expected} bytes, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    #[error("slot memory access out of bounds")]
    MemoryOutOfBounds,

    #[error("offset {offset} out of bounds for a slot of size {size}")]
    OffsetOutOfBounds { offset: i64, size: usize },

    #[error("unknown jump label {0}")]
    UnknownLabel(i32),

    #[error("unknown extern function `{0}`")]
    UnknownExtern(EcoString),

    #[error("return outside of a function frame")]
    ReturnOutsideFrame,

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid array handle {0}")]
    InvalidArrayHandle(u64),

    #[error("invalid string handle {0}")]
    InvalidStringHandle(u64),

    #[error("array index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
}
