//! The bytecode instruction set.
//!
//! One opcode enum parameterized by a small [`Scalar`] type tag instead of a
//! variant per numeric type; the VM dispatches generically over the tag.
//! `Store` payloads own their bytes and `CallExtern` owns its name, so a
//! compiled program outlives the compilation arena.

use core::fmt;

use ecow::EcoString;
use smallvec::SmallVec;

pub type LabelId = i32;

/// Reference to a stack slot.
///
/// Positive `slot` is absolute from the stack base (1-indexed), negative
/// counts back from the top of the slot stack, and zero is invalid.
/// A non-zero `offset`/`size` carves a sub-region out of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotIndex {
    pub slot: i32,
    pub offset: usize,
    pub size: usize,
}

impl SlotIndex {
    pub fn new(slot: i32, offset: usize, size: usize) -> Self {
        Self { slot, offset, size }
    }
}

impl From<i32> for SlotIndex {
    fn from(slot: i32) -> Self {
        Self {
            slot,
            offset: 0,
            size: 0,
        }
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.slot, self.offset, self.size)
    }
}

/// The numeric type an arithmetic, comparison or cast opcode operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl Scalar {
    pub fn size(self) -> usize {
        match self {
            Scalar::I8 | Scalar::U8 => 1,
            Scalar::I16 | Scalar::U16 => 2,
            Scalar::I32 | Scalar::U32 | Scalar::F32 => 4,
            Scalar::I64 | Scalar::U64 | Scalar::F64 => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scalar::I8 => "i8",
            Scalar::I16 => "i16",
            Scalar::I32 => "i32",
            Scalar::I64 => "i64",
            Scalar::U8 => "u8",
            Scalar::U16 => "u16",
            Scalar::U32 => "u32",
            Scalar::U64 => "u64",
            Scalar::F32 => "f32",
            Scalar::F64 => "f64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Mod => "mod",
        }
    }
}

/// Comparison opcodes always push a single byte holding the bool result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Cmp,
    Ncmp,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Cmp => "cmp",
            CmpOp::Ncmp => "ncmp",
            CmpOp::Lt => "lt",
            CmpOp::Lte => "lte",
            CmpOp::Gt => "gt",
            CmpOp::Gte => "gte",
        }
    }
}

pub type StoreBytes = SmallVec<[u8; 8]>;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Nop,

    PushBytes {
        bytes: usize,
    },
    Pop,
    PushStackFrame,
    PopStackFrame,
    /// Copy literal bytes into a slot; optionally mark it read-only.
    Store {
        slot: SlotIndex,
        bytes: StoreBytes,
        set_read_only: bool,
    },
    /// `Store` for interned string literals.
    StoreString {
        slot: SlotIndex,
        bytes: StoreBytes,
        set_read_only: bool,
    },
    /// Push a copy of the slot's bytes as a new slot.
    Get {
        slot: SlotIndex,
    },
    Copy {
        dst: SlotIndex,
        src: SlotIndex,
    },
    Dup {
        src: SlotIndex,
    },
    /// Append a slot aliasing `base` shifted by the integer read from
    /// `offset`, with the given size.
    Offset {
        base: SlotIndex,
        offset: SlotIndex,
        size: usize,
    },

    /// Marks a call target. Reaching a label by sequential execution halts
    /// the current run.
    Label {
        id: LabelId,
    },
    Jmp {
        label: LabelId,
    },
    Jt {
        slot: SlotIndex,
        label: LabelId,
    },
    Jf {
        slot: SlotIndex,
        label: LabelId,
    },
    Call {
        label: LabelId,
    },
    CallExtern {
        name: EcoString,
    },
    Ret,
    RetValue {
        slot: SlotIndex,
    },

    Negate {
        ty: Scalar,
        value: SlotIndex,
    },
    Arith {
        op: ArithOp,
        ty: Scalar,
        lhs: SlotIndex,
        rhs: SlotIndex,
    },
    Cmp {
        op: CmpOp,
        ty: Scalar,
        lhs: SlotIndex,
        rhs: SlotIndex,
    },
    Cast {
        from: Scalar,
        to: Scalar,
        value: SlotIndex,
    },
}

/// One bytecode operation plus optional debug text shown by the
/// disassembler.
#[derive(Debug, Clone, PartialEq)]
pub struct OpCode {
    pub op: Op,
    pub debug: Option<EcoString>,
}

impl OpCode {
    pub fn new(op: Op) -> Self {
        Self { op, debug: None }
    }

    pub fn with_debug(op: Op, debug: impl Into<EcoString>) -> Self {
        Self {
            op,
            debug: Some(debug.into()),
        }
    }
}
