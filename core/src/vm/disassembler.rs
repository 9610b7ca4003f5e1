//! Textual bytecode dump, one opcode per line.
//!
//! Slot references render as `(slot,offset,size)`; labels render as a bare
//! `<id>:` line and everything after a label is indented by four spaces.
//! Opcode debug annotations are appended as `; comment`.

use core::fmt::Write;

use crate::vm::opcode::{Op, OpCode};

pub fn disassemble(ops: &[OpCode]) -> String {
    let mut out = String::new();
    let mut indentation = "";

    for op in ops {
        if matches!(op.op, Op::Label { .. }) {
            indentation = "    ";
        } else {
            out.push_str(indentation);
        }

        write_op(&mut out, &op.op);

        if let Some(debug) = &op.debug
            && !matches!(op.op, Op::Label { .. })
        {
            let _ = write!(out, "    ; {}", debug);
        }

        out.push('\n');
    }

    out
}

fn write_op(out: &mut String, op: &Op) {
    let _ = match op {
        Op::Nop => write!(out, "nop"),

        Op::PushBytes { bytes } => write!(out, "push {}", bytes),
        Op::Pop => write!(out, "pop"),
        Op::PushStackFrame => write!(out, "push scope"),
        Op::PopStackFrame => write!(out, "pop scope"),

        Op::Store {
            slot,
            bytes,
            ..
        }
        | Op::StoreString {
            slot,
            bytes,
            ..
        } => {
            let _ = write!(out, "store {} <0x", slot);
            for (i, byte) in bytes.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{:02X}", byte);
            }
            write!(out, ">")
        }

        Op::Get { slot } => write!(out, "get {}", slot),
        Op::Copy { dst, src } => write!(out, "copy dst {} src {}", dst, src),
        Op::Dup { src } => write!(out, "dup {}", src),
        Op::Offset { base, offset, size } => {
            write!(out, "offset {} {} {}", base, offset, size)
        }

        Op::Label { id } => write!(out, "<{}>:", id),
        Op::Jmp { label } => write!(out, "jmp <{}>", label),
        Op::Jt { slot, label } => write!(out, "jt {} <{}>", slot, label),
        Op::Jf { slot, label } => write!(out, "jf {} <{}>", slot, label),
        Op::Call { label } => write!(out, "call <{}>", label),
        Op::CallExtern { name } => write!(out, "call extern {}", name),
        Op::Ret => write!(out, "ret"),
        Op::RetValue { slot } => write!(out, "ret value {}", slot),

        Op::Negate { ty, value } => write!(out, "negate {} {}", ty.as_str(), value),
        Op::Arith { op, ty, lhs, rhs } => {
            write!(out, "{} {} {} {}", op.as_str(), ty.as_str(), lhs, rhs)
        }
        Op::Cmp { op, ty, lhs, rhs } => {
            write!(out, "{} {} {} {}", op.as_str(), ty.as_str(), lhs, rhs)
        }
        Op::Cast { from, to, value } => {
            write!(out, "cast {} {} {}", from.as_str(), to.as_str(), value)
        }
    };
}
