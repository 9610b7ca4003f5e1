//! The virtual machine: a byte-addressable operand stack with named slots,
//! a stack-frame chain, a label table, and a native-function registry.
//!
//! Execution is single-threaded and cooperative. The dispatch loop runs
//! opcodes in program-counter order until the counter passes the end of the
//! program or a `Label` opcode is reached sequentially (labels mark call
//! targets; falling into one ends the current run cleanly).

use ecow::EcoString;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::vm::error::RuntimeError;
use crate::vm::numeric::{dispatch_scalar, Numeric};
use crate::vm::opcode::{ArithOp, CmpOp, LabelId, Op, OpCode, SlotIndex};

/// A native function callable through `CallExtern`. Arguments sit below a
/// caller-reserved return slot; the callback reads and writes through the
/// slot API and must not retain slot references across calls.
pub type ExternFn = fn(&mut Vm) -> Result<(), RuntimeError>;

/// Host callback invoked when the program counter hits a breakpoint.
pub type DebugTrapFn = Box<dyn FnMut(usize)>;

const INITIAL_STACK_BYTES: usize = 4 * 1024;
const INITIAL_SLOTS: usize = 64;

/// Where a slot's bytes live: in the VM byte stack, or inside a VM-owned
/// array object (element references produced by the array builtins).
#[derive(Debug, Clone, Copy)]
enum SlotMemory {
    Stack { base: usize },
    Array { handle: u64, offset: usize },
}

impl SlotMemory {
    fn advanced(self, by: usize) -> SlotMemory {
        match self {
            SlotMemory::Stack { base } => SlotMemory::Stack { base: base + by },
            SlotMemory::Array { handle, offset } => SlotMemory::Array {
                handle,
                offset: offset + by,
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    memory: SlotMemory,
    size: usize,
    read_only: bool,
    /// The stack-pointer watermark for slots created by `PushBytes`;
    /// popping one releases its stack bytes even if the slot has since been
    /// re-pointed elsewhere. Alias slots created by `Offset` carry `None`
    /// and pop without moving the stack pointer.
    stack_base: Option<usize>,
}

/// A resolved slot reference, with any sub-slot offset/size applied.
#[derive(Debug, Clone, Copy)]
struct ResolvedSlot {
    memory: SlotMemory,
    size: usize,
    read_only: bool,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    offset: usize,
    slot_offset: usize,
    return_address: Option<usize>,
    return_slot: i32,
}

struct ArrayObj {
    data: Vec<u8>,
    member_size: usize,
    len: usize,
}

pub struct Vm {
    stack: Vec<u8>,
    sp: usize,
    slots: Vec<Slot>,
    slot_ptr: usize,
    frames: Vec<Frame>,

    program: Vec<OpCode>,
    pc: usize,
    labels: HashMap<LabelId, usize>,

    externs: HashMap<EcoString, ExternFn>,
    breakpoints: HashMap<usize, bool>,
    debug_trap: Option<DebugTrapFn>,

    arrays: Vec<Option<ArrayObj>>,
    strings: Vec<Option<Vec<u8>>>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            stack: vec![0; INITIAL_STACK_BYTES],
            sp: 0,
            slots: Vec::with_capacity(INITIAL_SLOTS),
            slot_ptr: 0,
            frames: Vec::new(),
            program: Vec::new(),
            pc: 0,
            labels: HashMap::new(),
            externs: HashMap::new(),
            breakpoints: HashMap::new(),
            debug_trap: None,
            arrays: Vec::new(),
            strings: Vec::new(),
        }
    }

    // === Slot addressing ===

    fn slot_entry_index(&self, slot: i32) -> Result<usize, RuntimeError> {
        if slot < 0 {
            let index = self.slot_ptr as i64 + slot as i64;
            if index < 0 {
                return Err(RuntimeError::SlotOutOfRange(slot));
            }
            Ok(index as usize)
        } else if slot > 0 {
            let index = (slot - 1) as usize;
            if index >= self.slot_ptr {
                return Err(RuntimeError::SlotOutOfRange(slot));
            }
            Ok(index)
        } else {
            Err(RuntimeError::SlotZero)
        }
    }

    fn resolve(&self, index: SlotIndex) -> Result<ResolvedSlot, RuntimeError> {
        let entry = self.slots[self.slot_entry_index(index.slot)?];
        let size = if index.size != 0 { index.size } else { entry.size };
        Ok(ResolvedSlot {
            memory: entry.memory.advanced(index.offset),
            size,
            read_only: entry.read_only,
        })
    }

    /// The full (un-carved) byte size of a slot.
    pub fn slot_size(&self, slot: i32) -> Result<usize, RuntimeError> {
        Ok(self.slots[self.slot_entry_index(slot)?].size)
    }

    /// Number of live slots.
    pub fn slot_count(&self) -> usize {
        self.slot_ptr
    }

    /// Number of active stack frames.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    fn read_bytes(&self, slot: &ResolvedSlot) -> Result<SmallVec<[u8; 8]>, RuntimeError> {
        match slot.memory {
            SlotMemory::Stack { base } => {
                let end = base + slot.size;
                if end > self.stack.len() {
                    return Err(RuntimeError::MemoryOutOfBounds);
                }
                Ok(SmallVec::from_slice(&self.stack[base..end]))
            }
            SlotMemory::Array { handle, offset } => {
                let array = self.array(handle)?;
                let end = offset + slot.size;
                if end > array.data.len() {
                    return Err(RuntimeError::MemoryOutOfBounds);
                }
                Ok(SmallVec::from_slice(&array.data[offset..end]))
            }
        }
    }

    fn write_bytes(&mut self, slot: &ResolvedSlot, bytes: &[u8]) -> Result<(), RuntimeError> {
        if slot.read_only {
            return Err(RuntimeError::ReadOnlySlot);
        }
        if bytes.len() != slot.size {
            return Err(RuntimeError::SizeMismatch {
                expected: slot.size,
                found: bytes.len(),
            });
        }

        match slot.memory {
            SlotMemory::Stack { base } => {
                let end = base + slot.size;
                if end > self.stack.len() {
                    return Err(RuntimeError::MemoryOutOfBounds);
                }
                self.stack[base..end].copy_from_slice(bytes);
            }
            SlotMemory::Array { handle, offset } => {
                let end = offset + slot.size;
                let array = self.array_mut(handle)?;
                if end > array.data.len() {
                    return Err(RuntimeError::MemoryOutOfBounds);
                }
                array.data[offset..end].copy_from_slice(bytes);
            }
        }
        Ok(())
    }

    /// Read a slot's raw bytes (host/native-function helper).
    pub fn read_slot_bytes(&self, index: SlotIndex) -> Result<Vec<u8>, RuntimeError> {
        let slot = self.resolve(index)?;
        Ok(self.read_bytes(&slot)?.to_vec())
    }

    // === Stack primitives ===

    /// Reserve `amount` bytes (aligned up to 8) and record a new slot over
    /// them.
    pub fn push_bytes(&mut self, amount: usize) -> Result<(), RuntimeError> {
        let aligned = amount.div_ceil(8) * 8;

        while self.sp + aligned > self.stack.len() {
            let new_len = self.stack.len() * 2;
            self.stack.resize(new_len, 0);
        }
        self.sp += aligned;

        let slot = Slot {
            memory: SlotMemory::Stack {
                base: self.sp - aligned,
            },
            size: amount,
            read_only: false,
            stack_base: Some(self.sp - aligned),
        };
        self.push_slot(slot);
        Ok(())
    }

    fn push_slot(&mut self, slot: Slot) {
        if self.slot_ptr == self.slots.len() {
            self.slots.push(slot);
        } else {
            self.slots[self.slot_ptr] = slot;
        }
        self.slot_ptr += 1;
    }

    /// Pop the top slot, releasing its stack bytes if it owns any.
    pub fn pop(&mut self) -> Result<(), RuntimeError> {
        if self.slot_ptr == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.slot_ptr -= 1;
        let slot = self.slots[self.slot_ptr];
        if let Some(base) = slot.stack_base {
            self.sp = base;
        }
        Ok(())
    }

    pub fn push_stack_frame(&mut self) {
        self.frames.push(Frame {
            offset: self.sp,
            slot_offset: self.slot_ptr,
            return_address: None,
            return_slot: 0,
        });
    }

    pub fn pop_stack_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self.frames.pop().ok_or(RuntimeError::NoStackFrame)?;
        self.sp = frame.offset;
        self.slot_ptr = frame.slot_offset;
        Ok(())
    }

    // === Data movement ===

    pub fn store(
        &mut self,
        index: SlotIndex,
        bytes: &[u8],
        set_read_only: bool,
    ) -> Result<(), RuntimeError> {
        let slot = self.resolve(index)?;
        self.write_bytes(&slot, bytes)?;
        let entry = self.slot_entry_index(index.slot)?;
        self.slots[entry].read_only = set_read_only;
        Ok(())
    }

    pub fn copy(&mut self, dst: SlotIndex, src: SlotIndex) -> Result<(), RuntimeError> {
        let dst_slot = self.resolve(dst)?;
        let src_slot = self.resolve(src)?;

        if dst_slot.size != src_slot.size {
            return Err(RuntimeError::SizeMismatch {
                expected: dst_slot.size,
                found: src_slot.size,
            });
        }

        let bytes = self.read_bytes(&src_slot)?;
        self.write_bytes(&dst_slot, &bytes)
    }

    /// Push a fresh slot holding a copy of `src`'s bytes.
    pub fn dup(&mut self, src: SlotIndex) -> Result<(), RuntimeError> {
        let src_slot = self.resolve(src)?;
        let bytes = self.read_bytes(&src_slot)?;

        self.push_bytes(src_slot.size)?;
        let top = self.resolve(SlotIndex::from(-1))?;
        self.write_bytes(&top, &bytes)
    }

    fn offset(
        &mut self,
        base: SlotIndex,
        offset: SlotIndex,
        size: usize,
    ) -> Result<(), RuntimeError> {
        let shift = self.get_int(offset)?;
        let base_slot = self.resolve(base)?;

        if shift < 0 || shift as usize >= base_slot.size {
            return Err(RuntimeError::OffsetOutOfBounds {
                offset: shift as i64,
                size: base_slot.size,
            });
        }

        let slot = Slot {
            memory: base_slot.memory.advanced(shift as usize),
            size,
            read_only: base_slot.read_only,
            stack_base: None,
        };
        self.push_slot(slot);
        Ok(())
    }

    /// Re-point a slot entry at an element inside an array object. Used by
    /// the array builtins to hand out element references.
    pub fn point_slot_at_array(
        &mut self,
        slot: i32,
        handle: u64,
        offset: usize,
    ) -> Result<(), RuntimeError> {
        {
            let array = self.array(handle)?;
            let entry = self.slots[self.slot_entry_index(slot)?];
            if offset + entry.size > array.data.len() {
                return Err(RuntimeError::MemoryOutOfBounds);
            }
        }

        let entry = self.slot_entry_index(slot)?;
        self.slots[entry].memory = SlotMemory::Array { handle, offset };
        self.slots[entry].read_only = false;
        Ok(())
    }

    // === Typed accessors ===

    fn read_num<T: Numeric>(&self, index: SlotIndex) -> Result<T, RuntimeError> {
        let slot = self.resolve(index)?;
        if slot.size != T::SIZE {
            return Err(RuntimeError::SizeMismatch {
                expected: T::SIZE,
                found: slot.size,
            });
        }
        let bytes = self.read_bytes(&slot)?;
        Ok(T::from_bytes(&bytes))
    }

    fn store_num<T: Numeric>(&mut self, index: SlotIndex, value: T) -> Result<(), RuntimeError> {
        let slot = self.resolve(index)?;
        if slot.size != T::SIZE {
            return Err(RuntimeError::SizeMismatch {
                expected: T::SIZE,
                found: slot.size,
            });
        }
        let mut buf = [0u8; 8];
        value.write_bytes(&mut buf[..T::SIZE]);
        self.write_bytes(&slot, &buf[..T::SIZE])
    }

    fn push_num<T: Numeric>(&mut self, value: T) -> Result<(), RuntimeError> {
        self.push_bytes(T::SIZE)?;
        self.store_num(SlotIndex::from(-1), value)
    }

    pub fn get_bool(&self, slot: SlotIndex) -> Result<bool, RuntimeError> {
        Ok(self.read_num::<u8>(slot)? != 0)
    }

    pub fn get_char(&self, slot: SlotIndex) -> Result<i8, RuntimeError> {
        self.read_num(slot)
    }

    pub fn get_short(&self, slot: SlotIndex) -> Result<i16, RuntimeError> {
        self.read_num(slot)
    }

    pub fn get_int(&self, slot: SlotIndex) -> Result<i32, RuntimeError> {
        self.read_num(slot)
    }

    pub fn get_long(&self, slot: SlotIndex) -> Result<i64, RuntimeError> {
        self.read_num(slot)
    }

    pub fn get_float(&self, slot: SlotIndex) -> Result<f32, RuntimeError> {
        self.read_num(slot)
    }

    pub fn get_double(&self, slot: SlotIndex) -> Result<f64, RuntimeError> {
        self.read_num(slot)
    }

    /// Read an 8-byte handle (the "pointer" representation of strings and
    /// arrays).
    pub fn get_pointer(&self, slot: SlotIndex) -> Result<u64, RuntimeError> {
        self.read_num(slot)
    }

    pub fn store_bool(&mut self, slot: SlotIndex, value: bool) -> Result<(), RuntimeError> {
        self.store_num(slot, value as u8)
    }

    pub fn store_char(&mut self, slot: SlotIndex, value: i8) -> Result<(), RuntimeError> {
        self.store_num(slot, value)
    }

    pub fn store_short(&mut self, slot: SlotIndex, value: i16) -> Result<(), RuntimeError> {
        self.store_num(slot, value)
    }

    pub fn store_int(&mut self, slot: SlotIndex, value: i32) -> Result<(), RuntimeError> {
        self.store_num(slot, value)
    }

    pub fn store_long(&mut self, slot: SlotIndex, value: i64) -> Result<(), RuntimeError> {
        self.store_num(slot, value)
    }

    pub fn store_float(&mut self, slot: SlotIndex, value: f32) -> Result<(), RuntimeError> {
        self.store_num(slot, value)
    }

    pub fn store_double(&mut self, slot: SlotIndex, value: f64) -> Result<(), RuntimeError> {
        self.store_num(slot, value)
    }

    pub fn store_pointer(&mut self, slot: SlotIndex, value: u64) -> Result<(), RuntimeError> {
        self.store_num(slot, value)
    }

    // === Extern registry ===

    pub fn add_extern(&mut self, name: impl Into<EcoString>, f: ExternFn) {
        self.externs.insert(name.into(), f);
    }

    pub fn call_extern(&mut self, name: &str) -> Result<(), RuntimeError> {
        let name = EcoString::from(name);
        tracing::trace!(%name, "calling extern");
        let f = *self
            .externs
            .get(&name)
            .ok_or(RuntimeError::UnknownExtern(name))?;
        f(self)
    }

    // === Breakpoints ===

    pub fn add_breakpoint(&mut self, pc: usize) {
        self.breakpoints.insert(pc, true);
    }

    pub fn set_debug_trap(&mut self, trap: DebugTrapFn) {
        self.debug_trap = Some(trap);
    }

    /// Move the program counter past the last opcode, ending the run.
    pub fn stop_execution(&mut self) {
        self.pc = self.program.len();
    }

    // === Array and string objects ===

    fn array(&self, handle: u64) -> Result<&ArrayObj, RuntimeError> {
        self.arrays
            .get(handle as usize)
            .and_then(|a| a.as_ref())
            .ok_or(RuntimeError::InvalidArrayHandle(handle))
    }

    fn array_mut(&mut self, handle: u64) -> Result<&mut ArrayObj, RuntimeError> {
        self.arrays
            .get_mut(handle as usize)
            .and_then(|a| a.as_mut())
            .ok_or(RuntimeError::InvalidArrayHandle(handle))
    }

    /// Allocate a zero-filled array object and return its handle.
    pub fn alloc_array(&mut self, member_size: usize, len: usize) -> u64 {
        self.arrays.push(Some(ArrayObj {
            data: vec![0; member_size * len],
            member_size,
            len,
        }));
        (self.arrays.len() - 1) as u64
    }

    pub fn array_len(&self, handle: u64) -> Result<usize, RuntimeError> {
        Ok(self.array(handle)?.len)
    }

    pub fn array_member_size(&self, handle: u64) -> Result<usize, RuntimeError> {
        Ok(self.array(handle)?.member_size)
    }

    pub fn clone_array(&mut self, handle: u64) -> Result<u64, RuntimeError> {
        let src = self.array(handle)?;
        let clone = ArrayObj {
            data: src.data.clone(),
            member_size: src.member_size,
            len: src.len,
        };
        self.arrays.push(Some(clone));
        Ok((self.arrays.len() - 1) as u64)
    }

    pub fn free_array(&mut self, handle: u64) -> Result<(), RuntimeError> {
        let entry = self
            .arrays
            .get_mut(handle as usize)
            .ok_or(RuntimeError::InvalidArrayHandle(handle))?;
        if entry.take().is_none() {
            return Err(RuntimeError::InvalidArrayHandle(handle));
        }
        Ok(())
    }

    pub fn alloc_string(&mut self, bytes: &[u8]) -> u64 {
        self.strings.push(Some(bytes.to_vec()));
        (self.strings.len() - 1) as u64
    }

    pub fn string_bytes(&self, handle: u64) -> Result<&[u8], RuntimeError> {
        self.strings
            .get(handle as usize)
            .and_then(|s| s.as_deref())
            .ok_or(RuntimeError::InvalidStringHandle(handle))
    }

    pub fn set_string_bytes(&mut self, handle: u64, bytes: &[u8]) -> Result<(), RuntimeError> {
        let entry = self
            .strings
            .get_mut(handle as usize)
            .and_then(|s| s.as_mut())
            .ok_or(RuntimeError::InvalidStringHandle(handle))?;
        entry.clear();
        entry.extend_from_slice(bytes);
        Ok(())
    }

    pub fn clone_string(&mut self, handle: u64) -> Result<u64, RuntimeError> {
        let bytes = self.string_bytes(handle)?.to_vec();
        self.strings.push(Some(bytes));
        Ok((self.strings.len() - 1) as u64)
    }

    pub fn free_string(&mut self, handle: u64) -> Result<(), RuntimeError> {
        let entry = self
            .strings
            .get_mut(handle as usize)
            .ok_or(RuntimeError::InvalidStringHandle(handle))?;
        if entry.take().is_none() {
            return Err(RuntimeError::InvalidStringHandle(handle));
        }
        Ok(())
    }

    // === Execution ===

    /// Load a program, register its labels, and run top-level code from the
    /// first opcode.
    pub fn run_bytecode(&mut self, ops: &[OpCode]) -> Result<(), RuntimeError> {
        self.program = ops.to_vec();
        self.labels.clear();
        for (index, op) in self.program.iter().enumerate() {
            if let Op::Label { id } = op.op {
                self.labels.insert(id, index);
            }
        }

        self.pc = 0;
        self.run()
    }

    /// Invoke a function label: sets up a call frame whose return unwinds
    /// back out of the run loop.
    pub fn call(&mut self, label: LabelId) -> Result<(), RuntimeError> {
        let return_address = self.pc;
        let target = *self
            .labels
            .get(&label)
            .ok_or(RuntimeError::UnknownLabel(label))?;

        self.frames.push(Frame {
            offset: self.sp,
            slot_offset: self.slot_ptr,
            return_address: Some(return_address),
            return_slot: self.slot_ptr as i32,
        });
        self.pc = target + 1;
        self.run()
    }

    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let program = core::mem::take(&mut self.program);
        let result = self.run_inner(&program);
        self.program = program;
        if let Err(error) = &result {
            tracing::debug!(%error, pc = self.pc, "runtime fault");
        }
        result
    }

    fn run_inner(&mut self, program: &[OpCode]) -> Result<(), RuntimeError> {
        while self.pc < program.len() {
            if self.breakpoints.contains_key(&self.pc)
                && let Some(trap) = self.debug_trap.as_mut()
            {
                trap(self.pc);
            }

            match &program[self.pc].op {
                Op::Nop => {}

                Op::PushBytes { bytes } => self.push_bytes(*bytes)?,
                Op::Pop => self.pop()?,
                Op::PushStackFrame => self.push_stack_frame(),
                Op::PopStackFrame => self.pop_stack_frame()?,

                Op::Store {
                    slot,
                    bytes,
                    set_read_only,
                }
                | Op::StoreString {
                    slot,
                    bytes,
                    set_read_only,
                } => self.store(*slot, bytes, *set_read_only)?,

                Op::Get { slot } | Op::Dup { src: slot } => self.dup(*slot)?,

                Op::Copy { dst, src } => self.copy(*dst, *src)?,

                Op::Offset { base, offset, size } => self.offset(*base, *offset, *size)?,

                // A label reached sequentially ends the run: labels mark
                // call targets, not fall-through code.
                Op::Label { .. } => {
                    self.pc = program.len();
                    continue;
                }

                Op::Jmp { label } => {
                    self.pc = self.label_target(*label)?;
                }

                Op::Jt { slot, label } => {
                    if self.get_bool(*slot)? {
                        self.pc = self.label_target(*label)?;
                    }
                }

                Op::Jf { slot, label } => {
                    if !self.get_bool(*slot)? {
                        self.pc = self.label_target(*label)?;
                    }
                }

                Op::Call { label } => {
                    let target = self.label_target(*label)?;
                    self.frames.push(Frame {
                        offset: self.sp,
                        slot_offset: self.slot_ptr,
                        return_address: Some(self.pc),
                        return_slot: self.slot_ptr as i32,
                    });
                    // The loop increment lands inside the body, just past
                    // the label itself.
                    self.pc = target;
                }

                Op::CallExtern { name } => {
                    let f = *self
                        .externs
                        .get(name)
                        .ok_or_else(|| RuntimeError::UnknownExtern(name.clone()))?;
                    f(self)?;
                }

                Op::Ret => self.unwind_return(None)?,
                Op::RetValue { slot } => self.unwind_return(Some(*slot))?,

                Op::Negate { ty, value } => dispatch_scalar!(*ty, T, {
                    let v: T = self.read_num(*value)?;
                    self.push_num(v.neg())?;
                }),

                Op::Arith { op, ty, lhs, rhs } => dispatch_scalar!(*ty, T, {
                    let l: T = self.read_num(*lhs)?;
                    let r: T = self.read_num(*rhs)?;
                    let result = match op {
                        ArithOp::Add => l.add(r),
                        ArithOp::Sub => l.sub(r),
                        ArithOp::Mul => l.mul(r),
                        ArithOp::Div => l.div(r).ok_or(RuntimeError::DivisionByZero)?,
                        ArithOp::Mod => l.rem(r).ok_or(RuntimeError::DivisionByZero)?,
                    };
                    self.push_num(result)?;
                }),

                Op::Cmp { op, ty, lhs, rhs } => dispatch_scalar!(*ty, T, {
                    let l: T = self.read_num(*lhs)?;
                    let r: T = self.read_num(*rhs)?;
                    let result = match op {
                        CmpOp::Cmp => l == r,
                        CmpOp::Ncmp => l != r,
                        CmpOp::Lt => l < r,
                        CmpOp::Lte => l <= r,
                        CmpOp::Gt => l > r,
                        CmpOp::Gte => l >= r,
                    };
                    self.push_num(result as u8)?;
                }),

                Op::Cast { from, to, value } => dispatch_scalar!(*from, S, {
                    let v: S = self.read_num(*value)?;
                    dispatch_scalar!(*to, D, {
                        self.push_num(v as D)?;
                    })
                }),
            }

            self.pc += 1;
        }

        Ok(())
    }

    fn label_target(&self, label: LabelId) -> Result<usize, RuntimeError> {
        self.labels
            .get(&label)
            .copied()
            .ok_or(RuntimeError::UnknownLabel(label))
    }

    /// Unwind to the innermost frame carrying a return address; for
    /// `RetValue`, first copy the value into that frame's return slot.
    fn unwind_return(&mut self, value: Option<SlotIndex>) -> Result<(), RuntimeError> {
        let position = self
            .frames
            .iter()
            .rposition(|frame| frame.return_address.is_some())
            .ok_or(RuntimeError::ReturnOutsideFrame)?;

        let frame = self.frames[position];
        let return_address = frame
            .return_address
            .ok_or(RuntimeError::ReturnOutsideFrame)?;

        if let Some(slot) = value {
            self.copy(SlotIndex::from(frame.return_slot), slot)?;
        }

        while self.frames.len() > position {
            self.pop_stack_frame()?;
        }

        self.pc = return_address;
        Ok(())
    }
}
