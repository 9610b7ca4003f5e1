//! String builtins.
//!
//! Strings are VM-owned byte buffers addressed by 8-byte handles. Literal
//! text is interned into read-only slots by the emitter;
//! `bl__string__construct_from_literal__` fills a string object from such a
//! slot.

use crate::vm::{RuntimeError, SlotIndex, Vm};

/// `[string(-1)]`: allocate an empty string and store its handle.
pub fn bl_string_init(vm: &mut Vm) -> Result<(), RuntimeError> {
    let handle = vm.alloc_string(&[]);
    vm.store_pointer(SlotIndex::from(-1), handle)
}

/// `[dst(-2), src(-1)]`: clone the source string into a fresh object and
/// store the new handle at `-2`.
pub fn bl_string_copy(vm: &mut Vm) -> Result<(), RuntimeError> {
    let src = vm.get_pointer(SlotIndex::from(-1))?;
    let clone = vm.clone_string(src)?;
    vm.store_pointer(SlotIndex::from(-2), clone)
}

/// `[string(-1)]`: free the object and invalidate the handle.
pub fn bl_string_destruct(vm: &mut Vm) -> Result<(), RuntimeError> {
    let handle = vm.get_pointer(SlotIndex::from(-1))?;
    vm.free_string(handle)?;
    vm.store_pointer(SlotIndex::from(-1), 0)
}

/// `[string(-2), literal(-1)]`: replace the string's contents with the
/// literal slot's bytes.
pub fn bl_string_construct_from_literal(vm: &mut Vm) -> Result<(), RuntimeError> {
    let handle = vm.get_pointer(SlotIndex::from(-2))?;
    let bytes = vm.read_slot_bytes(SlotIndex::from(-1))?;
    vm.set_string_bytes(handle, &bytes)
}
