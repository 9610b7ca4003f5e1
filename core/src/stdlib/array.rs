//! Array builtins.
//!
//! Arrays are VM-owned objects addressed by 8-byte handles; an array-typed
//! slot holds the handle. The indexing convention is the load-bearing one:
//! the compiler passes `[array, index, element-sized slot]` and the builtin
//! re-points the element slot at the element's storage, so reads and writes
//! through it reach the array itself.

use crate::vm::{RuntimeError, SlotIndex, Vm};

/// `[array(-2), element-size slot(-1)]`: allocate an empty array whose
/// member size is the top slot's byte size, storing the handle at `-2`.
pub fn bl_array_init(vm: &mut Vm) -> Result<(), RuntimeError> {
    let member_size = vm.slot_size(-1)?;
    let handle = vm.alloc_array(member_size, 0);
    vm.store_pointer(SlotIndex::from(-2), handle)
}

/// `[dst(-2), src(-1)]`: clone the source array into a fresh object and
/// store the new handle at `-2`.
pub fn bl_array_copy(vm: &mut Vm) -> Result<(), RuntimeError> {
    let src = vm.get_pointer(SlotIndex::from(-1))?;
    let clone = vm.clone_array(src)?;
    vm.store_pointer(SlotIndex::from(-2), clone)
}

/// `[array(-1)]`: free the object and invalidate the handle.
pub fn bl_array_destruct(vm: &mut Vm) -> Result<(), RuntimeError> {
    let handle = vm.get_pointer(SlotIndex::from(-1))?;
    vm.free_array(handle)?;
    vm.store_pointer(SlotIndex::from(-1), 0)
}

/// `[array(-3), index(-2), element(-1)]`: bounds-check the index and turn
/// the element slot into a reference to the element's bytes.
pub fn bl_array_index(vm: &mut Vm) -> Result<(), RuntimeError> {
    let handle = vm.get_pointer(SlotIndex::from(-3))?;
    let index = vm.get_int(SlotIndex::from(-2))?;

    let len = vm.array_len(handle)?;
    let member_size = vm.array_member_size(handle)?;
    let element_size = vm.slot_size(-1)?;

    if element_size != member_size {
        return Err(RuntimeError::SizeMismatch {
            expected: member_size,
            found: element_size,
        });
    }
    if index < 0 || index as usize >= len {
        return Err(RuntimeError::IndexOutOfBounds {
            index: index as i64,
            len,
        });
    }

    vm.point_slot_at_array(-1, handle, index as usize * member_size)
}
