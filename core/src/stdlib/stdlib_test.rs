use pretty_assertions::assert_eq;

use super::{
    bl_array_copy, bl_array_destruct, bl_array_index, bl_array_init, bl_string_construct_from_literal,
    bl_string_destruct, bl_string_init,
};
use crate::vm::{RuntimeError, SlotIndex, Vm};

/// Push the `[array, index, element]` convention for `bl__array__index__`.
fn push_index_call(vm: &mut Vm, handle: u64, index: i32, element_size: usize) {
    vm.push_bytes(8).unwrap();
    vm.store_pointer(SlotIndex::from(-1), handle).unwrap();
    vm.push_bytes(4).unwrap();
    vm.store_int(SlotIndex::from(-1), index).unwrap();
    vm.push_bytes(element_size).unwrap();
}

#[test]
fn test_array_index_returns_element_reference() {
    let mut vm = Vm::new();
    let handle = vm.alloc_array(4, 3);

    // Write 7 through an element reference...
    push_index_call(&mut vm, handle, 1, 4);
    bl_array_index(&mut vm).unwrap();
    vm.store_int(SlotIndex::from(-1), 7).unwrap();
    for _ in 0..3 {
        vm.pop().unwrap();
    }

    // ...and read it back through a fresh one.
    push_index_call(&mut vm, handle, 1, 4);
    bl_array_index(&mut vm).unwrap();
    assert_eq!(vm.get_int(SlotIndex::from(-1)).unwrap(), 7);

    // Untouched elements stay zero.
    for _ in 0..3 {
        vm.pop().unwrap();
    }
    push_index_call(&mut vm, handle, 0, 4);
    bl_array_index(&mut vm).unwrap();
    assert_eq!(vm.get_int(SlotIndex::from(-1)).unwrap(), 0);
}

#[test]
fn test_array_index_out_of_bounds() {
    let mut vm = Vm::new();
    let handle = vm.alloc_array(4, 2);

    push_index_call(&mut vm, handle, 5, 4);
    assert!(matches!(
        bl_array_index(&mut vm),
        Err(RuntimeError::IndexOutOfBounds { index: 5, len: 2 })
    ));
}

#[test]
fn test_array_index_element_size_mismatch() {
    let mut vm = Vm::new();
    let handle = vm.alloc_array(4, 2);

    push_index_call(&mut vm, handle, 0, 8);
    assert!(matches!(
        bl_array_index(&mut vm),
        Err(RuntimeError::SizeMismatch { expected: 4, found: 8 })
    ));
}

#[test]
fn test_array_init_reads_member_size_from_slot() {
    let mut vm = Vm::new();
    vm.push_bytes(8).unwrap(); // array handle slot
    vm.push_bytes(4).unwrap(); // element-size slot
    bl_array_init(&mut vm).unwrap();

    let handle = vm.get_pointer(SlotIndex::from(-2)).unwrap();
    assert_eq!(vm.array_member_size(handle).unwrap(), 4);
    assert_eq!(vm.array_len(handle).unwrap(), 0);
}

#[test]
fn test_array_copy_clones_contents() {
    let mut vm = Vm::new();
    let src = vm.alloc_array(4, 1);

    push_index_call(&mut vm, src, 0, 4);
    bl_array_index(&mut vm).unwrap();
    vm.store_int(SlotIndex::from(-1), 9).unwrap();
    for _ in 0..3 {
        vm.pop().unwrap();
    }

    vm.push_bytes(8).unwrap(); // destination handle slot
    vm.push_bytes(8).unwrap(); // source handle slot
    vm.store_pointer(SlotIndex::from(-1), src).unwrap();
    bl_array_copy(&mut vm).unwrap();

    let clone = vm.get_pointer(SlotIndex::from(-2)).unwrap();
    assert_ne!(clone, src);

    for _ in 0..2 {
        vm.pop().unwrap();
    }
    push_index_call(&mut vm, clone, 0, 4);
    bl_array_index(&mut vm).unwrap();
    assert_eq!(vm.get_int(SlotIndex::from(-1)).unwrap(), 9);
}

#[test]
fn test_array_destruct_invalidates_handle() {
    let mut vm = Vm::new();
    let handle = vm.alloc_array(4, 1);

    vm.push_bytes(8).unwrap();
    vm.store_pointer(SlotIndex::from(-1), handle).unwrap();
    bl_array_destruct(&mut vm).unwrap();

    assert!(matches!(
        vm.array_len(handle),
        Err(RuntimeError::InvalidArrayHandle(_))
    ));
}

#[test]
fn test_string_init_and_construct_from_literal() {
    let mut vm = Vm::new();

    vm.push_bytes(8).unwrap(); // string handle slot
    bl_string_init(&mut vm).unwrap();
    let handle = vm.get_pointer(SlotIndex::from(-1)).unwrap();
    assert_eq!(vm.string_bytes(handle).unwrap(), b"");

    // Literal slot on top, string slot below.
    vm.push_bytes(5).unwrap();
    vm.store(SlotIndex::from(-1), b"hello", false).unwrap();
    bl_string_construct_from_literal(&mut vm).unwrap();

    assert_eq!(vm.string_bytes(handle).unwrap(), b"hello");
}

#[test]
fn test_string_destruct_invalidates_handle() {
    let mut vm = Vm::new();

    vm.push_bytes(8).unwrap();
    bl_string_init(&mut vm).unwrap();
    let handle = vm.get_pointer(SlotIndex::from(-1)).unwrap();

    bl_string_destruct(&mut vm).unwrap();
    assert!(matches!(
        vm.string_bytes(handle),
        Err(RuntimeError::InvalidStringHandle(_))
    ));
}
