//! Built-in native functions installed into every context.

mod array;
mod string;

#[cfg(test)]
mod stdlib_test;

pub use array::{bl_array_copy, bl_array_destruct, bl_array_index, bl_array_init};
pub use string::{
    bl_string_construct_from_literal, bl_string_copy, bl_string_destruct, bl_string_init,
};

use crate::vm::Vm;

/// Register the array and string builtins under their reserved names.
pub fn install(vm: &mut Vm) {
    vm.add_extern("bl__array__init__", bl_array_init);
    vm.add_extern("bl__array__copy__", bl_array_copy);
    vm.add_extern("bl__array__destruct__", bl_array_destruct);
    vm.add_extern("bl__array__index__", bl_array_index);

    vm.add_extern("bl__string__init__", bl_string_init);
    vm.add_extern("bl__string__copy__", bl_string_copy);
    vm.add_extern("bl__string__destruct__", bl_string_destruct);
    vm.add_extern(
        "bl__string__construct_from_literal__",
        bl_string_construct_from_literal,
    );
}
