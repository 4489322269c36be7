//! Copy and destroy emission for managed values.

use shadel_types::{Lifecycle, TypeSpec};

use crate::backend::{Backend, ValueId};

/// Emit the destruction of the value stored at `address`.
///
/// Returns the number of destructor calls emitted.
pub fn emit_destroy(backend: &mut dyn Backend, ty: &TypeSpec, address: ValueId) -> usize {
    match ty.lifecycle() {
        Lifecycle::Trivial => 0,
        Lifecycle::Managed { destroy, .. } => {
            let value = backend.load(ty, address);
            backend.call(destroy, &[value]);
            1
        }
        Lifecycle::ElementWise => {
            let (Some(element), Some(length)) = (ty.element(), ty.array_length()) else {
                return 0;
            };
            let mut emitted = 0;
            for i in 0..length {
                let index = backend.const_int(i64::from(i));
                let slot = backend.element_ptr(address, index);
                emitted += emit_destroy(backend, element, slot);
            }
            emitted
        }
    }
}

/// Emit the destruction of a temporary that lives in no variable.
pub fn emit_destroy_value(backend: &mut dyn Backend, ty: &TypeSpec, value: ValueId) -> usize {
    match ty.lifecycle() {
        Lifecycle::Trivial => 0,
        Lifecycle::Managed { destroy, .. } => {
            backend.call(destroy, &[value]);
            1
        }
        Lifecycle::ElementWise => {
            let slot = backend.alloca(ty, "tmp");
            backend.store(value, slot);
            emit_destroy(backend, ty, slot)
        }
    }
}

/// Emit an owned copy of `value`.
pub fn emit_copy(backend: &mut dyn Backend, ty: &TypeSpec, value: ValueId) -> ValueId {
    match ty.lifecycle() {
        Lifecycle::Trivial => value,
        Lifecycle::Managed { copy, .. } => backend.call(copy, &[value]),
        Lifecycle::ElementWise => {
            let (Some(element), Some(length)) = (ty.element(), ty.array_length()) else {
                return value;
            };
            let slot = backend.alloca(ty, "copy");
            backend.store(value, slot);
            for i in 0..length {
                let index = backend.const_int(i64::from(i));
                let item = backend.element_ptr(slot, index);
                let old = backend.load(element, item);
                let fresh = emit_copy(backend, element, old);
                backend.store(fresh, item);
            }
            backend.load(ty, slot)
        }
    }
}
