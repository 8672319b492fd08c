//! Built-in functions module
//!
//! The prelude every program is compiled against unless the host supplies
//! its own registry:
//! - I/O: print, println
//! - String prototype: trim, toUpper, toLower, split
//! - Array prototype: push, pop, join, indexOf
//! - Math: max, min
//! - JSON: stringify
//! - errors: newError, is
//! - runtime: steps (native property)

pub mod array;
pub mod encoding;
pub mod errors;
pub mod io;
pub mod math;
pub mod registry;
pub mod runtime;
pub mod string;

pub use registry::{NativeFn, NativeFunction, NativeRegistry};

/// Create and populate the native function registry
pub fn create_native_registry() -> NativeRegistry {
    let mut registry = NativeRegistry::new();

    // I/O
    registry.add(NativeFunction::new("print", -1, io::vm_print));
    registry.add(NativeFunction::new("println", -1, io::vm_println));

    // Strings
    registry.add(NativeFunction::new("String.prototype.trim", 0, string::vm_trim));
    registry.add(NativeFunction::new("String.prototype.toUpper", 0, string::vm_to_upper));
    registry.add(NativeFunction::new("String.prototype.toLower", 0, string::vm_to_lower));
    registry.add(NativeFunction::new("String.prototype.split", 1, string::vm_split));

    // Arrays
    registry.add(NativeFunction::new("Array.prototype.push", -1, array::vm_push));
    registry.add(NativeFunction::new("Array.prototype.pop", 0, array::vm_pop));
    registry.add(NativeFunction::new("Array.prototype.join", -1, array::vm_join));
    registry.add(NativeFunction::new("Array.prototype.indexOf", 1, array::vm_index_of));

    // Math
    registry.add(NativeFunction::new("Math.max", -1, math::vm_max));
    registry.add(NativeFunction::new("Math.min", -1, math::vm_min));

    // Encoding
    registry.add(NativeFunction::new("JSON.stringify", 1, encoding::vm_json_stringify));

    // Errors
    registry.add(NativeFunction::new("errors.newError", -1, errors::vm_new_error));
    registry.add(NativeFunction::new("errors.is", 2, errors::vm_is));

    // Runtime
    registry.add(NativeFunction::new("->runtime.steps", 0, runtime::vm_steps));

    registry
}
