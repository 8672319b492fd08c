//! Runtime value model for the Sable scripting language.
//!
//! Values are cheap to clone: scalars are copied, strings and bytes are
//! reference counted, and arrays, maps and instances are shared behind a
//! reader/writer lock so the same container can be reached from several VM
//! instances running on different threads.

pub mod error;
pub mod object;
pub mod sync;
pub mod value;

// Re-exports
pub use error::{ScriptError, TraceLine};
pub use object::{Closure, ClosureCell, HostObject, Instance, Object};
pub use value::{Value, ValueType, MAX_EXPORT_RECURSION};
