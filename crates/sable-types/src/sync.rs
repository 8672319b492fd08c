//! Shared-state aliases used by every container value.
//!
//! parking_lot locks do not poison, so a script error raised while a map is
//! borrowed never leaves the map unusable for other VM instances.

pub use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
pub use std::sync::Arc;

/// Alias for the common pattern Arc<RwLock<T>>
pub type Shared<T> = Arc<RwLock<T>>;

/// Helper to create Shared<T> easily
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}
