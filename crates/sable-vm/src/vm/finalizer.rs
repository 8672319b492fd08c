//! Resources released when a frame ends

use sable_types::sync::Arc;
use sable_types::{HostObject, ScriptError};

/// Something to close when the frame that registered it exits, normally
/// or by an error. Global finalizers run when the whole run ends.
pub trait Finalizer: Send {
    fn close(&mut self) -> Result<(), ScriptError>;
}

/// Host objects close through their own hook.
impl Finalizer for Arc<dyn HostObject> {
    fn close(&mut self) -> Result<(), ScriptError> {
        HostObject::close(self.as_ref())
    }
}
