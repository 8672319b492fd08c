//! Call frames and try regions

use super::finalizer::Finalizer;
use crate::bytecode::Address;
use crate::error::VmError;
use sable_types::sync::{shared, Arc, Shared};
use sable_types::{ClosureCell, Value};

/// Activation record of a function.
pub(crate) struct Frame {
    /// Index of the running function.
    pub func: usize,
    pub pc: usize,
    /// Where the value of the call this frame is making lands.
    pub ret_address: Address,
    /// Registers. Shared because closures created here keep cells into
    /// them after the frame returns.
    pub values: Shared<Vec<Value>>,
    /// Cells of the closure being run.
    pub closures: Arc<[ClosureCell]>,
    pub finalizers: Vec<Box<dyn Finalizer>>,
    /// Returning from this frame leaves the run loop.
    pub exit: bool,
}

impl Frame {
    pub fn new(func: usize, values: Shared<Vec<Value>>, closures: Arc<[ClosureCell]>) -> Self {
        Self {
            func,
            pc: 0,
            ret_address: Address::VOID,
            values,
            closures,
            finalizers: Vec::new(),
            exit: false,
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Result<Value, VmError> {
        self.values
            .read()
            .get(index)
            .cloned()
            .ok_or_else(|| VmError::new(format!("Invalid register: {}", index)))
    }

    #[inline]
    pub fn set(&self, index: usize, value: Value) -> Result<(), VmError> {
        let mut values = self.values.write();
        match values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(VmError::new(format!("Invalid register: {}", index))),
        }
    }

    /// True when no closure holds on to the registers.
    pub fn is_captured(&self) -> bool {
        Arc::strong_count(&self.values) > 1
    }
}

/// Register arrays of returned frames, kept for the next calls.
#[derive(Default)]
pub(crate) struct FrameCache {
    free: Vec<Vec<Value>>,
}

/// Frames beyond this many are dropped instead of cached.
const MAX_CACHED_FRAMES: usize = 64;

impl FrameCache {
    /// A cleared register array of `size` slots.
    pub fn take(&mut self, size: usize) -> Shared<Vec<Value>> {
        let mut values = self.free.pop().unwrap_or_default();
        values.resize(size, Value::Null);
        shared(values)
    }

    pub fn recycle(&mut self, frame: Frame) {
        if frame.is_captured() || self.free.len() >= MAX_CACHED_FRAMES {
            return;
        }
        if let Ok(lock) = Arc::try_unwrap(frame.values) {
            let mut values = lock.into_inner();
            values.clear();
            self.free.push(values);
        }
    }
}

/// An active `try` region.
#[derive(Debug, Clone)]
pub(crate) struct TryCatch {
    pub catch_pc: Option<usize>,
    /// Register that receives the error in the catch block.
    pub error_reg: Address,
    pub finally_pc: Option<usize>,
    /// Where a `return`, `break` or `continue` resumes once the finally
    /// block ends.
    pub ret_pc: Option<usize>,
    /// Frame that declared the region.
    pub fp: usize,
    pub catch_executed: bool,
    pub finally_executed: bool,
    /// Error still pending when the finally block ends.
    pub err: Option<VmError>,
}

impl TryCatch {
    pub fn new(catch_pc: Option<usize>, error_reg: Address, finally_pc: Option<usize>, fp: usize) -> Self {
        Self {
            catch_pc,
            error_reg,
            finally_pc,
            ret_pc: None,
            fp,
            catch_executed: false,
            finally_executed: false,
            err: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_registers() {
        let frame = Frame::new(0, shared(vec![Value::Null; 2]), Arc::from(Vec::new()));
        frame.set(1, Value::Int(7)).unwrap();
        assert_eq!(frame.get(1).unwrap(), Value::Int(7));
        assert!(frame.get(2).is_err());
        assert!(frame.set(5, Value::Null).is_err());
    }

    #[test]
    fn test_captured_frames_are_not_recycled() {
        let mut cache = FrameCache::default();

        let frame = Frame::new(0, cache.take(3), Arc::from(Vec::new()));
        let cell = ClosureCell::new(frame.values.clone(), 0);
        cache.recycle(frame);
        assert!(cache.free.is_empty());
        drop(cell);

        let frame = Frame::new(0, cache.take(3), Arc::from(Vec::new()));
        frame.set(0, Value::Int(1)).unwrap();
        cache.recycle(frame);
        assert_eq!(cache.free.len(), 1);

        let values = cache.take(2);
        assert_eq!(*values.read(), vec![Value::Null, Value::Null]);
    }
}
