//! Resource limits

use serde::{Deserialize, Serialize};

/// Ceilings enforced while a script runs. Zero disables a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Instructions executed.
    pub max_steps: u64,
    /// Allocation units written to registers and containers.
    pub max_allocations: u64,
    /// Nested call frames.
    pub max_frames: usize,
}

impl VmConfig {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn with_max_allocations(mut self, allocations: u64) -> Self {
        self.max_allocations = allocations;
        self
    }

    pub fn with_max_frames(mut self, frames: usize) -> Self {
        self.max_frames = frames;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let c: VmConfig = serde_json::from_str(r#"{"max_steps": 100}"#).unwrap();
        assert_eq!(c, VmConfig::default().with_max_steps(100));
        assert_eq!(c.max_frames, 0);
    }
}
