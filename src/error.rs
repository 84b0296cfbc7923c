// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for benchmark resolution and device submission.
//!
//! Replaces `Result<_, String>` in public APIs with a proper enum so callers
//! can pattern-match on failure modes (device absent, capability gate,
//! pipeline build, submission) rather than parsing opaque strings. None of
//! these escape [`crate::run_benchmark`] — every fatal condition collapses to
//! the sentinel throughput value at the boundary.

use std::fmt;

/// Errors arising from kernel selection, workload setup, or device commands.
#[derive(Debug)]
pub enum PeakError {
    /// No compute device is available. Distinct from a capability being
    /// false: nothing can be measured at all.
    DeviceAbsent,

    /// The requested (storage, arithmetic, packing) triple failed a
    /// capability gate on this device. The caller may retry with a
    /// different configuration.
    Unsupported(String),

    /// Compilation or specialization of a selected kernel failed. Fatal for
    /// the request; never retried.
    KernelBuild(String),

    /// A dispatch or wait failed at the device level. Fatal for the request;
    /// transient device errors are not masked.
    Submission(String),

    /// Buffer allocation failed or exceeded the arena budget.
    Allocation(String),
}

impl fmt::Display for PeakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceAbsent => write!(f, "No compute device found"),
            Self::Unsupported(msg) => write!(f, "Configuration unsupported: {msg}"),
            Self::KernelBuild(msg) => write!(f, "Kernel build failed: {msg}"),
            Self::Submission(msg) => write!(f, "Device submission failed: {msg}"),
            Self::Allocation(msg) => write!(f, "Buffer allocation failed: {msg}"),
        }
    }
}

impl std::error::Error for PeakError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_device_absent() {
        let err = PeakError::DeviceAbsent;
        assert_eq!(err.to_string(), "No compute device found");
    }

    #[test]
    fn display_unsupported_carries_reason() {
        let err = PeakError::Unsupported("fp64 shader feature absent".into());
        assert!(err.to_string().contains("fp64 shader feature absent"));
    }

    #[test]
    fn display_submission() {
        let err = PeakError::Submission("queue wait failed".into());
        assert!(err.to_string().contains("queue wait failed"));
    }

    #[test]
    fn error_trait_works() {
        let err = PeakError::KernelBuild("bad spirv".into());
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.to_string().contains("bad spirv"));
    }
}
