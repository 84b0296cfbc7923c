// SPDX-License-Identifier: AGPL-3.0-only

//! The compute-device seam.
//!
//! Everything above this trait — selection, sizing, calibration, estimation —
//! is pure logic over the trait's surface. The wgpu substrate in [`crate::gpu`]
//! is the production implementation; tests drive the same logic through a
//! deterministic in-memory mock with a synthetic clock.

use crate::capability::DeviceCapabilities;
use crate::error::PeakError;
use crate::kernel::{KernelVariant, SpecConstants};

/// A device that can compile compute kernels and time their dispatches.
pub trait ComputeDevice {
    /// Scoped allocation context; released exactly once per measurement.
    type Allocator;
    type Buffer;
    type Pipeline;

    fn capabilities(&self) -> DeviceCapabilities;

    fn acquire_allocator(&self) -> Self::Allocator;

    fn release_allocator(&self, allocator: Self::Allocator);

    /// Allocate a storage buffer of `bytes` from the given allocator.
    ///
    /// # Errors
    ///
    /// Returns [`PeakError::Allocation`] when the device cannot satisfy the
    /// request.
    fn allocate_buffer(
        &self,
        bytes: u64,
        allocator: &mut Self::Allocator,
    ) -> Result<Self::Buffer, PeakError>;

    /// Compile `kernel` with the given specialisation constants.
    ///
    /// # Errors
    ///
    /// Returns [`PeakError::KernelBuild`] when the source cannot be compiled
    /// for this device.
    fn build_pipeline(
        &self,
        kernel: &KernelVariant,
        constants: &SpecConstants,
        local_size: u32,
    ) -> Result<Self::Pipeline, PeakError>;

    /// Record and submit one dispatch covering `invocations` threads.
    ///
    /// # Errors
    ///
    /// Returns [`PeakError::Submission`] when the queue rejects the work.
    fn submit_dispatch(
        &self,
        pipeline: &Self::Pipeline,
        buffers: [&Self::Buffer; 3],
        invocations: u64,
        local_size: u32,
    ) -> Result<(), PeakError>;

    /// Block until all submitted work has retired.
    ///
    /// # Errors
    ///
    /// Returns [`PeakError::Submission`] when the device is lost mid-wait.
    fn wait(&self) -> Result<(), PeakError>;

    /// Monotonic timestamp in microseconds.
    fn now_micros(&self) -> f64;
}
