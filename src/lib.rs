// SPDX-License-Identifier: AGPL-3.0-only

//! peakforge — adaptive peak-throughput micro-benchmark for GPU compute.
//!
//! Measures achievable arithmetic throughput (GFLOPS / GIOPS) per data
//! type and packing width by running dependent FMA chains until each timed
//! submission is long enough to trust, growing the workload as needed.
//!
//! ## Pipeline
//!
//! ```text
//! request ─→ resolve (capability gates, tile search)
//!         ─→ size    (heap-budgeted workload shape)
//!         ─→ calibrate (timed submits, growth until ≥ 800 µs)
//!         ─→ best GOPS, or 0.0 when unsupported
//! ```
//!
//! ## Modules
//!   - `request` — benchmark configuration (storage × arithmetic × packing)
//!   - `capability` — runtime device capability model
//!   - `select` — capability gating and kernel-variant resolution
//!   - `kernel` — WGSL/GLSL kernel source generation
//!   - `workload` — buffer budgets and invocation sizing
//!   - `calibrate` — minimum-duration measurement loop
//!   - `estimate` — op accounting and the GOPS conversion
//!   - `device` — the compute-device trait seam
//!   - `gpu` — wgpu production substrate
//!   - `report` — summary tables and JSON output

#![deny(clippy::expect_used, clippy::unwrap_used)]

pub mod calibrate;
pub mod capability;
pub mod device;
pub mod error;
pub mod estimate;
pub mod gpu;
pub mod kernel;
pub mod report;
pub mod request;
pub mod select;
pub mod workload;

pub use capability::DeviceCapabilities;
pub use device::ComputeDevice;
pub use error::PeakError;
pub use request::{ArithmeticType, BenchmarkRequest, PackingType, StorageType};

/// Measure peak throughput for one configuration on `device`.
///
/// Returns the best observed GFLOPS/GIOPS, or 0.0 when the configuration is
/// unsupported or the measurement fails. The allocator acquired for the
/// measurement is released exactly once on every path.
pub fn measure_peak<D: ComputeDevice>(device: &D, request: &BenchmarkRequest) -> f64 {
    let caps = device.capabilities();
    let Ok((single, dual)) = select::resolve(request, &caps) else {
        return 0.0;
    };
    let shape = workload::size(request, &single, &caps);

    let mut allocator = device.acquire_allocator();
    let outcome = calibrate::calibrate(device, request, &single, &dual, shape, &mut allocator);
    device.release_allocator(allocator);

    match outcome {
        Ok(gops) => gops.max(0.0),
        Err(_) => 0.0,
    }
}

/// Measure against an optional device; `None` yields the unsupported
/// sentinel for every configuration.
pub fn run_benchmark<D: ComputeDevice>(device: Option<&D>, request: &BenchmarkRequest) -> f64 {
    device.map_or(0.0, |d| measure_peak(d, request))
}
