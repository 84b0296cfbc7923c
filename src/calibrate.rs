// SPDX-License-Identifier: AGPL-3.0-only

//! Calibrated measurement loop.
//!
//! A submission that retires too quickly is dominated by launch and timer
//! overhead, so every timed pair must run for at least
//! [`MIN_SUBMIT_DURATION`] microseconds before its result counts. When a
//! pair falls short, the workload grows: invocations double while the
//! device-feasible ceiling allows, then the inner loop count doubles
//! instead. Growth restarts the command loop with freshly specialised
//! pipelines, so every accepted sample was measured at the final shape.
//!
//! Buffers are allocated once at the invocation ceiling, which growth never
//! exceeds, so no reallocation happens mid-measurement.

use crate::device::ComputeDevice;
use crate::error::PeakError;
use crate::estimate::{ops_per_invocation, throughput_gops, MeasurementSample};
use crate::kernel::{KernelVariant, SpecConstants};
use crate::request::BenchmarkRequest;
use crate::workload::{buffer_bytes, WorkloadShape};

/// Minimum accepted submission duration, in microseconds.
pub const MIN_SUBMIT_DURATION: f64 = 800.0;

/// Verdict for one timed single/dual pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    /// Both submissions ran long enough; the sample counts.
    Accept,
    /// Too short; re-run at the grown shape.
    Grow { invocations: u64, loop_count: u32 },
}

/// Decide whether a timed pair is long enough to trust.
#[must_use]
pub fn next_step(t_single: f64, t_dual: f64, shape: &WorkloadShape) -> CalibrationStep {
    if t_single >= MIN_SUBMIT_DURATION && t_dual >= MIN_SUBMIT_DURATION {
        return CalibrationStep::Accept;
    }
    let doubled = shape.invocations * 2;
    if doubled <= shape.max_invocations {
        CalibrationStep::Grow {
            invocations: doubled,
            loop_count: shape.loop_count,
        }
    } else {
        CalibrationStep::Grow {
            invocations: shape.invocations,
            loop_count: shape.loop_count * 2,
        }
    }
}

/// Run the calibrated measurement loop and return the best observed GOPS.
///
/// # Errors
///
/// Propagates allocation, pipeline-build, and submission failures from the
/// device. The caller owns the allocator and its release.
pub fn calibrate<D: ComputeDevice>(
    device: &D,
    request: &BenchmarkRequest,
    single: &KernelVariant,
    dual: &KernelVariant,
    mut shape: WorkloadShape,
    allocator: &mut D::Allocator,
) -> Result<f64, PeakError> {
    let bytes = buffer_bytes(&shape, request, single);
    let buf_a = device.allocate_buffer(bytes, allocator)?;
    let buf_b = device.allocate_buffer(bytes, allocator)?;
    let buf_c = device.allocate_buffer(bytes, allocator)?;
    let buffers = [&buf_a, &buf_b, &buf_c];

    let subgroup = device.capabilities().subgroup_size;
    let mut best = 0.0f64;

    'grow: loop {
        let constants = SpecConstants {
            count: u32::try_from(shape.invocations).unwrap_or(u32::MAX),
            loop_count: shape.loop_count,
            tile: single.tile,
        };
        let pipe_single = device.build_pipeline(single, &constants, shape.local_size)?;
        let pipe_dual = device.build_pipeline(dual, &constants, shape.local_size)?;

        let ops_single =
            ops_per_invocation(single, shape.loop_count, subgroup) * shape.invocations as f64;
        let ops_dual =
            ops_per_invocation(dual, shape.loop_count, subgroup) * shape.invocations as f64;

        for _ in 0..request.cmd_loop {
            let t_single = timed_submit(device, &pipe_single, buffers, &shape)?;
            let t_dual = timed_submit(device, &pipe_dual, buffers, &shape)?;

            match next_step(t_single, t_dual, &shape) {
                CalibrationStep::Accept => {
                    let sample = MeasurementSample {
                        t_single,
                        t_dual,
                        gops_single: throughput_gops(ops_single, t_single),
                        gops_dual: throughput_gops(ops_dual, t_dual),
                    };
                    best = best.max(sample.best());
                }
                CalibrationStep::Grow {
                    invocations,
                    loop_count,
                } => {
                    shape.invocations = invocations;
                    shape.loop_count = loop_count;
                    continue 'grow;
                }
            }
        }
        return Ok(best);
    }
}

fn timed_submit<D: ComputeDevice>(
    device: &D,
    pipeline: &D::Pipeline,
    buffers: [&D::Buffer; 3],
    shape: &WorkloadShape,
) -> Result<f64, PeakError> {
    let t0 = device.now_micros();
    device.submit_dispatch(pipeline, buffers, shape.invocations, shape.local_size)?;
    device.wait()?;
    Ok(device.now_micros() - t0)
}
