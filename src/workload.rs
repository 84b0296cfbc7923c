// SPDX-License-Identifier: AGPL-3.0-only

//! Workload sizing — how much data and how many invocations to dispatch.
//!
//! The byte budget is bounded by device memory headroom (an eighth of the
//! heap, at most 512 MiB, 128 MiB on integrated devices) and the caller's
//! requested cap. From the budget and the storage element size we derive the
//! maximum feasible invocation count; calibration starts at a small fraction
//! of it and grows.
//!
//! Invariants maintained here and in the calibration loop:
//! - invocation count never exceeds `max_invocations`;
//! - invocation count is always a multiple of `local_size`.

use crate::capability::{DeviceCapabilities, DeviceClass};
use crate::kernel::{KernelVariant, PromotionPath};
use crate::request::{BenchmarkRequest, PackingType};

const MIB: u64 = 1024 * 1024;
/// Fraction of the device heap the benchmark may claim.
const HEAP_DIVISOR: u64 = 8;
/// Absolute byte-budget ceiling.
const MAX_BUDGET_BYTES: u64 = 512 * MIB;
/// Tighter ceiling for integrated devices sharing system memory.
const INTEGRATED_BUDGET_BYTES: u64 = 128 * MIB;
/// Calibration starts at `max_invocations / START_DIVISOR`.
const START_DIVISOR: u64 = 32;
/// Floor for the starting invocation count.
const START_FLOOR: u64 = 8;

/// Mutable workload state for one calibration run.
///
/// Only the calibration loop mutates `invocations` and `loop_count`, and
/// both are monotonically non-decreasing across iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadShape {
    /// Buffer element count (one packed element per invocation at maximum).
    pub element_count: u64,
    /// Current invocation count. Always a multiple of `local_size` and
    /// never above `max_invocations`.
    pub invocations: u64,
    /// Current inner-loop repetition count.
    pub loop_count: u32,
    /// Device-feasible invocation ceiling.
    pub max_invocations: u64,
    /// Workgroup width the kernel was built for.
    pub local_size: u32,
}

/// Compute the workload shape for a resolved kernel on this device.
#[must_use]
pub fn size(
    request: &BenchmarkRequest,
    kernel: &KernelVariant,
    caps: &DeviceCapabilities,
) -> WorkloadShape {
    let mut budget = (caps.heap_budget_bytes / HEAP_DIVISOR).min(MAX_BUDGET_BYTES);
    if caps.device_class == DeviceClass::Integrated {
        budget = budget.min(INTEGRATED_BUDGET_BYTES);
    }
    budget = budget.min(request.count_mb * MIB);

    let element_bytes = request.storage.element_bytes();
    let subgroup = caps.subgroup_size.max(1);
    let local_size = if kernel.key.packing == PackingType::Matrix {
        // Cooperative-matrix ops execute over exactly one subgroup.
        subgroup
    } else {
        subgroup.min(128)
    };

    let mut max_invocations = budget / element_bytes;
    if let Some(tile) = kernel.tile {
        max_invocations /= u64::from(tile.m) * u64::from(tile.n);
        if kernel.promotion == Some(PromotionPath::Widened) {
            // The wider accumulator takes two packed output slots per element.
            max_invocations /= 2;
        }
    }
    // Round down to a whole number of workgroups, keeping at least one.
    let local = u64::from(local_size);
    max_invocations = (max_invocations / local).max(1) * local;

    let start = (max_invocations / START_DIVISOR).max(START_FLOOR);
    // Align the start up to a workgroup multiple so growth stays aligned.
    let invocations = (start.div_ceil(local) * local).min(max_invocations);

    WorkloadShape {
        element_count: max_invocations,
        invocations,
        loop_count: request.loop_count,
        max_invocations,
        local_size,
    }
}

/// Device buffer size in bytes for one of the three bindings, sized for the
/// maximum invocation count.
#[must_use]
pub fn buffer_bytes(shape: &WorkloadShape, request: &BenchmarkRequest, kernel: &KernelVariant) -> u64 {
    let element_bytes = request.storage.element_bytes();
    let per_invocation = match kernel.tile {
        Some(tile) => {
            let tile_elems = u64::from(tile.m) * u64::from(tile.n);
            let promotion = if kernel.promotion == Some(PromotionPath::Widened) {
                2
            } else {
                1
            };
            tile_elems * element_bytes * promotion
        }
        None => {
            let width = kernel.key.packing.width().unwrap_or(1);
            u64::from(width) * element_bytes
        }
    };
    shape.max_invocations * per_invocation
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::capability::{CoopMatFamily, CoopMatShape};
    use crate::kernel::{AccumulatorArity, KernelKey, KernelVariant};
    use crate::request::{ArithmeticType, StorageType};

    fn fp32_vec4_request() -> BenchmarkRequest {
        BenchmarkRequest::new(StorageType::Fp32, ArithmeticType::Fp32, PackingType::Vec4)
    }

    fn vector_kernel(request: &BenchmarkRequest) -> KernelVariant {
        KernelVariant::vector(KernelKey {
            storage: request.storage,
            arithmetic: request.arithmetic,
            packing: request.packing,
            arity: AccumulatorArity::Single,
        })
    }

    #[test]
    fn budget_is_heap_eighth_capped_by_request() {
        let request = BenchmarkRequest {
            count_mb: 16,
            ..fp32_vec4_request()
        };
        let caps = DeviceCapabilities::default(); // 1 GiB heap
        let kernel = vector_kernel(&request);
        let shape = size(&request, &kernel, &caps);
        // 16 MiB cap wins over 128 MiB heap-eighth: 16 MiB / 4 B = 4M.
        assert_eq!(shape.max_invocations, 4 * 1024 * 1024);
    }

    #[test]
    fn integrated_devices_capped_at_128_mib() {
        let request = BenchmarkRequest {
            count_mb: 4096,
            ..fp32_vec4_request()
        };
        let caps = DeviceCapabilities {
            heap_budget_bytes: 64 * 1024 * 1024 * 1024,
            device_class: DeviceClass::Integrated,
            ..DeviceCapabilities::default()
        };
        let kernel = vector_kernel(&request);
        let shape = size(&request, &kernel, &caps);
        assert_eq!(shape.max_invocations, 128 * 1024 * 1024 / 4);
    }

    #[test]
    fn local_size_clamped_to_128_for_vector_kernels() {
        let request = fp32_vec4_request();
        let caps = DeviceCapabilities {
            subgroup_size: 256,
            ..DeviceCapabilities::default()
        };
        let shape = size(&request, &vector_kernel(&request), &caps);
        assert_eq!(shape.local_size, 128);

        let caps_small = DeviceCapabilities {
            subgroup_size: 64,
            ..DeviceCapabilities::default()
        };
        let shape = size(&request, &vector_kernel(&request), &caps_small);
        assert_eq!(shape.local_size, 64);
    }

    #[test]
    fn matrix_kernels_use_subgroup_size_directly() {
        let request = BenchmarkRequest::new(
            StorageType::Fp16,
            ArithmeticType::Fp16,
            PackingType::Matrix,
        );
        let caps = DeviceCapabilities {
            subgroup_size: 256,
            fp16_storage: true,
            fp16_arithmetic: true,
            ..DeviceCapabilities::default()
        };
        let kernel = KernelVariant::matrix(
            KernelKey {
                storage: request.storage,
                arithmetic: request.arithmetic,
                packing: request.packing,
                arity: AccumulatorArity::Single,
            },
            CoopMatShape::new(16, 16, 16),
            crate::kernel::PromotionPath::SameType,
            CoopMatFamily::Khr,
        );
        let shape = size(&request, &kernel, &caps);
        assert_eq!(shape.local_size, 256);
    }

    #[test]
    fn widened_matrix_halves_max_invocations() {
        let request = BenchmarkRequest::new(
            StorageType::Fp16,
            ArithmeticType::Fp16,
            PackingType::Matrix,
        );
        let caps = DeviceCapabilities {
            fp16_storage: true,
            fp16_arithmetic: true,
            ..DeviceCapabilities::default()
        };
        let key = KernelKey {
            storage: request.storage,
            arithmetic: request.arithmetic,
            packing: request.packing,
            arity: AccumulatorArity::Single,
        };
        let shape_tile = CoopMatShape::new(16, 16, 16);
        let same = KernelVariant::matrix(
            key,
            shape_tile,
            crate::kernel::PromotionPath::SameType,
            CoopMatFamily::Khr,
        );
        let widened = KernelVariant::matrix(
            key,
            shape_tile,
            crate::kernel::PromotionPath::Widened,
            CoopMatFamily::Khr,
        );
        let shape_same = size(&request, &same, &caps);
        let shape_wide = size(&request, &widened, &caps);
        // Halved before workgroup rounding, so compare against the raw ratio.
        assert!(shape_wide.max_invocations <= shape_same.max_invocations / 2 + 32);
        assert!(shape_wide.max_invocations >= shape_same.max_invocations / 2 - 32);
    }

    #[test]
    fn invocations_start_small_and_aligned() {
        let request = fp32_vec4_request();
        let caps = DeviceCapabilities::default();
        let shape = size(&request, &vector_kernel(&request), &caps);
        assert!(shape.invocations >= 8);
        assert!(shape.invocations <= shape.max_invocations);
        assert_eq!(shape.invocations % u64::from(shape.local_size), 0);
        assert_eq!(shape.max_invocations % u64::from(shape.local_size), 0);
        // Start near a 32nd of capacity.
        assert!(shape.invocations <= shape.max_invocations / 16);
    }

    #[test]
    fn tiny_budget_still_yields_one_workgroup() {
        let request = BenchmarkRequest {
            count_mb: 1,
            ..fp32_vec4_request()
        };
        let caps = DeviceCapabilities {
            heap_budget_bytes: 256,
            ..DeviceCapabilities::default()
        };
        // 256 B heap / 8 = 32 B budget = 8 fp32 elements, under one workgroup.
        let shape = size(&request, &vector_kernel(&request), &caps);
        assert_eq!(shape.max_invocations, u64::from(shape.local_size));
        assert_eq!(shape.invocations, shape.max_invocations);
    }

    #[test]
    fn buffer_bytes_scale_with_packing_width() {
        let request = fp32_vec4_request();
        let caps = DeviceCapabilities::default();
        let kernel = vector_kernel(&request);
        let shape = size(&request, &kernel, &caps);
        assert_eq!(
            buffer_bytes(&shape, &request, &kernel),
            shape.max_invocations * 4 * 4
        );
    }
}
