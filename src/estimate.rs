// SPDX-License-Identifier: AGPL-3.0-only

//! Throughput estimation — per-invocation op counts and the GOPS formula.
//!
//! Every vector kernel body is `loop_count` iterations of a 16-step FMA
//! chain, and each FMA is two operations (multiply + add). The dual-arity
//! twin adds one combining addition when the two accumulators are merged at
//! store time. Packing multiplies the per-step work: a vec4 FMA is four
//! lane FMAs, a vec8 is eight. A cooperative-matrix multiply-accumulate is
//! M × N × K FMAs shared across a subgroup, so each invocation is credited
//! with its per-lane share.

use crate::kernel::{AccumulatorArity, KernelVariant, UNROLL};
use crate::request::PackingType;

/// One timed single/dual measurement pair at a given workload shape.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementSample {
    /// Elapsed microseconds for the single-accumulator submission.
    pub t_single: f64,
    /// Elapsed microseconds for the dual-accumulator submission.
    pub t_dual: f64,
    pub gops_single: f64,
    pub gops_dual: f64,
}

impl MeasurementSample {
    /// The better of the two arity results.
    #[must_use]
    pub fn best(&self) -> f64 {
        self.gops_single.max(self.gops_dual)
    }
}

/// Arithmetic operations executed by one invocation of `kernel`.
#[must_use]
pub fn ops_per_invocation(kernel: &KernelVariant, loop_count: u32, subgroup_size: u32) -> f64 {
    let chain = f64::from(loop_count) * f64::from(UNROLL) * 2.0;
    let base = match kernel.key.arity {
        AccumulatorArity::Single => chain,
        // One extra add merges the two accumulators at store time.
        AccumulatorArity::Dual => chain + 1.0,
    };
    let lanes = match kernel.key.packing {
        PackingType::Matrix => kernel.tile.map_or(0.0, |tile| {
            let macs = f64::from(tile.m) * f64::from(tile.n) * f64::from(tile.k);
            macs / f64::from(subgroup_size.max(1))
        }),
        packed => packed.width().map_or(1.0, f64::from),
    };
    base * lanes
}

/// Convert a total op count and elapsed time into giga-operations/second.
///
/// Non-positive elapsed time yields 0.0 rather than a division artifact.
#[must_use]
pub fn throughput_gops(total_ops: f64, elapsed: f64) -> f64 {
    if elapsed > 0.0 {
        total_ops / elapsed / 1.0e6
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::capability::{CoopMatFamily, CoopMatShape};
    use crate::kernel::{KernelKey, PromotionPath};
    use crate::request::{ArithmeticType, StorageType};

    fn vector(packing: PackingType, arity: AccumulatorArity) -> KernelVariant {
        KernelVariant::vector(KernelKey {
            storage: StorageType::Fp32,
            arithmetic: ArithmeticType::Fp32,
            packing,
            arity,
        })
    }

    #[test]
    fn scalar_single_is_loop_times_unroll_times_two() {
        let kernel = vector(PackingType::Scalar, AccumulatorArity::Single);
        let ops = ops_per_invocation(&kernel, 16, 32);
        assert!((ops - 512.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dual_adds_one_combining_op() {
        let single = vector(PackingType::Scalar, AccumulatorArity::Single);
        let dual = vector(PackingType::Scalar, AccumulatorArity::Dual);
        let delta = ops_per_invocation(&dual, 16, 32) - ops_per_invocation(&single, 16, 32);
        assert!((delta - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn packing_width_scales_ops() {
        let v4 = vector(PackingType::Vec4, AccumulatorArity::Single);
        let v8 = vector(PackingType::Vec8, AccumulatorArity::Single);
        assert!((ops_per_invocation(&v4, 16, 32) - 2048.0).abs() < f64::EPSILON);
        assert!((ops_per_invocation(&v8, 16, 32) - 4096.0).abs() < f64::EPSILON);
    }

    #[test]
    fn matrix_credits_per_lane_share_of_tile() {
        let kernel = KernelVariant::matrix(
            KernelKey {
                storage: StorageType::Fp16,
                arithmetic: ArithmeticType::Fp16,
                packing: PackingType::Matrix,
                arity: AccumulatorArity::Single,
            },
            CoopMatShape::new(16, 16, 16),
            PromotionPath::SameType,
            CoopMatFamily::Khr,
        );
        // 16·16·16 = 4096 MACs / 32 lanes = 128 per invocation per step.
        let ops = ops_per_invocation(&kernel, 16, 32);
        assert!((ops - 512.0 * 128.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gops_formula_and_zero_elapsed_guard() {
        let gops = throughput_gops(2.0e9, 1000.0);
        assert!((gops - 2000.0).abs() < 1e-9);
        assert!(throughput_gops(1.0e9, 0.0).abs() < f64::EPSILON);
        assert!(throughput_gops(1.0e9, -5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn best_picks_the_larger_arity_result() {
        let sample = MeasurementSample {
            t_single: 900.0,
            t_dual: 850.0,
            gops_single: 11.0,
            gops_dual: 14.5,
        };
        assert!((sample.best() - 14.5).abs() < f64::EPSILON);
    }
}
