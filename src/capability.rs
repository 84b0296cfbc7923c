// SPDX-License-Identifier: AGPL-3.0-only

//! Device capability snapshot — what the hardware offers, queried once.
//!
//! Capabilities are what matters for kernel selection: code asks "can you do
//! fp16 arithmetic?" not "are you an RTX 4070?". The snapshot is immutable
//! for the duration of one benchmark invocation; the wgpu substrate fills it
//! from adapter features and limits, the test double fills it by hand.

use serde::Serialize;

use crate::request::ArithmeticType;

/// Discrete vs integrated, for memory-budget capping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceClass {
    Discrete,
    Integrated,
}

/// Which cooperative-matrix extension family the device exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoopMatFamily {
    /// `VK_KHR_cooperative_matrix` and friends.
    Khr,
    /// The older `VK_NV_cooperative_matrix` family.
    Nv,
}

/// Hardware-native tile shape for one cooperative matrix multiply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoopMatShape {
    pub m: u32,
    pub n: u32,
    pub k: u32,
}

impl CoopMatShape {
    #[must_use]
    pub const fn new(m: u32, n: u32, k: u32) -> Self {
        Self { m, n, k }
    }
}

/// One supported cooperative-matrix type combination, as reported by the
/// device: `input × input → accumulate` at a fixed tile shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoopMatCombo {
    pub input: ArithmeticType,
    pub accumulate: ArithmeticType,
    pub shape: CoopMatShape,
}

/// Immutable snapshot of device feature flags, class, and memory budget.
///
/// Queried once per benchmark invocation and never mutated. Fields mirror
/// the Vulkan-level feature bits the kernel catalog cares about; a substrate
/// that cannot express a feature reports it as `false` and the selector
/// yields the sentinel for requests that need it.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceCapabilities {
    pub fp16_storage: bool,
    pub fp16_arithmetic: bool,
    pub fp64_shader: bool,
    pub int8_arithmetic: bool,
    pub int8_dot_product: bool,
    pub bf16_arithmetic: bool,
    pub bf16_dot_product: bool,
    pub bf16_cooperative_matrix: bool,
    /// Which cooperative-matrix extension family is present, if any.
    pub cooperative_matrix: Option<CoopMatFamily>,
    /// Supported cooperative-matrix type combinations, in device order.
    pub coop_mat_combos: Vec<CoopMatCombo>,
    /// Hardware subgroup width. Never zero.
    pub subgroup_size: u32,
    pub device_class: DeviceClass,
    /// Device-local heap budget in bytes (or the closest queryable proxy).
    pub heap_budget_bytes: u64,
}

impl Default for DeviceCapabilities {
    /// A plain fp32-only discrete device: no optional features, subgroup 32,
    /// 1 GiB heap. Matches what a minimal Vulkan implementation reports.
    fn default() -> Self {
        Self {
            fp16_storage: false,
            fp16_arithmetic: false,
            fp64_shader: false,
            int8_arithmetic: false,
            int8_dot_product: false,
            bf16_arithmetic: false,
            bf16_dot_product: false,
            bf16_cooperative_matrix: false,
            cooperative_matrix: None,
            coop_mat_combos: Vec::new(),
            subgroup_size: 32,
            device_class: DeviceClass::Discrete,
            heap_budget_bytes: 1024 * 1024 * 1024,
        }
    }
}

impl DeviceCapabilities {
    /// Short human-readable feature summary for the report header.
    #[must_use]
    pub fn feature_summary(&self) -> String {
        let mut tags = vec!["fp32"];
        if self.fp16_arithmetic {
            tags.push("fp16");
        }
        if self.fp64_shader {
            tags.push("fp64");
        }
        if self.int8_dot_product {
            tags.push("int8-dot");
        }
        if self.bf16_arithmetic {
            tags.push("bf16");
        }
        if self.cooperative_matrix.is_some() {
            tags.push("coopmat");
        }
        tags.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_bare_fp32_device() {
        let caps = DeviceCapabilities::default();
        assert!(!caps.fp16_arithmetic);
        assert!(!caps.fp64_shader);
        assert!(caps.cooperative_matrix.is_none());
        assert!(caps.coop_mat_combos.is_empty());
        assert_eq!(caps.subgroup_size, 32);
        assert_eq!(caps.device_class, DeviceClass::Discrete);
    }

    #[test]
    fn feature_summary_lists_present_features() {
        let caps = DeviceCapabilities {
            fp16_arithmetic: true,
            fp64_shader: true,
            ..DeviceCapabilities::default()
        };
        let summary = caps.feature_summary();
        assert!(summary.contains("fp32"));
        assert!(summary.contains("fp16"));
        assert!(summary.contains("fp64"));
        assert!(!summary.contains("coopmat"));
    }

    #[test]
    fn coop_mat_shape_roundtrip() {
        let shape = CoopMatShape::new(16, 16, 16);
        assert_eq!(shape.m * shape.n * shape.k, 4096);
    }
}
