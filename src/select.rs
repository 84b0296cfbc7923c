// SPDX-License-Identifier: AGPL-3.0-only

//! Kernel selection — capability gates and tile-shape resolution.
//!
//! Resolution is a pure function over (request, capabilities): the same pair
//! always yields the same verdict and, when supported, the same kernel
//! variants. Gates are independent; any failing gate yields `Unsupported`.
//!
//! For matrix packing, the device's reported cooperative-matrix type
//! combinations are searched in a fixed preference order: same-type
//! accumulate first (fp16 × fp16 → fp16), widened accumulate second
//! (fp16 × fp16 → fp32). The narrower accumulation format is typically
//! faster; the wider one is the fallback when the narrow one is not offered.

use crate::capability::{CoopMatShape, DeviceCapabilities};
use crate::error::PeakError;
use crate::kernel::{AccumulatorArity, KernelKey, KernelVariant, PromotionPath};
use crate::request::{ArithmeticType, BenchmarkRequest, PackingType, StorageType};

/// Resolve a request to its (single, dual) kernel variant pair.
///
/// # Errors
///
/// Returns [`PeakError::Unsupported`] when any capability gate fails or no
/// cooperative-matrix type combination matches.
pub fn resolve(
    request: &BenchmarkRequest,
    caps: &DeviceCapabilities,
) -> Result<(KernelVariant, KernelVariant), PeakError> {
    check_gates(request, caps)?;

    let key = KernelKey {
        storage: request.storage,
        arithmetic: request.arithmetic,
        packing: request.packing,
        arity: AccumulatorArity::Single,
    };

    let single = if request.packing == PackingType::Matrix {
        let (shape, promotion) = resolve_tile(request.arithmetic, caps).ok_or_else(|| {
            PeakError::Unsupported(format!(
                "no cooperative-matrix type combination for {}",
                request.arithmetic.label()
            ))
        })?;
        let family = caps.cooperative_matrix.ok_or_else(|| {
            PeakError::Unsupported("no cooperative-matrix extension family".into())
        })?;
        KernelVariant::matrix(key, shape, promotion, family)
    } else {
        KernelVariant::vector(key)
    };

    let dual = single.dual_twin();
    Ok((single, dual))
}

fn check_gates(request: &BenchmarkRequest, caps: &DeviceCapabilities) -> Result<(), PeakError> {
    let unsupported = |msg: &str| Err(PeakError::Unsupported(msg.into()));
    let dot_packed = matches!(request.packing, PackingType::Vec4 | PackingType::Vec8);

    if matches!(request.storage, StorageType::Fp16Packed | StorageType::Fp16)
        && !caps.fp16_storage
    {
        return unsupported("fp16 storage feature absent");
    }
    if request.arithmetic == ArithmeticType::Fp16 && !caps.fp16_arithmetic {
        return unsupported("fp16 arithmetic feature absent");
    }
    if request.arithmetic == ArithmeticType::Fp64 && !caps.fp64_shader {
        return unsupported("fp64 shader feature absent");
    }
    if request.arithmetic == ArithmeticType::Int8 {
        if !caps.int8_arithmetic {
            return unsupported("int8 arithmetic feature absent");
        }
        if dot_packed && !caps.int8_dot_product {
            return unsupported("int8 dot-product feature absent");
        }
    }
    if request.arithmetic == ArithmeticType::Bf16 {
        if !caps.bf16_arithmetic {
            return unsupported("bf16 arithmetic feature absent");
        }
        if dot_packed && !caps.bf16_dot_product {
            return unsupported("bf16 dot-product feature absent");
        }
        if request.packing == PackingType::Matrix && !caps.bf16_cooperative_matrix {
            return unsupported("bf16 cooperative-matrix feature absent");
        }
    }
    if request.packing == PackingType::Matrix && caps.cooperative_matrix.is_none() {
        return unsupported("cooperative-matrix extension absent");
    }
    Ok(())
}

/// Accumulation type preference per arithmetic type: narrow first, wide second.
const fn accumulate_preference(
    arithmetic: ArithmeticType,
) -> Option<(ArithmeticType, ArithmeticType)> {
    match arithmetic {
        ArithmeticType::Fp16 => Some((ArithmeticType::Fp16, ArithmeticType::Fp32)),
        ArithmeticType::Bf16 => Some((ArithmeticType::Bf16, ArithmeticType::Fp32)),
        ArithmeticType::Int8 => Some((ArithmeticType::Int8, ArithmeticType::Int32)),
        _ => None,
    }
}

fn resolve_tile(
    arithmetic: ArithmeticType,
    caps: &DeviceCapabilities,
) -> Option<(CoopMatShape, PromotionPath)> {
    let (same, wide) = accumulate_preference(arithmetic)?;
    let find = |acc: ArithmeticType| {
        caps.coop_mat_combos
            .iter()
            .find(|combo| combo.input == arithmetic && combo.accumulate == acc)
            .map(|combo| combo.shape)
    };
    find(same)
        .map(|shape| (shape, PromotionPath::SameType))
        .or_else(|| find(wide).map(|shape| (shape, PromotionPath::Widened)))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::capability::{CoopMatCombo, CoopMatFamily};

    fn request(
        storage: StorageType,
        arithmetic: ArithmeticType,
        packing: PackingType,
    ) -> BenchmarkRequest {
        BenchmarkRequest::new(storage, arithmetic, packing)
    }

    #[test]
    fn fp32_vec4_has_no_gates() {
        let req = request(StorageType::Fp32, ArithmeticType::Fp32, PackingType::Vec4);
        let caps = DeviceCapabilities::default();
        let (single, dual) = resolve(&req, &caps).expect("fp32 vec4 always resolves");
        assert_eq!(single.key.arity, AccumulatorArity::Single);
        assert_eq!(dual.key.arity, AccumulatorArity::Dual);
        assert_eq!(single.key.packing, PackingType::Vec4);
        assert!(single.tile.is_none());
    }

    #[test]
    fn fp64_gated_on_shader_float64() {
        let req = request(StorageType::Fp64, ArithmeticType::Fp64, PackingType::Scalar);
        let caps = DeviceCapabilities::default();
        assert!(matches!(
            resolve(&req, &caps),
            Err(PeakError::Unsupported(_))
        ));

        let caps = DeviceCapabilities {
            fp64_shader: true,
            ..DeviceCapabilities::default()
        };
        assert!(resolve(&req, &caps).is_ok());
    }

    #[test]
    fn fp16_storage_and_arithmetic_gated_independently() {
        let req = request(
            StorageType::Fp16Packed,
            ArithmeticType::Fp32,
            PackingType::Vec4,
        );
        let caps = DeviceCapabilities::default();
        assert!(resolve(&req, &caps).is_err());

        // Storage feature alone satisfies an fp32-arithmetic request.
        let caps = DeviceCapabilities {
            fp16_storage: true,
            ..DeviceCapabilities::default()
        };
        assert!(resolve(&req, &caps).is_ok());

        let req = request(StorageType::Fp32, ArithmeticType::Fp16, PackingType::Vec4);
        assert!(resolve(&req, &caps).is_err());
    }

    #[test]
    fn int8_dot_packing_needs_dot_product_feature() {
        let caps = DeviceCapabilities {
            int8_arithmetic: true,
            ..DeviceCapabilities::default()
        };
        let scalar = request(StorageType::Int8, ArithmeticType::Int8, PackingType::Scalar);
        assert!(resolve(&scalar, &caps).is_ok());

        let packed = request(StorageType::Int8, ArithmeticType::Int8, PackingType::Vec4);
        assert!(resolve(&packed, &caps).is_err());

        let caps = DeviceCapabilities {
            int8_dot_product: true,
            ..caps
        };
        assert!(resolve(&packed, &caps).is_ok());
    }

    #[test]
    fn matrix_needs_an_extension_family() {
        let req = request(StorageType::Fp16, ArithmeticType::Fp16, PackingType::Matrix);
        let caps = DeviceCapabilities {
            fp16_storage: true,
            fp16_arithmetic: true,
            ..DeviceCapabilities::default()
        };
        assert!(matches!(
            resolve(&req, &caps),
            Err(PeakError::Unsupported(_))
        ));
    }

    #[test]
    fn tile_search_prefers_same_type_accumulate() {
        let req = request(StorageType::Fp16, ArithmeticType::Fp16, PackingType::Matrix);
        let caps = DeviceCapabilities {
            fp16_storage: true,
            fp16_arithmetic: true,
            cooperative_matrix: Some(CoopMatFamily::Khr),
            coop_mat_combos: vec![
                CoopMatCombo {
                    input: ArithmeticType::Fp16,
                    accumulate: ArithmeticType::Fp32,
                    shape: CoopMatShape::new(16, 8, 16),
                },
                CoopMatCombo {
                    input: ArithmeticType::Fp16,
                    accumulate: ArithmeticType::Fp16,
                    shape: CoopMatShape::new(16, 16, 16),
                },
            ],
            ..DeviceCapabilities::default()
        };
        let (single, _) = resolve(&req, &caps).expect("fp16 matrix resolves");
        assert_eq!(single.promotion, Some(PromotionPath::SameType));
        assert_eq!(single.tile, Some(CoopMatShape::new(16, 16, 16)));
    }

    #[test]
    fn tile_search_falls_back_to_widened_accumulate() {
        let req = request(StorageType::Fp16, ArithmeticType::Fp16, PackingType::Matrix);
        let caps = DeviceCapabilities {
            fp16_storage: true,
            fp16_arithmetic: true,
            cooperative_matrix: Some(CoopMatFamily::Khr),
            coop_mat_combos: vec![CoopMatCombo {
                input: ArithmeticType::Fp16,
                accumulate: ArithmeticType::Fp32,
                shape: CoopMatShape::new(16, 8, 16),
            }],
            ..DeviceCapabilities::default()
        };
        let (single, dual) = resolve(&req, &caps).expect("widened fallback resolves");
        assert_eq!(single.promotion, Some(PromotionPath::Widened));
        assert_eq!(single.tile, Some(CoopMatShape::new(16, 8, 16)));
        assert_eq!(dual.promotion, Some(PromotionPath::Widened));
    }

    #[test]
    fn no_matching_combination_is_unsupported() {
        let req = request(StorageType::Fp16, ArithmeticType::Fp16, PackingType::Matrix);
        let caps = DeviceCapabilities {
            fp16_storage: true,
            fp16_arithmetic: true,
            cooperative_matrix: Some(CoopMatFamily::Nv),
            coop_mat_combos: vec![CoopMatCombo {
                input: ArithmeticType::Int8,
                accumulate: ArithmeticType::Int32,
                shape: CoopMatShape::new(8, 8, 32),
            }],
            ..DeviceCapabilities::default()
        };
        assert!(matches!(
            resolve(&req, &caps),
            Err(PeakError::Unsupported(_))
        ));
    }

    #[test]
    fn resolution_is_idempotent() {
        let req = request(StorageType::Fp16, ArithmeticType::Fp16, PackingType::Matrix);
        let caps = DeviceCapabilities {
            fp16_storage: true,
            fp16_arithmetic: true,
            cooperative_matrix: Some(CoopMatFamily::Khr),
            coop_mat_combos: vec![CoopMatCombo {
                input: ArithmeticType::Fp16,
                accumulate: ArithmeticType::Fp32,
                shape: CoopMatShape::new(16, 8, 16),
            }],
            ..DeviceCapabilities::default()
        };
        let first = resolve(&req, &caps).expect("resolves");
        let second = resolve(&req, &caps).expect("resolves again");
        assert_eq!(first, second);
    }
}
