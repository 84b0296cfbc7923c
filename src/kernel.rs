// SPDX-License-Identifier: AGPL-3.0-only

//! Kernel catalog — fixed micro-kernel sources keyed by a tagged selector.
//!
//! Every benchmark kernel is a multiply-add chain: load `a` and `b`, fold
//! `c = a * c + b` sixteen times per inner-loop iteration, store `c`. The
//! catalog is a pure lookup over [`KernelKey`] (storage type, arithmetic
//! type, packing, accumulator arity): vector kernels are WGSL generated from
//! the key, while formats WGSL cannot express (int8 dot product, int16,
//! bf16, cooperative matrix) are opaque GLSL texts that only a facade with a
//! SPIR-V path can compile.
//!
//! The dual-accumulator twin of each kernel maintains two independent
//! chains (8 multiply-adds each) and combines them with one final add,
//! exposing instruction-level parallelism a single dependent chain cannot
//! saturate.
//!
//! Invocation count and inner-loop count are specialization constants
//! (WGSL `override` / SPIR-V `constant_id`), so the calibration loop must
//! rebuild pipelines whenever either changes.

use crate::capability::{CoopMatFamily, CoopMatShape};
use crate::request::{ArithmeticType, PackingType, StorageType};

/// Single- vs dual-accumulator kernel structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccumulatorArity {
    Single,
    Dual,
}

/// Which accumulation format a cooperative-matrix kernel uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionPath {
    /// Accumulate in the input type (e.g. fp16 × fp16 → fp16).
    SameType,
    /// Accumulate in the widened type (e.g. fp16 × fp16 → fp32). The wider
    /// accumulator occupies two packed output slots per element.
    Widened,
}

/// Catalog lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelKey {
    pub storage: StorageType,
    pub arithmetic: ArithmeticType,
    pub packing: PackingType,
    pub arity: AccumulatorArity,
}

/// A resolved compute program identity: catalog key plus, for matrix
/// variants, the hardware tile shape, promotion path, and extension family.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelVariant {
    pub key: KernelKey,
    pub tile: Option<CoopMatShape>,
    pub promotion: Option<PromotionPath>,
    pub family: Option<CoopMatFamily>,
}

impl KernelVariant {
    /// A vector (scalar/vec4/vec8) kernel variant.
    #[must_use]
    pub const fn vector(key: KernelKey) -> Self {
        Self {
            key,
            tile: None,
            promotion: None,
            family: None,
        }
    }

    /// A cooperative-matrix kernel variant with resolved tile geometry.
    #[must_use]
    pub const fn matrix(
        key: KernelKey,
        tile: CoopMatShape,
        promotion: PromotionPath,
        family: CoopMatFamily,
    ) -> Self {
        Self {
            key,
            tile: Some(tile),
            promotion: Some(promotion),
            family: Some(family),
        }
    }

    /// The dual-accumulator twin of this variant.
    #[must_use]
    pub fn dual_twin(&self) -> Self {
        let mut twin = self.clone();
        twin.key.arity = AccumulatorArity::Dual;
        twin
    }

    #[must_use]
    pub const fn is_dual(&self) -> bool {
        matches!(self.key.arity, AccumulatorArity::Dual)
    }
}

/// Compile-time-bound inputs baked into a kernel at pipeline build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecConstants {
    /// Invocation count (bounds-check guard inside the kernel).
    pub count: u32,
    /// Inner-loop repetition count.
    pub loop_count: u32,
    /// Tile dimensions for matrix kernels.
    pub tile: Option<CoopMatShape>,
}

/// Kernel source text in the language the variant is authored in.
#[derive(Debug, Clone)]
pub enum KernelSource {
    /// Compilable by the wgpu substrate.
    Wgsl(String),
    /// Opaque SPIR-V-path source; the wgpu substrate rejects these.
    Glsl(String),
}

/// Resolve a kernel variant to its source text.
///
/// Returns `None` for keys outside the catalog (the selector never produces
/// such variants). `local_size` is baked into the text; invocation and loop
/// counts stay specialization constants.
#[must_use]
pub fn source_for(variant: &KernelVariant, local_size: u32) -> Option<KernelSource> {
    if variant.key.packing == PackingType::Matrix {
        return coopmat_source(variant).map(KernelSource::Glsl);
    }
    match (
        wgsl_scalar(variant.key.storage),
        wgsl_arith(variant.key.arithmetic),
    ) {
        (Some(st), Some(at)) => Some(KernelSource::Wgsl(wgsl_vector_source(
            st,
            at,
            variant.key.packing,
            variant.key.arity,
            local_size,
        ))),
        _ => glsl_vector_source(&variant.key).map(KernelSource::Glsl),
    }
}

/// WGSL type name for a storage format, if WGSL can express it.
const fn wgsl_scalar(storage: StorageType) -> Option<&'static str> {
    match storage {
        StorageType::Fp32 => Some("f32"),
        StorageType::Fp16Packed | StorageType::Fp16 => Some("f16"),
        StorageType::Fp64 => Some("f64"),
        StorageType::Int32 => Some("i32"),
        StorageType::Int16 | StorageType::Int8 => None,
    }
}

const fn wgsl_arith(arithmetic: ArithmeticType) -> Option<&'static str> {
    match arithmetic {
        ArithmeticType::Fp32 => Some("f32"),
        ArithmeticType::Fp16 => Some("f16"),
        ArithmeticType::Fp64 => Some("f64"),
        ArithmeticType::Int32 => Some("i32"),
        ArithmeticType::Int16 | ArithmeticType::Int8 | ArithmeticType::Bf16 => None,
    }
}

/// Number of multiply-adds unrolled per inner-loop iteration.
pub const UNROLL: u32 = 16;

// ── WGSL vector kernels ──────────────────────────────────────────────

fn wgsl_vector_source(
    st: &str,
    at: &str,
    packing: PackingType,
    arity: AccumulatorArity,
    local_size: u32,
) -> String {
    let enable = if st == "f16" || at == "f16" {
        "enable f16;\n\n"
    } else {
        ""
    };
    let (elem, body) = match packing {
        PackingType::Scalar => wgsl_scalar_body(st, at, arity),
        PackingType::Vec4 => wgsl_vec4_body(st, at, arity),
        PackingType::Vec8 => wgsl_vec8_body(st, at, arity),
        // Matrix handled before this generator is reached.
        PackingType::Matrix => unreachable!("matrix kernels are not WGSL"),
    };
    format!(
        r"{enable}override count: u32 = 0u;
override loop_count: u32 = 1u;

@group(0) @binding(0) var<storage, read> a_data: array<{elem}>;
@group(0) @binding(1) var<storage, read> b_data: array<{elem}>;
@group(0) @binding(2) var<storage, read_write> c_data: array<{elem}>;

@compute @workgroup_size({local_size})
fn main(@builtin(global_invocation_id) gid: vec3<u32>,
        @builtin(num_workgroups) nwg: vec3<u32>) {{
    let gx = gid.x + gid.y * nwg.x * {local_size}u;
    if (gx >= count) {{
        return;
    }}
{body}}}
"
    )
}

fn wgsl_scalar_body(st: &str, at: &str, arity: AccumulatorArity) -> (String, String) {
    let load = format!(
        "    let a = {at}(a_data[gx]);\n    let b = {at}(b_data[gx]);\n"
    );
    let body = match arity {
        AccumulatorArity::Single => {
            let fma = "        c = a * c + b;\n".repeat(UNROLL as usize);
            format!(
                "{load}    var c = {at}(1);\n    for (var i = 0u; i < loop_count; i = i + 1u) {{\n{fma}    }}\n    c_data[gx] = {st}(c);\n"
            )
        }
        AccumulatorArity::Dual => {
            let fma = "        c0 = a * c0 + b;\n        c1 = a * c1 + b;\n"
                .repeat(UNROLL as usize / 2);
            format!(
                "{load}    var c0 = {at}(1);\n    var c1 = {at}(1);\n    for (var i = 0u; i < loop_count; i = i + 1u) {{\n{fma}    }}\n    c_data[gx] = {st}(c0 + c1);\n"
            )
        }
    };
    (st.to_string(), body)
}

fn wgsl_vec4_body(st: &str, at: &str, arity: AccumulatorArity) -> (String, String) {
    let load = format!(
        "    let a = vec4<{at}>(a_data[gx]);\n    let b = vec4<{at}>(b_data[gx]);\n"
    );
    let body = match arity {
        AccumulatorArity::Single => {
            let fma = "        c = a * c + b;\n".repeat(UNROLL as usize);
            format!(
                "{load}    var c = vec4<{at}>({at}(1));\n    for (var i = 0u; i < loop_count; i = i + 1u) {{\n{fma}    }}\n    c_data[gx] = vec4<{st}>(c);\n"
            )
        }
        AccumulatorArity::Dual => {
            let fma = "        c0 = a * c0 + b;\n        c1 = a * c1 + b;\n"
                .repeat(UNROLL as usize / 2);
            format!(
                "{load}    var c0 = vec4<{at}>({at}(1));\n    var c1 = vec4<{at}>({at}(1));\n    for (var i = 0u; i < loop_count; i = i + 1u) {{\n{fma}    }}\n    c_data[gx] = vec4<{st}>(c0 + c1);\n"
            )
        }
    };
    (format!("vec4<{st}>"), body)
}

fn wgsl_vec8_body(st: &str, at: &str, arity: AccumulatorArity) -> (String, String) {
    // An 8-wide element is two vec4 halves at 2*gx and 2*gx+1.
    let load = format!(
        "    let a0 = vec4<{at}>(a_data[2u * gx]);\n    let a1 = vec4<{at}>(a_data[2u * gx + 1u]);\n    let b0 = vec4<{at}>(b_data[2u * gx]);\n    let b1 = vec4<{at}>(b_data[2u * gx + 1u]);\n"
    );
    let body = match arity {
        AccumulatorArity::Single => {
            let fma = "        c0 = a0 * c0 + b0;\n        c1 = a1 * c1 + b1;\n"
                .repeat(UNROLL as usize);
            format!(
                "{load}    var c0 = vec4<{at}>({at}(1));\n    var c1 = vec4<{at}>({at}(1));\n    for (var i = 0u; i < loop_count; i = i + 1u) {{\n{fma}    }}\n    c_data[2u * gx] = vec4<{st}>(c0);\n    c_data[2u * gx + 1u] = vec4<{st}>(c1);\n"
            )
        }
        AccumulatorArity::Dual => {
            let fma = "        d00 = a0 * d00 + b0;\n        d01 = a1 * d01 + b1;\n        d10 = a0 * d10 + b0;\n        d11 = a1 * d11 + b1;\n"
                .repeat(UNROLL as usize / 2);
            format!(
                "{load}    var d00 = vec4<{at}>({at}(1));\n    var d01 = vec4<{at}>({at}(1));\n    var d10 = vec4<{at}>({at}(1));\n    var d11 = vec4<{at}>({at}(1));\n    for (var i = 0u; i < loop_count; i = i + 1u) {{\n{fma}    }}\n    c_data[2u * gx] = vec4<{st}>(d00 + d10);\n    c_data[2u * gx + 1u] = vec4<{st}>(d01 + d11);\n"
            )
        }
    };
    (format!("vec4<{st}>"), body)
}

// ── Opaque GLSL vector kernels (no WGSL equivalent) ──────────────────

/// GLSL texts for int8 dot-product, int16, and bf16 vector kernels.
///
/// These are fixed externally-authored micro-kernels; the generator only
/// stitches the per-type declarations around the shared multiply-add body.
/// An 8-wide element is two 4-wide halves at `2*gx` and `2*gx+1`, as in the
/// WGSL kernels.
fn glsl_vector_source(key: &KernelKey) -> Option<String> {
    // (extension, buffer element type, accumulator type, one multiply-add)
    let (extensions, elem, acc, fma) = match (key.arithmetic, key.packing) {
        (ArithmeticType::Int8, PackingType::Scalar) => (
            "#extension GL_EXT_shader_explicit_arithmetic_types_int8: require",
            "int8_t",
            "int8_t",
            "{c} = int8_t({a} * {c} + {b});",
        ),
        // Packed 4 x int8 per u32; one accumulating dot per multiply-add.
        (ArithmeticType::Int8, PackingType::Vec4 | PackingType::Vec8) => (
            "#extension GL_EXT_integer_dot_product: require",
            "uint",
            "int",
            "{c} = dotPacked4x8AccSatEXT({a}, {b}, {c});",
        ),
        (ArithmeticType::Int16, PackingType::Scalar) => (
            "#extension GL_EXT_shader_explicit_arithmetic_types_int16: require",
            "int16_t",
            "int16_t",
            "{c} = int16_t({a} * {c} + {b});",
        ),
        (ArithmeticType::Int16, PackingType::Vec4 | PackingType::Vec8) => (
            "#extension GL_EXT_shader_explicit_arithmetic_types_int16: require",
            "i16vec4",
            "i16vec4",
            "{c} = {a} * {c} + {b};",
        ),
        (ArithmeticType::Bf16, PackingType::Scalar) => (
            "#extension GL_EXT_bfloat16: require",
            "bfloat16_t",
            "bfloat16_t",
            "{c} = {a} * {c} + {b};",
        ),
        (ArithmeticType::Bf16, PackingType::Vec4 | PackingType::Vec8) => (
            "#extension GL_EXT_bfloat16: require",
            "bf16vec4",
            "bf16vec4",
            "{c} = {a} * {c} + {b};",
        ),
        _ => return None,
    };
    // Vec8: two element-type halves per logical element. For int8 the
    // "half" is already a packed u32 quad, so Vec8 is two packed quads.
    let paired = key.packing == PackingType::Vec8;

    let bind = |line: &str, a: &str, b: &str, c: &str| {
        line.replace("{a}", a).replace("{b}", b).replace("{c}", c)
    };
    let one = |value: &str| format!("{acc}({value})");
    let unit = if key.arithmetic == ArithmeticType::Bf16 {
        one("1.0")
    } else {
        one("1")
    };

    // The dot-product accumulator is an int while the buffer element is a
    // packed uint; stores go through a cast.
    let out = |expr: &str| {
        if elem == acc {
            format!("{expr};")
        } else {
            format!("{elem}({expr});")
        }
    };

    let (load, decl, step, store) = match (paired, key.arity) {
        (false, AccumulatorArity::Single) => (
            format!("    {elem} a = a_data[gx];\n    {elem} b = b_data[gx];\n"),
            format!("{acc} c = {unit};"),
            format!("        {}\n", bind(fma, "a", "b", "c")).repeat(UNROLL as usize),
            format!("    c_data[gx] = {}", out("c")),
        ),
        (false, AccumulatorArity::Dual) => (
            format!("    {elem} a = a_data[gx];\n    {elem} b = b_data[gx];\n"),
            format!("{acc} c0 = {unit};\n    {acc} c1 = {unit};"),
            format!(
                "        {}\n        {}\n",
                bind(fma, "a", "b", "c0"),
                bind(fma, "a", "b", "c1")
            )
            .repeat(UNROLL as usize / 2),
            format!("    c_data[gx] = {}", out("c0 + c1")),
        ),
        (true, AccumulatorArity::Single) => (
            format!(
                "    {elem} a0 = a_data[2 * gx];\n    {elem} a1 = a_data[2 * gx + 1];\n    {elem} b0 = b_data[2 * gx];\n    {elem} b1 = b_data[2 * gx + 1];\n"
            ),
            format!("{acc} c0 = {unit};\n    {acc} c1 = {unit};"),
            format!(
                "        {}\n        {}\n",
                bind(fma, "a0", "b0", "c0"),
                bind(fma, "a1", "b1", "c1")
            )
            .repeat(UNROLL as usize),
            format!(
                "    c_data[2 * gx] = {}\n    c_data[2 * gx + 1] = {}",
                out("c0"),
                out("c1")
            ),
        ),
        (true, AccumulatorArity::Dual) => (
            format!(
                "    {elem} a0 = a_data[2 * gx];\n    {elem} a1 = a_data[2 * gx + 1];\n    {elem} b0 = b_data[2 * gx];\n    {elem} b1 = b_data[2 * gx + 1];\n"
            ),
            format!(
                "{acc} d00 = {unit};\n    {acc} d01 = {unit};\n    {acc} d10 = {unit};\n    {acc} d11 = {unit};"
            ),
            format!(
                "        {}\n        {}\n        {}\n        {}\n",
                bind(fma, "a0", "b0", "d00"),
                bind(fma, "a1", "b1", "d01"),
                bind(fma, "a0", "b0", "d10"),
                bind(fma, "a1", "b1", "d11")
            )
            .repeat(UNROLL as usize / 2),
            format!(
                "    c_data[2 * gx] = {}\n    c_data[2 * gx + 1] = {}",
                out("d00 + d10"),
                out("d01 + d11")
            ),
        ),
    };
    let extensions = format!("{extensions}\n");

    Some(format!(
        r"#version 450
{extensions}
layout (constant_id = 0) const int count = 0;
layout (constant_id = 1) const int loop_count = 1;
layout (local_size_x_id = 2) in;

layout (binding = 0) readonly buffer a_blob {{ {elem} a_data[]; }};
layout (binding = 1) readonly buffer b_blob {{ {elem} b_data[]; }};
layout (binding = 2) writeonly buffer c_blob {{ {elem} c_data[]; }};

void main()
{{
    int gx = int(gl_GlobalInvocationID.x);
    if (gx >= count)
        return;

{load}    {decl}
    for (int i = 0; i < loop_count; i++)
    {{
{step}    }}
{store}
}}
"
    ))
}

// ── Opaque GLSL cooperative-matrix kernels ───────────────────────────

fn coopmat_source(variant: &KernelVariant) -> Option<String> {
    let family = variant.family?;
    let (input, acc) = match (variant.key.arithmetic, variant.promotion?) {
        (ArithmeticType::Fp16, PromotionPath::SameType) => ("float16_t", "float16_t"),
        (ArithmeticType::Fp16, PromotionPath::Widened) => ("float16_t", "float"),
        (ArithmeticType::Bf16, PromotionPath::SameType) => ("bfloat16_t", "bfloat16_t"),
        (ArithmeticType::Bf16, PromotionPath::Widened) => ("bfloat16_t", "float"),
        (ArithmeticType::Int8, PromotionPath::SameType) => ("int8_t", "int8_t"),
        (ArithmeticType::Int8, PromotionPath::Widened) => ("int8_t", "int"),
        _ => return None,
    };
    let extension = match family {
        CoopMatFamily::Khr => "#extension GL_KHR_cooperative_matrix: require",
        CoopMatFamily::Nv => "#extension GL_NV_cooperative_matrix: require",
    };
    let step = match variant.key.arity {
        AccumulatorArity::Single => "        c = coopMatMulAdd(a, b, c);\n"
            .repeat(UNROLL as usize),
        AccumulatorArity::Dual => {
            "        c0 = coopMatMulAdd(a, b, c0);\n        c1 = coopMatMulAdd(a, b, c1);\n"
                .repeat(UNROLL as usize / 2)
        }
    };
    let (decl, store) = match variant.key.arity {
        AccumulatorArity::Single => (
            format!("coopmat<{acc}, gl_ScopeSubgroup, M, N, gl_MatrixUseAccumulator> c = coopmat<{acc}, gl_ScopeSubgroup, M, N, gl_MatrixUseAccumulator>({acc}(1.0));"),
            String::from("    coopMatStore(c, c_data, tile * M * N, N, gl_CooperativeMatrixLayoutRowMajor);"),
        ),
        AccumulatorArity::Dual => (
            format!("coopmat<{acc}, gl_ScopeSubgroup, M, N, gl_MatrixUseAccumulator> c0 = coopmat<{acc}, gl_ScopeSubgroup, M, N, gl_MatrixUseAccumulator>({acc}(1.0));\n    coopmat<{acc}, gl_ScopeSubgroup, M, N, gl_MatrixUseAccumulator> c1 = c0;"),
            String::from("    coopMatStore(c0 + c1, c_data, tile * M * N, N, gl_CooperativeMatrixLayoutRowMajor);"),
        ),
    };

    Some(format!(
        r"#version 450
{extension}
#extension GL_KHR_memory_scope_semantics: require
#extension GL_EXT_shader_explicit_arithmetic_types: require

layout (constant_id = 0) const int count = 0;
layout (constant_id = 1) const int loop_count = 1;
layout (constant_id = 2) const int M = 16;
layout (constant_id = 3) const int N = 16;
layout (constant_id = 4) const int K = 16;
layout (local_size_x_id = 5) in;

layout (binding = 0) readonly buffer a_blob {{ {input} a_data[]; }};
layout (binding = 1) readonly buffer b_blob {{ {input} b_data[]; }};
layout (binding = 2) writeonly buffer c_blob {{ {acc} c_data[]; }};

void main()
{{
    int tile = int(gl_WorkGroupID.x);
    if (tile >= count)
        return;

    coopmat<{input}, gl_ScopeSubgroup, M, K, gl_MatrixUseA> a;
    coopmat<{input}, gl_ScopeSubgroup, K, N, gl_MatrixUseB> b;
    coopMatLoad(a, a_data, tile * M * K, K, gl_CooperativeMatrixLayoutRowMajor);
    coopMatLoad(b, b_data, tile * K * N, N, gl_CooperativeMatrixLayoutRowMajor);

    {decl}
    for (int i = 0; i < loop_count; i++)
    {{
{step}    }}
{store}
}}
"
    ))
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn key(
        storage: StorageType,
        arithmetic: ArithmeticType,
        packing: PackingType,
        arity: AccumulatorArity,
    ) -> KernelKey {
        KernelKey {
            storage,
            arithmetic,
            packing,
            arity,
        }
    }

    #[test]
    fn fp32_vec4_is_wgsl_with_sixteen_fmas() {
        let variant = KernelVariant::vector(key(
            StorageType::Fp32,
            ArithmeticType::Fp32,
            PackingType::Vec4,
            AccumulatorArity::Single,
        ));
        let source = source_for(&variant, 128).expect("fp32 vec4 in catalog");
        let KernelSource::Wgsl(text) = source else {
            panic!("fp32 vector kernel must be WGSL");
        };
        assert_eq!(text.matches("c = a * c + b;").count(), 16);
        assert!(text.contains("override count"));
        assert!(text.contains("override loop_count"));
        assert!(text.contains("@workgroup_size(128)"));
    }

    #[test]
    fn dual_twin_combines_two_chains() {
        let variant = KernelVariant::vector(key(
            StorageType::Fp32,
            ArithmeticType::Fp32,
            PackingType::Scalar,
            AccumulatorArity::Single,
        ));
        let twin = variant.dual_twin();
        assert!(twin.is_dual());
        let KernelSource::Wgsl(text) =
            source_for(&twin, 64).expect("dual scalar in catalog")
        else {
            panic!("expected WGSL");
        };
        assert_eq!(text.matches("c0 = a * c0 + b;").count(), 8);
        assert_eq!(text.matches("c1 = a * c1 + b;").count(), 8);
        assert!(text.contains("c0 + c1"));
    }

    #[test]
    fn fp16_kernels_enable_f16() {
        let variant = KernelVariant::vector(key(
            StorageType::Fp16,
            ArithmeticType::Fp16,
            PackingType::Scalar,
            AccumulatorArity::Single,
        ));
        let KernelSource::Wgsl(text) = source_for(&variant, 32).expect("fp16 in catalog")
        else {
            panic!("expected WGSL");
        };
        assert!(text.starts_with("enable f16;"));
    }

    #[test]
    fn vec8_uses_two_halves() {
        let variant = KernelVariant::vector(key(
            StorageType::Fp64,
            ArithmeticType::Fp64,
            PackingType::Vec8,
            AccumulatorArity::Single,
        ));
        let KernelSource::Wgsl(text) = source_for(&variant, 32).expect("fp64 vec8")
        else {
            panic!("expected WGSL");
        };
        assert!(text.contains("a_data[2u * gx]"));
        assert!(text.contains("a_data[2u * gx + 1u]"));
        // 16 logical vec8 multiply-adds, each as a pair of vec4 statements.
        assert_eq!(text.matches("c0 = a0 * c0 + b0;").count(), 16);
    }

    #[test]
    fn int8_dot_product_is_opaque_glsl() {
        let variant = KernelVariant::vector(key(
            StorageType::Int8,
            ArithmeticType::Int8,
            PackingType::Vec4,
            AccumulatorArity::Single,
        ));
        let KernelSource::Glsl(text) = source_for(&variant, 64).expect("int8 dot in catalog")
        else {
            panic!("int8 dot kernel must be GLSL");
        };
        assert!(text.contains("GL_EXT_integer_dot_product"));
        assert_eq!(text.matches("dotPacked4x8AccSatEXT").count(), 16);
    }

    #[test]
    fn coopmat_source_keyed_by_family_and_promotion() {
        let base = key(
            StorageType::Fp16,
            ArithmeticType::Fp16,
            PackingType::Matrix,
            AccumulatorArity::Single,
        );
        let khr = KernelVariant::matrix(
            base,
            CoopMatShape::new(16, 16, 16),
            PromotionPath::Widened,
            CoopMatFamily::Khr,
        );
        let KernelSource::Glsl(text) = source_for(&khr, 32).expect("coopmat in catalog")
        else {
            panic!("coopmat kernel must be GLSL");
        };
        assert!(text.contains("GL_KHR_cooperative_matrix"));
        assert!(text.contains("float16_t"));
        // Widened path accumulates in float.
        assert!(text.contains("coopmat<float,"));

        let nv = KernelVariant::matrix(
            base,
            CoopMatShape::new(16, 16, 16),
            PromotionPath::SameType,
            CoopMatFamily::Nv,
        );
        let KernelSource::Glsl(text) = source_for(&nv, 32).expect("nv coopmat")
        else {
            panic!("expected GLSL");
        };
        assert!(text.contains("GL_NV_cooperative_matrix"));
    }

    #[test]
    fn specialization_constants_carry_tile() {
        let constants = SpecConstants {
            count: 4096,
            loop_count: 16,
            tile: Some(CoopMatShape::new(16, 8, 16)),
        };
        assert_eq!(constants.tile.expect("tile").n, 8);
    }
}
