// SPDX-License-Identifier: AGPL-3.0-only

//! Benchmark request parameters — the caller's configuration for one run.
//!
//! A request names a (storage type, arithmetic type, packing) triple plus the
//! initial inner-loop count, the buffer cap in MiB, and how many timed
//! command submissions each calibration iteration performs. Immutable for
//! the duration of one run; the calibration loop mutates only its own
//! [`crate::workload::WorkloadShape`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Default inner-loop repetition count.
pub const DEFAULT_LOOP: u32 = 16;
/// Default buffer cap in MiB.
pub const DEFAULT_COUNT_MB: u64 = 64;
/// Default timed submissions per calibration iteration.
pub const DEFAULT_CMD_LOOP: u32 = 4;

/// How elements are stored in the device buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StorageType {
    Fp32,
    /// fp16 values packed into wider vectors (16-bit storage, packed load).
    Fp16Packed,
    /// Plain fp16 storage.
    Fp16,
    Fp64,
    Int32,
    Int16,
    Int8,
}

impl StorageType {
    /// Bytes per scalar element in device buffers.
    #[must_use]
    pub const fn element_bytes(self) -> u64 {
        match self {
            Self::Fp64 => 8,
            Self::Fp32 | Self::Int32 => 4,
            Self::Fp16Packed | Self::Fp16 | Self::Int16 => 2,
            Self::Int8 => 1,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fp32 => "fp32",
            Self::Fp16Packed => "fp16p",
            Self::Fp16 => "fp16s",
            Self::Fp64 => "fp64",
            Self::Int32 => "int32",
            Self::Int16 => "int16",
            Self::Int8 => "int8",
        }
    }
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fp32" => Ok(Self::Fp32),
            "fp16p" | "fp16-packed" => Ok(Self::Fp16Packed),
            "fp16s" | "fp16" => Ok(Self::Fp16),
            "fp64" => Ok(Self::Fp64),
            "int32" => Ok(Self::Int32),
            "int16" => Ok(Self::Int16),
            "int8" => Ok(Self::Int8),
            other => Err(format!("unknown storage type '{other}'")),
        }
    }
}

/// The numeric format the kernel computes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArithmeticType {
    Fp32,
    Fp16,
    Fp64,
    Int32,
    Int16,
    Int8,
    Bf16,
}

impl ArithmeticType {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fp32 => "fp32",
            Self::Fp16 => "fp16",
            Self::Fp64 => "fp64",
            Self::Int32 => "int32",
            Self::Int16 => "int16",
            Self::Int8 => "int8",
            Self::Bf16 => "bf16",
        }
    }

    /// Integer formats report GIOPS rather than GFLOPS.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int32 | Self::Int16 | Self::Int8)
    }
}

impl FromStr for ArithmeticType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fp32" => Ok(Self::Fp32),
            "fp16" => Ok(Self::Fp16),
            "fp64" => Ok(Self::Fp64),
            "int32" => Ok(Self::Int32),
            "int16" => Ok(Self::Int16),
            "int8" => Ok(Self::Int8),
            "bf16" => Ok(Self::Bf16),
            other => Err(format!("unknown arithmetic type '{other}'")),
        }
    }
}

/// Scalar lanes processed per invocation element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PackingType {
    Scalar,
    Vec4,
    Vec8,
    /// One cooperative-matrix tile per subgroup.
    Matrix,
}

impl PackingType {
    /// Lane width for vector packings; `None` for matrix (tile-shaped).
    #[must_use]
    pub const fn width(self) -> Option<u32> {
        match self {
            Self::Scalar => Some(1),
            Self::Vec4 => Some(4),
            Self::Vec8 => Some(8),
            Self::Matrix => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scalar => "1",
            Self::Vec4 => "4",
            Self::Vec8 => "8",
            Self::Matrix => "matrix",
        }
    }
}

impl FromStr for PackingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "scalar" => Ok(Self::Scalar),
            "4" | "vec4" => Ok(Self::Vec4),
            "8" | "vec8" => Ok(Self::Vec8),
            "matrix" => Ok(Self::Matrix),
            other => Err(format!("unknown packing type '{other}'")),
        }
    }
}

impl fmt::Display for PackingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Caller-supplied parameters for one benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRequest {
    /// Initial inner-loop repetition count (specialization constant).
    pub loop_count: u32,
    /// Requested buffer cap in MiB.
    pub count_mb: u64,
    /// Timed command submissions per calibration iteration.
    pub cmd_loop: u32,
    pub storage: StorageType,
    pub arithmetic: ArithmeticType,
    pub packing: PackingType,
}

impl BenchmarkRequest {
    /// Request with default loop/buffer/submission parameters.
    #[must_use]
    pub const fn new(
        storage: StorageType,
        arithmetic: ArithmeticType,
        packing: PackingType,
    ) -> Self {
        Self {
            loop_count: DEFAULT_LOOP,
            count_mb: DEFAULT_COUNT_MB,
            cmd_loop: DEFAULT_CMD_LOOP,
            storage,
            arithmetic,
            packing,
        }
    }

    /// Configuration label for tables, e.g. `fp32-4` or `fp16-matrix`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}-{}", self.arithmetic.label(), self.packing.label())
    }
}
