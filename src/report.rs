// SPDX-License-Identifier: AGPL-3.0-only

//! Result reporting: human-readable summary tables and machine-readable JSON.
//!
//! A zero reading means the configuration is unsupported on the measured
//! device, never that it ran at zero speed, so the table prints it as a
//! dash.

use serde::Serialize;

use crate::capability::DeviceCapabilities;
use crate::request::{ArithmeticType, BenchmarkRequest, PackingType, StorageType};

/// Device identity block captured once per run.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSummary {
    pub adapter_name: String,
    pub features: String,
    pub subgroup_size: u32,
}

impl DeviceSummary {
    #[must_use]
    pub fn from_caps(adapter_name: &str, caps: &DeviceCapabilities) -> Self {
        Self {
            adapter_name: adapter_name.to_owned(),
            features: caps.feature_summary(),
            subgroup_size: caps.subgroup_size,
        }
    }
}

/// One measured configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResult {
    pub storage: String,
    pub arithmetic: String,
    pub packing: String,
    /// GFLOPS for float arithmetic, GIOPS for integer. 0.0 = unsupported.
    pub gops: f64,
    pub unit: &'static str,
}

impl ConfigResult {
    #[must_use]
    pub fn new(request: &BenchmarkRequest, gops: f64) -> Self {
        let unit = if request.arithmetic.is_integer() {
            "GIOPS"
        } else {
            "GFLOPS"
        };
        Self {
            storage: request.storage.label().to_owned(),
            arithmetic: request.arithmetic.label().to_owned(),
            packing: request.packing.label().to_owned(),
            gops,
            unit,
        }
    }
}

/// Full report for one device run.
#[derive(Debug, Clone, Serialize)]
pub struct PeakReport {
    pub device: DeviceSummary,
    pub results: Vec<ConfigResult>,
}

impl PeakReport {
    #[must_use]
    pub fn new(device: DeviceSummary) -> Self {
        Self {
            device,
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, request: &BenchmarkRequest, gops: f64) {
        self.results.push(ConfigResult::new(request, gops));
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error on serialization failure.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Print the summary table to stdout.
    pub fn print_summary(&self) {
        println!();
        println!("══════════════════════════════════════════════════════════════");
        println!("  PEAK COMPUTE — {}", self.device.adapter_name);
        println!("  features: {}", self.device.features);
        println!("  subgroup: {}", self.device.subgroup_size);
        println!("══════════════════════════════════════════════════════════════");
        println!();
        println!(
            "  {:<8} {:<6} {:<8} {:>12}",
            "Storage", "Arith", "Packing", "Peak"
        );
        println!("  {}", "─".repeat(40));
        for r in &self.results {
            let value = if r.gops > 0.0 {
                format!("{:.2} {}", r.gops, r.unit)
            } else {
                "—".to_owned()
            };
            println!(
                "  {:<8} {:<6} {:<8} {:>12}",
                r.storage, r.arithmetic, r.packing, value
            );
        }
        println!("  {}", "─".repeat(40));
        println!("  — = not supported on this device");
        println!();
    }
}

/// The standard configuration matrix, in report order.
///
/// Cooperative-matrix rows are appended by the caller only when the device
/// reports the extension, mirroring how unsupported rows print as dashes.
#[must_use]
pub fn standard_matrix() -> Vec<BenchmarkRequest> {
    let vector_packings = [PackingType::Scalar, PackingType::Vec4, PackingType::Vec8];
    let configs: [(StorageType, ArithmeticType); 7] = [
        (StorageType::Fp32, ArithmeticType::Fp32),
        (StorageType::Fp16Packed, ArithmeticType::Fp32),
        (StorageType::Fp16, ArithmeticType::Fp16),
        (StorageType::Fp64, ArithmeticType::Fp64),
        (StorageType::Int32, ArithmeticType::Int32),
        (StorageType::Int16, ArithmeticType::Int16),
        (StorageType::Int8, ArithmeticType::Int8),
    ];
    let mut requests = Vec::new();
    for (storage, arithmetic) in configs {
        for packing in vector_packings {
            requests.push(BenchmarkRequest::new(storage, arithmetic, packing));
        }
    }
    requests
}
