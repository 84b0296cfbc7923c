// SPDX-License-Identifier: AGPL-3.0-only

//! Peak compute throughput benchmark over the standard configuration matrix.
//!
//! Runs dependent-FMA-chain kernels for every storage × arithmetic ×
//! packing configuration the device supports and prints the best GFLOPS /
//! GIOPS per row. Unsupported configurations print as a dash.
//!
//! Usage:
//!   peakforge [loop_count] [count_mb] [cmd_loop]
//!
//! Adapter selection:
//!   PEAKFORGE_GPU_ADAPTER=auto|<index>|<name substring>  cargo run --release
//!
//! Set `PEAKFORGE_JSON=1` to also emit the machine-readable report.

use peakforge::gpu::GpuSubstrate;
use peakforge::report::{standard_matrix, DeviceSummary, PeakReport};
use peakforge::request::{ArithmeticType, BenchmarkRequest, PackingType, StorageType};
use peakforge::{measure_peak, run_benchmark, ComputeDevice, DeviceCapabilities};

struct Args {
    loop_count: u32,
    count_mb: u64,
    cmd_loop: u32,
}

fn parse_args() -> Args {
    let mut args = Args {
        loop_count: peakforge::request::DEFAULT_LOOP,
        count_mb: peakforge::request::DEFAULT_COUNT_MB,
        cmd_loop: peakforge::request::DEFAULT_CMD_LOOP,
    };
    let positional: Vec<String> = std::env::args().skip(1).collect();
    if let Some(v) = positional.first().and_then(|s| s.parse().ok()) {
        args.loop_count = v;
    }
    if let Some(v) = positional.get(1).and_then(|s| s.parse().ok()) {
        args.count_mb = v;
    }
    if let Some(v) = positional.get(2).and_then(|s| s.parse().ok()) {
        args.cmd_loop = v;
    }
    args
}

/// The full request list for this device: the standard vector matrix plus
/// the bf16 and cooperative-matrix rows the device can express.
fn request_list(args: &Args, caps: &DeviceCapabilities) -> Vec<BenchmarkRequest> {
    let mut requests = standard_matrix();
    if caps.bf16_arithmetic {
        for packing in [PackingType::Scalar, PackingType::Vec4, PackingType::Vec8] {
            requests.push(BenchmarkRequest::new(
                StorageType::Fp16,
                ArithmeticType::Bf16,
                packing,
            ));
        }
    }
    if caps.cooperative_matrix.is_some() {
        requests.push(BenchmarkRequest::new(
            StorageType::Fp16,
            ArithmeticType::Fp16,
            PackingType::Matrix,
        ));
        requests.push(BenchmarkRequest::new(
            StorageType::Int8,
            ArithmeticType::Int8,
            PackingType::Matrix,
        ));
        if caps.bf16_cooperative_matrix {
            requests.push(BenchmarkRequest::new(
                StorageType::Fp16,
                ArithmeticType::Bf16,
                PackingType::Matrix,
            ));
        }
    }
    for request in &mut requests {
        request.loop_count = args.loop_count;
        request.count_mb = args.count_mb;
        request.cmd_loop = args.cmd_loop;
    }
    requests
}

fn emit_json(report: &PeakReport) {
    if std::env::var("PEAKFORGE_JSON").as_deref() == Ok("1") {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("JSON serialization failed: {e}"),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = parse_args();

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  peakforge — GPU peak compute throughput                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    GpuSubstrate::print_available_adapters();
    println!();
    println!("  loop:     {:>6}", args.loop_count);
    println!("  count:    {:>6} MB", args.count_mb);
    println!("  cmd_loop: {:>6}", args.cmd_loop);
    println!();

    let substrate = match GpuSubstrate::new().await {
        Ok(s) => Some(s),
        Err(e) => {
            println!("  No usable compute device: {e}");
            None
        }
    };

    let caps = substrate
        .as_ref()
        .map_or_else(DeviceCapabilities::default, GpuSubstrate::capabilities);
    let adapter_name = substrate
        .as_ref()
        .map_or("(no device)", |s| s.adapter_name.as_str());

    if let Some(ref s) = substrate {
        s.print_info();
        println!();
    }

    let mut report = PeakReport::new(DeviceSummary::from_caps(adapter_name, &caps));
    for request in request_list(&args, &caps) {
        let gops = match substrate.as_ref() {
            Some(s) => measure_peak(s, &request),
            None => run_benchmark::<GpuSubstrate>(None, &request),
        };
        report.add(&request, gops);
    }

    report.print_summary();
    emit_json(&report);
}
