// SPDX-License-Identifier: AGPL-3.0-only

//! wgpu compute substrate.
//!
//! Creates a wgpu device, probes its capabilities at runtime, and implements
//! [`ComputeDevice`] on top of it: storage-buffer allocation with a byte
//! budget, WGSL pipeline specialisation through override constants, and
//! timed queue submissions.
//!
//! ## Adapter selection
//!
//! Set `PEAKFORGE_GPU_ADAPTER` to target a specific GPU:
//!
//! | Value | Behavior |
//! |-------|----------|
//! | `auto` / *(unset)* | First discrete GPU, then any non-CPU adapter |
//! | `0`, `1`, … | Select adapter by enumeration index |
//! | substring | Case-insensitive name match (e.g. `"titan"`, `"4070"`) |
//!
//! Use [`GpuSubstrate::enumerate_adapters`] to list available GPUs.
//!
//! ## What WGSL can express
//!
//! fp32, fp16, fp64, and int32 vector kernels compile here. int8, int16,
//! bf16, and cooperative-matrix variants need SPIR-V-level extensions that
//! WGSL has no surface for, so this substrate reports those capabilities as
//! absent and their requests resolve to the unsupported sentinel.

mod adapter;

pub use adapter::AdapterInfo;

use std::collections::HashMap;
use std::time::Instant;

use crate::capability::{DeviceCapabilities, DeviceClass};
use crate::device::ComputeDevice;
use crate::error::PeakError;
use crate::kernel::{source_for, KernelSource, KernelVariant, SpecConstants};

/// Split workgroup count into (x, y, 1) for 2D dispatch when x > 65535.
/// Shaders linearize via `gid.x + gid.y * num_workgroups.x * WG_SIZE`.
#[must_use]
pub fn split_workgroups(total: u32) -> (u32, u32, u32) {
    if total <= 65535 {
        (total, 1, 1)
    } else {
        let y = total.div_ceil(65535);
        let x = total.div_ceil(y);
        (x, y, 1)
    }
}

/// Production [`ComputeDevice`] backed by a wgpu device and queue.
#[must_use]
pub struct GpuSubstrate {
    pub adapter_name: String,
    device: wgpu::Device,
    queue: wgpu::Queue,
    caps: DeviceCapabilities,
    epoch: Instant,
}

/// Byte-accounted allocation scope. The budget is the probed heap size;
/// exceeding it fails the allocation instead of provoking a device loss.
pub struct BufferArena {
    bytes_in_use: u64,
    budget: u64,
}

impl GpuSubstrate {
    /// Create the substrate on the selected adapter, requesting optional
    /// precision features only when the adapter offers them.
    ///
    /// # Errors
    ///
    /// Returns [`PeakError::DeviceAbsent`] when no adapter is found and
    /// [`PeakError::Unsupported`] when device creation fails.
    pub async fn new() -> Result<Self, PeakError> {
        let selected = adapter::select_adapter()?;
        let adapter_info = selected.get_info();
        let adapter_features = selected.features();

        let mut required_features = wgpu::Features::empty();
        for optional in [
            wgpu::Features::SHADER_F64,
            wgpu::Features::SHADER_F16,
            wgpu::Features::SUBGROUP,
        ] {
            if adapter_features.contains(optional) {
                required_features |= optional;
            }
        }

        let adapter_limits = selected.limits();
        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: adapter_limits
                .max_storage_buffer_binding_size
                .min(512 * 1024 * 1024),
            max_buffer_size: adapter_limits.max_buffer_size.min(1024 * 1024 * 1024),
            max_compute_workgroup_size_x: adapter_limits.max_compute_workgroup_size_x,
            max_compute_invocations_per_workgroup: adapter_limits
                .max_compute_invocations_per_workgroup,
            min_subgroup_size: adapter_limits.min_subgroup_size,
            max_subgroup_size: adapter_limits.max_subgroup_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = selected
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("peakforge device"),
                    required_features,
                    required_limits: required_limits.clone(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| PeakError::Unsupported(format!("device creation: {e}")))?;

        let caps = probe_capabilities(&adapter_info, required_features, &required_limits);

        Ok(Self {
            adapter_name: adapter_info.name,
            device,
            queue,
            caps,
            epoch: Instant::now(),
        })
    }

    /// Enumerate all available GPU adapters.
    #[must_use]
    pub fn enumerate_adapters() -> Vec<AdapterInfo> {
        adapter::enumerate_adapters()
    }

    /// Print all available adapters to stdout.
    pub fn print_available_adapters() {
        let adapters = Self::enumerate_adapters();
        println!("  Available GPU adapters:");
        for info in &adapters {
            println!("    {info}");
        }
        if adapters.is_empty() {
            println!("    (none found)");
        }
    }

    /// Print device capabilities.
    pub fn print_info(&self) {
        println!("  GPU: {}", self.adapter_name);
        println!("  Features: {}", self.caps.feature_summary());
    }
}

fn probe_capabilities(
    info: &wgpu::AdapterInfo,
    features: wgpu::Features,
    limits: &wgpu::Limits,
) -> DeviceCapabilities {
    let has_f16 = features.contains(wgpu::Features::SHADER_F16);
    let subgroup_size = if features.contains(wgpu::Features::SUBGROUP) {
        // min_subgroup_size is the size every dispatch is guaranteed at least.
        if limits.min_subgroup_size > 0 {
            limits.min_subgroup_size
        } else {
            32
        }
    } else {
        32
    };
    let device_class = match info.device_type {
        wgpu::DeviceType::IntegratedGpu | wgpu::DeviceType::Cpu => DeviceClass::Integrated,
        _ => DeviceClass::Discrete,
    };
    DeviceCapabilities {
        fp16_storage: has_f16,
        fp16_arithmetic: has_f16,
        fp64_shader: features.contains(wgpu::Features::SHADER_F64),
        int8_arithmetic: false,
        int8_dot_product: false,
        bf16_arithmetic: false,
        bf16_dot_product: false,
        bf16_cooperative_matrix: false,
        cooperative_matrix: None,
        coop_mat_combos: Vec::new(),
        subgroup_size,
        device_class,
        heap_budget_bytes: limits.max_buffer_size,
    }
}

impl ComputeDevice for GpuSubstrate {
    type Allocator = BufferArena;
    type Buffer = wgpu::Buffer;
    type Pipeline = wgpu::ComputePipeline;

    fn capabilities(&self) -> DeviceCapabilities {
        self.caps.clone()
    }

    fn acquire_allocator(&self) -> BufferArena {
        BufferArena {
            bytes_in_use: 0,
            budget: self.caps.heap_budget_bytes,
        }
    }

    fn release_allocator(&self, allocator: BufferArena) {
        // wgpu reclaims buffers on drop; the arena only tracks accounting.
        drop(allocator);
    }

    fn allocate_buffer(
        &self,
        bytes: u64,
        allocator: &mut BufferArena,
    ) -> Result<wgpu::Buffer, PeakError> {
        let requested = allocator.bytes_in_use + bytes;
        if requested > allocator.budget {
            return Err(PeakError::Allocation(format!(
                "{requested} bytes exceeds {} byte heap budget",
                allocator.budget
            )));
        }
        allocator.bytes_in_use = requested;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("peakforge storage"),
            size: bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        // Seed a nonzero bit pattern (1.0f32 / fp16 pair) so drivers cannot
        // fold the FMA chains over all-zero inputs.
        let words = vec![0x3f80_0000u32; usize::try_from(bytes / 4).unwrap_or(0)];
        if !words.is_empty() {
            self.queue
                .write_buffer(&buffer, 0, bytemuck::cast_slice(&words));
        }
        Ok(buffer)
    }

    fn build_pipeline(
        &self,
        kernel: &KernelVariant,
        constants: &SpecConstants,
        local_size: u32,
    ) -> Result<wgpu::ComputePipeline, PeakError> {
        let source = match source_for(kernel, local_size) {
            Some(KernelSource::Wgsl(wgsl)) => wgsl,
            Some(KernelSource::Glsl(_)) => {
                return Err(PeakError::KernelBuild(format!(
                    "{:?} needs SPIR-V extensions wgpu cannot compile",
                    kernel.key
                )));
            }
            None => {
                return Err(PeakError::KernelBuild(format!(
                    "no kernel source for {:?}",
                    kernel.key
                )));
            }
        };

        let shader_module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("peakforge kernel"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let overrides: HashMap<String, f64> = [
            ("count".to_owned(), f64::from(constants.count)),
            ("loop_count".to_owned(), f64::from(constants.loop_count)),
        ]
        .into();

        Ok(self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("peakforge kernel"),
                layout: None,
                module: &shader_module,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &overrides,
                    ..Default::default()
                },
                cache: None,
            }))
    }

    fn submit_dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        buffers: [&wgpu::Buffer; 3],
        invocations: u64,
        local_size: u32,
    ) -> Result<(), PeakError> {
        let layout = pipeline.get_bind_group_layout(0);
        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buf)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buf.as_entire_binding(),
            })
            .collect();
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bind_group"),
            layout: &layout,
            entries: &entries,
        });

        let groups = invocations.div_ceil(u64::from(local_size.max(1)));
        let groups = u32::try_from(groups)
            .map_err(|_| PeakError::Submission(format!("{groups} workgroups overflow u32")))?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("dispatch"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("compute_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let (wx, wy, wz) = split_workgroups(groups);
            pass.dispatch_workgroups(wx, wy, wz);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn wait(&self) -> Result<(), PeakError> {
        self.device.poll(wgpu::Maintain::Wait);
        Ok(())
    }

    fn now_micros(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1.0e6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_workgroups_small_passthrough() {
        assert_eq!(split_workgroups(1), (1, 1, 1));
        assert_eq!(split_workgroups(65535), (65535, 1, 1));
    }

    #[test]
    fn split_workgroups_covers_all_groups() {
        for total in [65536u32, 100_000, 1 << 22] {
            let (x, y, z) = split_workgroups(total);
            assert_eq!(z, 1);
            assert!(x <= 65535 && y <= 65535);
            assert!(u64::from(x) * u64::from(y) >= u64::from(total));
        }
    }
}
