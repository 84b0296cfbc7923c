// SPDX-License-Identifier: AGPL-3.0-only

//! GPU adapter discovery and selection.
//!
//! Runtime capability probing — no hardcoded GPU assumptions. The adapter
//! is selected by environment variable or auto-detected with a preference
//! for discrete hardware.

/// Summary of a discovered GPU adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Enumeration index (stable within a single run).
    pub index: usize,
    /// Adapter name as reported by the driver.
    pub name: String,
    /// Driver name (e.g. `"NVIDIA"`, `"NVK"`, `"radv"`).
    pub driver: String,
    /// Whether `SHADER_F16` is supported.
    pub has_f16: bool,
    /// Whether `SHADER_F64` is supported.
    pub has_f64: bool,
    /// Adapter device type (discrete, integrated, software, etc.).
    pub device_type: wgpu::DeviceType,
}

impl std::fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut precision = vec!["f32"];
        if self.has_f16 {
            precision.push("f16");
        }
        if self.has_f64 {
            precision.push("f64");
        }
        let kind = match self.device_type {
            wgpu::DeviceType::DiscreteGpu => "discrete",
            wgpu::DeviceType::IntegratedGpu => "integrated",
            wgpu::DeviceType::VirtualGpu => "virtual",
            wgpu::DeviceType::Cpu => "cpu",
            wgpu::DeviceType::Other => "other",
        };
        write!(
            f,
            "[{}] {} ({}, {}, {})",
            self.index,
            self.name,
            self.driver,
            kind,
            precision.join("+")
        )
    }
}

/// Create a wgpu instance with the backend configured via `PEAKFORGE_WGPU_BACKEND`.
pub fn create_instance() -> wgpu::Instance {
    let backends = match std::env::var("PEAKFORGE_WGPU_BACKEND").as_deref() {
        Ok("vulkan") => wgpu::Backends::VULKAN,
        Ok("metal") => wgpu::Backends::METAL,
        Ok("dx12") => wgpu::Backends::DX12,
        _ => wgpu::Backends::all(),
    };
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

/// Enumerate all available GPU adapters.
///
/// Returns a summary for each adapter including name, driver, and shader
/// precision support. Use the `index` field with
/// `PEAKFORGE_GPU_ADAPTER=<index>` to target a specific GPU.
#[must_use]
pub fn enumerate_adapters() -> Vec<AdapterInfo> {
    let instance = create_instance();
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .into_iter()
        .enumerate()
        .map(|(i, adapter)| {
            let info = adapter.get_info();
            let features = adapter.features();
            AdapterInfo {
                index: i,
                name: info.name.clone(),
                driver: info.driver.clone(),
                has_f16: features.contains(wgpu::Features::SHADER_F16),
                has_f64: features.contains(wgpu::Features::SHADER_F64),
                device_type: info.device_type,
            }
        })
        .collect()
}

/// Select an adapter based on the `PEAKFORGE_GPU_ADAPTER` environment
/// variable. Falls back to auto-detection (first discrete GPU, then any
/// non-CPU adapter).
///
/// # Errors
///
/// Returns [`crate::error::PeakError::DeviceAbsent`] if no adapter is found.
pub fn select_adapter() -> Result<wgpu::Adapter, crate::error::PeakError> {
    let selector = std::env::var("PEAKFORGE_GPU_ADAPTER")
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    let instance = create_instance();
    let adapters: Vec<wgpu::Adapter> = instance.enumerate_adapters(wgpu::Backends::all());
    if adapters.is_empty() {
        return Err(crate::error::PeakError::DeviceAbsent);
    }

    if selector.is_empty() || selector == "auto" {
        auto_select(adapters)
    } else if let Ok(idx) = selector.parse::<usize>() {
        select_by_index_or_name(adapters, idx, &selector)
    } else {
        select_by_name(adapters, &selector)
    }
}

fn auto_select(adapters: Vec<wgpu::Adapter>) -> Result<wgpu::Adapter, crate::error::PeakError> {
    let mut chosen: Option<wgpu::Adapter> = None;
    let mut fallback: Option<wgpu::Adapter> = None;
    for a in adapters {
        match a.get_info().device_type {
            wgpu::DeviceType::DiscreteGpu => {
                if chosen.is_none() {
                    chosen = Some(a);
                }
            }
            wgpu::DeviceType::Cpu => {}
            _ => {
                if fallback.is_none() {
                    fallback = Some(a);
                }
            }
        }
    }
    chosen
        .or(fallback)
        .ok_or(crate::error::PeakError::DeviceAbsent)
}

fn select_by_index_or_name(
    adapters: Vec<wgpu::Adapter>,
    idx: usize,
    selector: &str,
) -> Result<wgpu::Adapter, crate::error::PeakError> {
    if idx < adapters.len() {
        adapters
            .into_iter()
            .nth(idx)
            .ok_or(crate::error::PeakError::DeviceAbsent)
    } else {
        adapters
            .into_iter()
            .find(|a| a.get_info().name.to_ascii_lowercase().contains(selector))
            .ok_or_else(|| {
                crate::error::PeakError::Unsupported(format!(
                    "no adapter matching '{selector}' (tried as index {idx} and name)"
                ))
            })
    }
}

fn select_by_name(
    adapters: Vec<wgpu::Adapter>,
    selector: &str,
) -> Result<wgpu::Adapter, crate::error::PeakError> {
    adapters
        .into_iter()
        .find(|a| a.get_info().name.to_ascii_lowercase().contains(selector))
        .ok_or_else(|| {
            crate::error::PeakError::Unsupported(format!("no adapter matching '{selector}'"))
        })
}
