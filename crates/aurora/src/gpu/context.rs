use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::TextureFormatFeatureFlags;

use crate::surface::MountError;
use crate::types::{Antialiasing, GpuPowerPreference, SurfaceOptions};

/// Instance, device and configured surface for one mount.
pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub sample_count: u32,
}

impl GpuContext {
    pub(crate) fn new<T>(
        target: T,
        width: u32,
        height: u32,
        options: SurfaceOptions,
    ) -> Result<Self, MountError>
    where
        T: HasDisplayHandle + HasWindowHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(target)
            .map_err(|err| unavailable("failed to create rendering surface", err))?;

        let power_preference = match options.power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| unavailable("failed to find a suitable GPU adapter", err))?;

        let info = adapter.get_info();
        let is_software = info.device_type == wgpu::DeviceType::Cpu;
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        let width = width.clamp(1, max_dimension);
        let height = height.clamp(1, max_dimension);

        let caps = surface.get_capabilities(&adapter);
        let Some(&surface_format) = caps
            .formats
            .iter()
            .find(|format| !format.is_srgb())
            .or_else(|| caps.formats.first())
        else {
            return Err(MountError::ContextUnavailable(
                "surface reports no supported formats".into(),
            ));
        };

        let alpha_mode = if caps.alpha_modes.contains(&wgpu::CompositeAlphaMode::PreMultiplied) {
            wgpu::CompositeAlphaMode::PreMultiplied
        } else {
            let fallback = caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto);
            tracing::warn!(
                ?fallback,
                "compositor does not offer premultiplied alpha; background will not be translucent"
            );
            fallback
        };

        let sample_count = pick_sample_count(&adapter, surface_format, options.antialiasing, is_software);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("aurora device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(limits),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| unavailable("failed to create GPU device", err))?;

        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::AutoVsync)
        };
        tracing::debug!(?present_mode, ?alpha_mode, sample_count, "configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            sample_count,
        })
    }

    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }
}

fn pick_sample_count(
    adapter: &wgpu::Adapter,
    format: wgpu::TextureFormat,
    antialiasing: Antialiasing,
    is_software: bool,
) -> u32 {
    let features = adapter.get_texture_format_features(format);
    let mut supported = features.flags.supported_sample_counts();
    supported.push(1);
    supported.sort_unstable();
    supported.dedup();
    // Without TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES only 1 and 4 are portable.
    supported.retain(|&count| count <= 4);

    let mut count = match antialiasing {
        Antialiasing::Off => 1,
        Antialiasing::Auto => supported.last().copied().unwrap_or(1),
        Antialiasing::Samples(requested) if supported.contains(&requested) => requested,
        Antialiasing::Samples(requested) => {
            let fallback = supported
                .iter()
                .copied()
                .filter(|&count| count <= requested)
                .max()
                .unwrap_or(1);
            tracing::warn!(
                requested,
                fallback,
                ?supported,
                "requested MSAA sample count not supported; falling back"
            );
            fallback
        }
    };

    if count > 1 && !features.flags.contains(TextureFormatFeatureFlags::MULTISAMPLE_RESOLVE) {
        tracing::warn!(?format, "surface format does not support MSAA resolve; disabling MSAA");
        count = 1;
    }
    if count > 1 && is_software {
        tracing::warn!(count, "software rasterizer detected; disabling MSAA for performance");
        count = 1;
    }
    count
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> MountError {
    MountError::ContextUnavailable(format!("{context}: {err}"))
}
