/// Easing applied to the visibility crossfade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossfadeCurve {
    Linear,
    Smoothstep,
    /// Matches the CSS `ease-in-out` feel of a page-level opacity transition.
    #[default]
    EaseInOut,
}

/// Anti-aliasing policy for the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Antialiasing {
    /// Pick the highest sample count supported by the surface format.
    #[default]
    Auto,
    /// Disable MSAA and render directly into the swapchain.
    Off,
    /// Request a specific MSAA sample count (clamped to what the device supports).
    Samples(u32),
}

/// Adapter selection hint forwarded to wgpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    /// Integrated GPUs are plenty for a background effect.
    #[default]
    Low,
    High,
}

/// Options for creating the GPU context behind a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceOptions {
    pub antialiasing: Antialiasing,
    pub power: GpuPowerPreference,
}
