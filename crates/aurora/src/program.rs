//! The aurora shader program: GLSL sources and the uniform block they share.
//!
//! The uniform block layout must match [`UniformBlock`] byte for byte:
//!
//! ```text
//!   offset  0  vec4  color_stops[3]   (rgb used, w = 1)
//!   offset 48  vec2  resolution       (pixels)
//!   offset 56  float time
//!   offset 60  float amplitude
//!   offset 64  float blend
//!   offset 68  float opacity
//!   offset 72  vec2  padding
//! ```

use std::borrow::Cow;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::ShaderStage;

use crate::color::{Rgb, STOP_COUNT};
use crate::surface::MountError;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UniformBlock {
    pub color_stops: [[f32; 4]; STOP_COUNT],
    pub resolution: [f32; 2],
    pub time: f32,
    pub amplitude: f32,
    pub blend: f32,
    pub opacity: f32,
    pub _padding: [f32; 2],
}

impl UniformBlock {
    pub fn new(width: u32, height: u32, stops: &[Rgb; STOP_COUNT], amplitude: f32, blend: f32) -> Self {
        let mut block = Self::zeroed();
        block.set_resolution(width, height);
        block.set_color_stops(stops);
        block.amplitude = amplitude;
        block.blend = blend;
        block
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.resolution = [width as f32, height as f32];
    }

    pub fn set_color_stops(&mut self, stops: &[Rgb; STOP_COUNT]) {
        for (slot, stop) in self.color_stops.iter_mut().zip(stops) {
            *slot = stop.to_vec4();
        }
    }

    pub fn color_stops(&self) -> [Rgb; STOP_COUNT] {
        self.color_stops.map(|[r, g, b, _]| Rgb([r, g, b]))
    }
}

/// Vertex + fragment GLSL pair compiled for every mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl Default for ProgramSource {
    fn default() -> Self {
        Self::aurora()
    }
}

impl ProgramSource {
    /// The built-in aurora effect.
    pub fn aurora() -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER_GLSL),
            fragment: Cow::Borrowed(FRAGMENT_SHADER_GLSL),
        }
    }

    /// Uses the built-in vertex stage with a custom fragment stage. The
    /// fragment must declare the same `AuroraParams` uniform block.
    pub fn with_fragment(fragment: impl Into<Cow<'static, str>>) -> Self {
        Self {
            vertex: Cow::Borrowed(VERTEX_SHADER_GLSL),
            fragment: fragment.into(),
        }
    }

    pub fn from_fragment_file(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let fragment = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fragment shader at {}", path.display()))?;
        Ok(Self::with_fragment(fragment))
    }

    /// Parses and validates both stages with naga so compile errors surface
    /// with a readable message before any GPU object is created.
    pub fn validate(&self) -> Result<(), MountError> {
        validate_stage(&self.vertex, ShaderStage::Vertex)?;
        validate_stage(&self.fragment, ShaderStage::Fragment)
    }
}

fn validate_stage(source: &str, stage: ShaderStage) -> Result<(), MountError> {
    let module = glsl::Frontend::default()
        .parse(&glsl::Options::from(stage), source)
        .map_err(|err| MountError::ShaderCompile(format!("{stage:?} stage: {err}")))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| MountError::ShaderCompile(format!("{stage:?} stage: {err}")))?;
    Ok(())
}

/// Full-screen triangle; no transform, no vertex buffers.
const VERTEX_SHADER_GLSL: &str = r"#version 450

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    float x = float(int(vertex_index & 1u) * 4 - 1);
    float y = float(int(vertex_index >> 1u) * 4 - 1);
    gl_Position = vec4(x, y, 0.0, 1.0);
}
";

/// Simplex-noise aurora band over a three-stop horizontal colour ramp.
///
/// Output is premultiplied: colour is scaled by the smoothstep mask and both
/// are scaled by the compositing opacity.
const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform AuroraParams {
    vec4 color_stops[3];
    vec2 resolution;
    float time;
    float amplitude;
    float blend;
    float opacity;
    vec2 padding;
} ubo;

const float ALPHA_MIDPOINT = 0.20;

vec3 permute(vec3 x) {
    return mod(((x * 34.0) + vec3(1.0)) * x, vec3(289.0));
}

float snoise(vec2 v) {
    vec4 C = vec4(
        0.211324865405187, 0.366025403784439,
        -0.577350269189626, 0.024390243902439
    );
    vec2 i = floor(v + vec2(dot(v, C.yy)));
    vec2 x0 = v - i + vec2(dot(i, C.xx));
    float upper = step(x0.y, x0.x);
    vec2 i1 = vec2(upper, 1.0 - upper);
    vec4 x12 = x0.xyxy + C.xxzz;
    x12 = vec4(x12.xy - i1, x12.zw);
    i = mod(i, vec2(289.0));

    vec3 p = permute(
        permute(vec3(i.y) + vec3(0.0, i1.y, 1.0))
        + vec3(i.x) + vec3(0.0, i1.x, 1.0)
    );

    vec3 m = max(
        vec3(0.5) - vec3(dot(x0, x0), dot(x12.xy, x12.xy), dot(x12.zw, x12.zw)),
        vec3(0.0)
    );
    m = m * m;

    vec3 x = 2.0 * fract(p * C.www) - vec3(1.0);
    vec3 h = abs(x) - vec3(0.5);
    vec3 ox = floor(x + vec3(0.5));
    vec3 a0 = x - ox;
    m = m * (vec3(1.79284291400159) - 0.85373472095314 * (a0 * a0 + h * h));

    vec3 g = vec3(
        a0.x * x0.x + h.x * x0.y,
        a0.y * x12.x + h.y * x12.y,
        a0.z * x12.z + h.z * x12.w
    );
    return 130.0 * dot(m, g);
}

vec3 color_ramp(float factor) {
    vec3 first = ubo.color_stops[0].xyz;
    vec3 middle = ubo.color_stops[1].xyz;
    vec3 last = ubo.color_stops[2].xyz;
    if (factor < 0.5) {
        return mix(first, middle, vec3(factor / 0.5));
    }
    return mix(middle, last, vec3((factor - 0.5) / 0.5));
}

void main() {
    // Bottom-left origin so the band sits along the top of the surface.
    vec2 frag = vec2(gl_FragCoord.x, ubo.resolution.y - gl_FragCoord.y);
    vec2 uv = frag / ubo.resolution;

    vec3 ramp = color_ramp(uv.x);

    float height = snoise(vec2(uv.x * 2.0 + ubo.time * 0.1, ubo.time * 0.25)) * 0.5 * ubo.amplitude;
    height = exp(height);
    height = uv.y * 2.0 - height + 0.2;
    float intensity = 0.6 * height;

    float alpha = smoothstep(
        ALPHA_MIDPOINT - ubo.blend * 0.5,
        ALPHA_MIDPOINT + ubo.blend * 0.5,
        intensity
    );
    vec3 color = intensity * ramp;

    out_color = vec4(color * alpha, alpha) * ubo.opacity;
}
";
