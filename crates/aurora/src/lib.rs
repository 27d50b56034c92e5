//! Procedural aurora background renderer.
//!
//! A simplex-noise aurora band over a three-stop colour ramp, drawn every
//! display refresh into a transparent surface and composited with
//! premultiplied alpha. The crate is organised around a mount lifecycle:
//!
//! ```text
//!   host (window / tests)
//!          │ set_active / set_parameters / container_resized / pump
//!          ▼
//!   HostBinding ──▶ Aurora (Unmounted → FadingIn → Steady → FadingOut)
//!                        │ mount                    │ frame token
//!                        ▼                          ▼
//!              BackendFactory::create ──▶ RenderSurface ◀── AnimationDriver
//!                                               │ UniformBlock
//!                                               ▼
//!                                       GpuBackend::draw
//! ```
//!
//! The GPU is only reached through [`GpuBackend`] and [`BackendFactory`]:
//! [`gpu::WindowSurfaceFactory`] implements them with wgpu, while
//! [`testing::RecordingFactory`] records calls so the whole lifecycle runs
//! headless against the deterministic [`EventClock`].

pub mod color;
mod driver;
pub mod experience;
pub mod gpu;
mod host;
mod lifecycle;
pub mod params;
mod program;
mod runtime;
mod surface;
pub mod testing;
mod timeline;
mod types;
mod window;

pub use color::{decode_hex, resolve_stops, ColorError, ResolvedStops, Rgb, STOP_COUNT};
pub use driver::{effective_time, AnimationDriver, AnimationHandle, TickOutcome};
pub use experience::{Experience, ExperienceHost, ExperienceOptions};
pub use host::{Container, HostBinding};
pub use lifecycle::{Aurora, LifecycleState, FADE_DURATION, FADE_IN_FRAMES};
pub use params::{ParameterCell, ParameterSource, RenderParameters};
pub use program::{ProgramSource, UniformBlock};
pub use runtime::{EventClock, FrameToken, HostRuntime, ListenerId, TimerToken};
pub use surface::{BackendFactory, DrawError, GpuBackend, MountError, RenderSurface};
pub use timeline::FadeEnvelope;
pub use types::{Antialiasing, CrossfadeCurve, GpuPowerPreference, SurfaceOptions};
pub use window::{run_window, ParameterFeed, WindowConfig};
