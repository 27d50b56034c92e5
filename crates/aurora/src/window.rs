//! Native window host: a transparent winit window whose client area is the
//! aurora container.
//!
//! The event loop is the only thread. Redraw events pump frame callbacks,
//! `AboutToWait` fires due timers, polls the optional parameter feed and
//! picks the next wake-up.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use tracing::{debug, info, trace};

use crate::gpu::WindowSurfaceFactory;
use crate::host::{Container, HostBinding};
use crate::lifecycle::LifecycleState;
use crate::params::RenderParameters;
use crate::program::ProgramSource;
use crate::types::{CrossfadeCurve, SurfaceOptions};

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Activate as soon as the window exists.
    pub start_active: bool,
    pub surface: SurfaceOptions,
    pub curve: CrossfadeCurve,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Aurora".to_string(),
            width: 1280,
            height: 720,
            start_active: true,
            surface: SurfaceOptions::default(),
            curve: CrossfadeCurve::default(),
        }
    }
}

/// Source of parameter updates polled from the event loop, such as a
/// watched config file.
pub trait ParameterFeed {
    /// Returns new parameters when they changed since the last poll.
    fn poll(&mut self) -> Option<RenderParameters>;

    /// When the feed next wants to be polled.
    fn next_poll(&self) -> Option<Instant> {
        None
    }
}

impl Container for Arc<Window> {
    fn bounds(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

/// Opens the window and runs until it is closed or Escape is pressed.
pub fn run_window(
    config: WindowConfig,
    program: ProgramSource,
    params: RenderParameters,
    mut feed: Option<Box<dyn ParameterFeed>>,
) -> Result<()> {
    let event_loop = EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.width.max(1), config.height.max(1)))
        .with_transparent(true)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let factory = WindowSurfaceFactory::new(Arc::clone(&window), config.surface);
    let mut binding = HostBinding::new(factory, program, Arc::clone(&window), params)
        .with_curve(config.curve);

    let origin = Instant::now();
    if config.start_active {
        binding.set_active(true);
    }
    if binding.wants_frame() {
        window.request_redraw();
    }
    info!(
        width = config.width,
        height = config.height,
        active = config.start_active,
        "aurora window ready (space toggles, escape quits)"
    );

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == binding.container().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    binding.unmount();
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state != ElementState::Pressed || event.repeat {
                        return;
                    }
                    match event.logical_key {
                        Key::Named(NamedKey::Escape) => {
                            binding.unmount();
                            elwt.exit();
                        }
                        Key::Named(NamedKey::Space) => {
                            let activate = !binding.is_active();
                            debug!(activate, "toggling aurora");
                            binding.pump_timers(origin.elapsed());
                            binding.set_active(activate);
                            if binding.wants_frame() {
                                binding.container().request_redraw();
                            }
                        }
                        _ => {}
                    }
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    binding.container_resized();
                }
                WindowEvent::RedrawRequested => {
                    binding.pump(origin.elapsed());
                }
                _ => {}
            }
        }
        Event::AboutToWait => {
            if let Some(update) = feed.as_mut().and_then(|feed| feed.poll()) {
                debug!("applying updated parameters");
                binding.set_parameters(update);
            }

            binding.pump_timers(origin.elapsed());

            if binding.wants_frame() {
                binding.container().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
                return;
            }

            let timer = binding.next_deadline().map(|deadline| origin + deadline);
            let poll = feed.as_ref().and_then(|feed| feed.next_poll());
            match earliest(timer, poll) {
                Some(deadline) => {
                    trace!(
                        wait_ms = deadline.saturating_duration_since(Instant::now()).as_millis(),
                        state = ?binding.state(),
                        "idle until next deadline"
                    );
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                }
                None => {
                    trace!(state = ?binding.state(), "idle");
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
        }
        Event::LoopExiting => {
            if binding.state() != LifecycleState::Unmounted {
                binding.unmount();
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn earliest_prefers_the_sooner_deadline() {
        let now = Instant::now();
        let later = now + Duration::from_millis(5);
        assert_eq!(earliest(Some(later), Some(now)), Some(now));
        assert_eq!(earliest(None, Some(later)), Some(later));
        assert_eq!(earliest(None, None), None);
    }
}
