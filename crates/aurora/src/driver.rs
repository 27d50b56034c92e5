use std::time::Duration;

use tracing::{trace, warn};

use crate::color::{resolve_stops, Rgb, STOP_COUNT};
use crate::params::{default_stops, ParameterSource, RenderParameters, DEFAULT_AMPLITUDE, DEFAULT_BLEND};
use crate::program::UniformBlock;
use crate::runtime::{FrameToken, HostRuntime};
use crate::surface::{DrawError, GpuBackend, RenderSurface};

/// Owner of the single outstanding frame request.
#[derive(Debug, Default)]
pub struct AnimationHandle {
    token: Option<FrameToken>,
}

impl AnimationHandle {
    pub fn schedule(&mut self, runtime: &mut dyn HostRuntime) -> FrameToken {
        if let Some(stale) = self.token.take() {
            runtime.cancel_frame(stale);
        }
        let token = runtime.request_frame();
        self.token = Some(token);
        token
    }

    pub fn owns(&self, token: FrameToken) -> bool {
        self.token == Some(token)
    }

    /// Consumes `token` if it is the outstanding request.
    fn claim(&mut self, token: FrameToken) -> bool {
        if self.owns(token) {
            self.token = None;
            true
        } else {
            false
        }
    }

    /// Cancels the outstanding request, if any. Returns whether one was cancelled.
    pub fn cancel(&mut self, runtime: &mut dyn HostRuntime) -> bool {
        match self.token.take() {
            Some(token) => {
                runtime.cancel_frame(token);
                true
            }
            None => false,
        }
    }

    pub fn pending(&self) -> Option<FrameToken> {
        self.token
    }
}

/// Outcome of one frame callback.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The token was stale or the surface already gone; nothing happened.
    Ignored,
    /// Uniforms were pushed and a frame was submitted.
    Drawn,
    /// Uniforms were pushed but the backend failed to present.
    Failed(DrawError),
}

/// Per-frame loop: one parameter snapshot, one uniform update, one draw.
#[derive(Debug)]
pub struct AnimationDriver {
    handle: AnimationHandle,
    mount_blend: f32,
    stops: [Rgb; STOP_COUNT],
    ticks: u64,
}

impl AnimationDriver {
    /// Captures mount-time fallbacks from `initial` and requests the first frame.
    pub fn start(runtime: &mut dyn HostRuntime, initial: &RenderParameters) -> Self {
        let resolved = resolve_stops(initial.color_stops.as_slice(), &default_stops());
        for (slot, err) in &resolved.errors {
            warn!(slot, %err, "invalid colour stop at mount; using default");
        }
        let mut handle = AnimationHandle::default();
        let token = handle.schedule(runtime);
        trace!(?token, "animation started");
        Self {
            handle,
            mount_blend: initial.blend.unwrap_or(DEFAULT_BLEND),
            stops: resolved.stops,
            ticks: 0,
        }
    }

    /// Uniforms for binding the program right after mount.
    pub fn initial_uniforms(&self, initial: &RenderParameters, width: u32, height: u32) -> UniformBlock {
        UniformBlock::new(
            width,
            height,
            &self.stops,
            initial.amplitude.unwrap_or(DEFAULT_AMPLITUDE),
            self.mount_blend,
        )
    }

    pub fn owns(&self, token: FrameToken) -> bool {
        self.handle.owns(token)
    }

    pub fn is_running(&self) -> bool {
        self.handle.pending().is_some()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one frame callback.
    ///
    /// `timestamp` is the host's frame time; `visibility` is the crossfade
    /// factor applied on top of the parameters' opacity.
    pub fn tick<B: GpuBackend>(
        &mut self,
        token: FrameToken,
        timestamp: Duration,
        params: &dyn ParameterSource,
        visibility: f32,
        surface: &mut RenderSurface<B>,
        runtime: &mut dyn HostRuntime,
    ) -> TickOutcome {
        if !self.handle.claim(token) {
            trace!(?token, "ignoring stale frame");
            return TickOutcome::Ignored;
        }
        if surface.is_destroyed() {
            trace!(?token, "surface gone; animation stops");
            return TickOutcome::Ignored;
        }

        self.handle.schedule(runtime);
        self.ticks += 1;

        let params = params.snapshot();
        let resolved = resolve_stops(params.color_stops.as_slice(), &self.stops);
        for (slot, err) in &resolved.errors {
            warn!(slot, %err, "invalid colour stop; keeping previous colour");
        }
        self.stops = resolved.stops;

        let Some(uniforms) = surface.uniforms_mut() else {
            return TickOutcome::Ignored;
        };
        uniforms.time = effective_time(&params, timestamp);
        uniforms.amplitude = params.amplitude.unwrap_or(1.0);
        uniforms.blend = params.blend.unwrap_or(self.mount_blend);
        uniforms.set_color_stops(&self.stops);
        uniforms.opacity = visibility.clamp(0.0, 1.0) * params.opacity;

        match surface.draw() {
            Ok(true) => TickOutcome::Drawn,
            Ok(false) => TickOutcome::Ignored,
            Err(err) => TickOutcome::Failed(err),
        }
    }

    /// Cancels the outstanding frame. Safe to call more than once.
    pub fn cancel(&mut self, runtime: &mut dyn HostRuntime) -> bool {
        let cancelled = self.handle.cancel(runtime);
        if cancelled {
            trace!(ticks = self.ticks, "animation cancelled");
        }
        cancelled
    }
}

/// Shader time for a frame: the explicit time (or the timestamp in
/// centiseconds) scaled by speed, then by 0.1.
pub fn effective_time(params: &RenderParameters, timestamp: Duration) -> f32 {
    let time = params
        .time
        .unwrap_or_else(|| timestamp.as_secs_f32() * 1000.0 * 0.01);
    let speed = params.speed.unwrap_or(1.0);
    time * speed * 0.1
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::program::ProgramSource;
    use crate::runtime::EventClock;
    use crate::testing::{BackendLog, RecordingBackend};

    struct CountingSource {
        params: RenderParameters,
        reads: Cell<usize>,
    }

    impl ParameterSource for CountingSource {
        fn snapshot(&self) -> RenderParameters {
            self.reads.set(self.reads.get() + 1);
            self.params.clone()
        }
    }

    fn mounted(
        clock: &mut EventClock,
        log: &BackendLog,
        params: &RenderParameters,
    ) -> (AnimationDriver, RenderSurface<RecordingBackend>) {
        let driver = AnimationDriver::start(clock, params);
        let mut surface = RenderSurface::new(RecordingBackend::new(log.clone()), 800, 600);
        surface
            .bind_program(&ProgramSource::aurora(), driver.initial_uniforms(params, 800, 600))
            .unwrap();
        (driver, surface)
    }

    #[test]
    fn effective_time_scales_timestamp_and_speed() {
        let mut params = RenderParameters::default();
        params.speed = None;
        let t = effective_time(&params, Duration::from_millis(1000));
        assert!((t - 1.0).abs() < 1e-5);

        params.speed = Some(0.3);
        let t = effective_time(&params, Duration::from_millis(1000));
        assert!((t - 0.3).abs() < 1e-5);

        params.time = Some(5.0);
        assert!((effective_time(&params, Duration::from_secs(99)) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn tick_reads_parameters_once_and_draws_once() {
        let mut clock = EventClock::new();
        let log = BackendLog::default();
        let params = RenderParameters::default();
        let (mut driver, mut surface) = mounted(&mut clock, &log, &params);
        let source = CountingSource {
            params: params.clone(),
            reads: Cell::new(0),
        };

        let token = clock.take_frames()[0];
        let outcome = driver.tick(token, Duration::from_millis(16), &source, 1.0, &mut surface, &mut clock);
        assert_eq!(outcome, TickOutcome::Drawn);
        assert_eq!(source.reads.get(), 1);
        assert_eq!(log.draws().len(), 1);
        assert!(clock.has_pending_frames());

        let drawn = log.draws()[0];
        assert!((drawn.opacity - 0.3).abs() < 1e-6);
        assert_eq!(drawn.amplitude, 0.5);
        assert_eq!(drawn.blend, 1.2);
        assert_eq!(drawn.resolution, [800.0, 600.0]);
    }

    #[test]
    fn unset_parameters_fall_back_per_tick() {
        let mut clock = EventClock::new();
        let log = BackendLog::default();
        let mount = RenderParameters {
            blend: Some(0.8),
            ..RenderParameters::default()
        };
        let (mut driver, mut surface) = mounted(&mut clock, &log, &mount);
        let live = RenderParameters {
            amplitude: None,
            blend: None,
            ..RenderParameters::default()
        };

        let token = clock.take_frames()[0];
        driver.tick(token, Duration::ZERO, &live, 0.5, &mut surface, &mut clock);
        let drawn = log.draws()[0];
        assert_eq!(drawn.amplitude, 1.0);
        assert_eq!(drawn.blend, 0.8);
        assert!((drawn.opacity - 0.15).abs() < 1e-6);
    }

    #[test]
    fn stale_tokens_and_destroyed_surfaces_are_ignored() {
        let mut clock = EventClock::new();
        let log = BackendLog::default();
        let params = RenderParameters::default();
        let (mut driver, mut surface) = mounted(&mut clock, &log, &params);
        let token = clock.take_frames()[0];

        driver.tick(token, Duration::ZERO, &params, 1.0, &mut surface, &mut clock);
        let replay = driver.tick(token, Duration::ZERO, &params, 1.0, &mut surface, &mut clock);
        assert_eq!(replay, TickOutcome::Ignored);

        let next = clock.take_frames()[0];
        surface.destroy();
        let late = driver.tick(next, Duration::ZERO, &params, 1.0, &mut surface, &mut clock);
        assert_eq!(late, TickOutcome::Ignored);
        assert!(!clock.has_pending_frames());
        assert_eq!(log.draws().len(), 1);
    }

    #[test]
    fn invalid_stops_keep_the_previous_colour() {
        let mut clock = EventClock::new();
        let log = BackendLog::default();
        let params = RenderParameters::default();
        let (mut driver, mut surface) = mounted(&mut clock, &log, &params);
        let before = surface.uniforms().unwrap().color_stops();

        let broken = RenderParameters {
            color_stops: vec!["#00ff00".into(), "nope".into(), "#0000ff".into()],
            ..RenderParameters::default()
        };
        let token = clock.take_frames()[0];
        driver.tick(token, Duration::ZERO, &broken, 1.0, &mut surface, &mut clock);

        let stops = log.draws()[0].color_stops();
        assert_eq!(stops[0], Rgb([0.0, 1.0, 0.0]));
        assert_eq!(stops[1], before[1]);
        assert_eq!(stops[2], Rgb([0.0, 0.0, 1.0]));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut clock = EventClock::new();
        let params = RenderParameters::default();
        let mut driver = AnimationDriver::start(&mut clock, &params);
        assert!(driver.is_running());
        assert!(driver.cancel(&mut clock));
        assert!(!driver.cancel(&mut clock));
        assert!(!clock.has_pending_frames());
    }
}
