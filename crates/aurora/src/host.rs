use std::time::Duration;

use tracing::{error, trace};

use crate::lifecycle::{Aurora, LifecycleState};
use crate::params::{ParameterCell, ParameterSource, RenderParameters};
use crate::program::ProgramSource;
use crate::runtime::{EventClock, HostRuntime};
use crate::surface::{BackendFactory, RenderSurface};
use crate::types::CrossfadeCurve;

/// Region the effect fills; queried on mount and on every resize.
pub trait Container {
    fn bounds(&self) -> (u32, u32);
}

impl Container for (u32, u32) {
    fn bounds(&self) -> (u32, u32) {
        *self
    }
}

/// Adapter between a host (window, test harness) and the lifecycle.
///
/// Owns the clock that stands in for frame requests, timers and resize
/// listeners; the host calls [`HostBinding::pump`] whenever it wakes up.
pub struct HostBinding<F: BackendFactory, C: Container> {
    aurora: Aurora<F>,
    clock: EventClock,
    params: ParameterCell,
    container: C,
}

impl<F: BackendFactory, C: Container> HostBinding<F, C> {
    pub fn new(factory: F, program: ProgramSource, container: C, params: RenderParameters) -> Self {
        Self {
            aurora: Aurora::new(factory, program),
            clock: EventClock::new(),
            params: ParameterCell::new(params),
            container,
        }
    }

    pub fn with_curve(mut self, curve: CrossfadeCurve) -> Self {
        self.aurora.set_curve(curve);
        self
    }

    /// Applies the activation flag. Mount failures are logged and leave the
    /// effect unmounted; they never reach the host.
    pub fn set_active(&mut self, active: bool) {
        let bounds = self.container.bounds();
        if let Err(err) = self
            .aurora
            .set_active(active, &mut self.clock, bounds, &self.params)
        {
            error!(%err, "failed to mount aurora");
        }
    }

    /// Replaces the live parameters; the next tick picks them up.
    pub fn set_parameters(&self, params: RenderParameters) {
        self.params.set(params);
    }

    /// Shared handle to the live parameters.
    pub fn parameters(&self) -> ParameterCell {
        self.params.clone()
    }

    /// Re-reads the container size and forwards it while a resize listener
    /// is registered.
    pub fn container_resized(&mut self) {
        if self.aurora.resize_listener().is_none() {
            trace!("resize without a listener");
            return;
        }
        let (width, height) = self.container.bounds();
        self.aurora.resize(width, height);
    }

    /// Advances the clock to `now`, fires due timers, then runs the frame
    /// callbacks requested before this call.
    pub fn pump(&mut self, now: Duration) {
        self.pump_timers(now);
        let timestamp = self.clock.now();
        for frame in self.clock.take_frames() {
            self.aurora
                .on_frame(frame, timestamp, &mut self.clock, &self.params);
        }
    }

    /// Advances the clock to `now` and fires due timers only.
    pub fn pump_timers(&mut self, now: Duration) {
        self.clock.advance_to(now);
        for timer in self.clock.take_due_timers() {
            self.aurora.on_timer(timer, &mut self.clock);
        }
    }

    pub fn wants_frame(&self) -> bool {
        self.clock.has_pending_frames()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.clock.next_deadline()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn state(&self) -> LifecycleState {
        self.aurora.state()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), LifecycleState::FadingIn | LifecycleState::Steady)
    }

    /// Effective compositing opacity right now: visibility × parameter opacity.
    pub fn opacity(&self) -> f32 {
        self.aurora.visibility(self.clock.now()) * self.params.snapshot().opacity
    }

    pub fn surface(&self) -> Option<&RenderSurface<F::Backend>> {
        self.aurora.surface()
    }

    pub fn container(&self) -> &C {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    pub fn clock(&self) -> &EventClock {
        &self.clock
    }

    pub fn unmount(&mut self) {
        self.aurora.unmount(&mut self.clock);
    }
}

impl<F: BackendFactory, C: Container> Drop for HostBinding<F, C> {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BackendLog, RecordingFactory};

    fn binding(log: &BackendLog) -> HostBinding<RecordingFactory, (u32, u32)> {
        HostBinding::new(
            RecordingFactory::new(log.clone()),
            ProgramSource::aurora(),
            (800, 600),
            RenderParameters::default(),
        )
    }

    #[test]
    fn mount_failures_are_swallowed() {
        let log = BackendLog::default();
        log.fail_create("no GPU");
        let mut host = binding(&log);
        host.set_active(true);
        assert_eq!(host.state(), LifecycleState::Unmounted);
        assert!(!host.wants_frame());
    }

    #[test]
    fn parameter_updates_reach_the_next_tick() {
        let log = BackendLog::default();
        let mut host = binding(&log);
        host.set_active(true);
        host.pump(Duration::from_millis(16));
        host.set_parameters(RenderParameters {
            amplitude: Some(2.5),
            ..RenderParameters::default()
        });
        assert_eq!(log.last_draw().map(|draw| draw.amplitude), Some(0.5));
        host.pump(Duration::from_millis(32));
        assert_eq!(log.last_draw().map(|draw| draw.amplitude), Some(2.5));
    }

    #[test]
    fn resizes_are_forwarded_only_while_mounted() {
        let log = BackendLog::default();
        let mut host = binding(&log);
        *host.container_mut() = (1024, 768);
        host.container_resized();
        assert!(log.resizes().is_empty());

        host.set_active(true);
        *host.container_mut() = (1280, 720);
        host.container_resized();
        assert_eq!(log.resizes(), vec![(1280, 720)]);
        assert_eq!(
            host.surface().and_then(|surface| surface.uniforms()).map(|u| u.resolution),
            Some([1280.0, 720.0])
        );
    }

    #[test]
    fn dropping_the_binding_releases_the_surface() {
        let log = BackendLog::default();
        {
            let mut host = binding(&log);
            host.set_active(true);
            host.pump(Duration::from_millis(16));
        }
        assert_eq!(log.releases(), 1);
    }

    #[test]
    fn opacity_follows_the_crossfade() {
        let log = BackendLog::default();
        let mut host = binding(&log);
        assert_eq!(host.opacity(), 0.0);
        host.set_active(true);
        host.pump(Duration::from_millis(16));
        host.pump(Duration::from_millis(32));
        assert_eq!(host.state(), LifecycleState::Steady);
        host.pump(Duration::from_millis(32) + Duration::from_millis(800));
        assert!((host.opacity() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn configured_curve_shapes_the_fade_in() {
        let quarter = Duration::from_millis(32) + Duration::from_millis(200);
        let opacity_at_quarter = |curve: CrossfadeCurve| {
            let log = BackendLog::default();
            let mut host = binding(&log).with_curve(curve);
            host.set_active(true);
            host.pump(Duration::from_millis(16));
            host.pump(Duration::from_millis(32));
            host.pump_timers(quarter);
            host.opacity()
        };

        let linear = opacity_at_quarter(CrossfadeCurve::Linear);
        let eased = opacity_at_quarter(CrossfadeCurve::EaseInOut);
        assert!((linear - 0.25 * 0.3).abs() < 1e-4, "linear {linear}");
        assert!((eased - 0.125 * 0.3).abs() < 1e-4, "eased {eased}");
    }
}
