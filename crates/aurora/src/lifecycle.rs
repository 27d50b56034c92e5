//! Mount → fade-in → steady → fade-out → unmount.
//!
//! [`Aurora`] owns everything a mount creates (surface, program, animation
//! driver, resize listener) and is the only place that creates or destroys
//! them. Visibility is a crossfade envelope sampled by every tick and folded
//! into the shader's opacity uniform.

use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::driver::{AnimationDriver, TickOutcome};
use crate::params::ParameterSource;
use crate::program::ProgramSource;
use crate::runtime::{FrameToken, HostRuntime, ListenerId, TimerToken};
use crate::surface::{BackendFactory, DrawError, MountError, RenderSurface};
use crate::timeline::FadeEnvelope;
use crate::types::CrossfadeCurve;

/// Length of both the visibility crossfade and the delayed unmount.
pub const FADE_DURATION: Duration = Duration::from_millis(800);

/// Frames drawn fully transparent before the fade-in starts, so the first
/// visible frame is never a half-initialised one.
pub const FADE_IN_FRAMES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Unmounted,
    FadingIn,
    Steady,
    FadingOut,
}

struct Mount<F: BackendFactory> {
    surface: RenderSurface<F::Backend>,
    driver: AnimationDriver,
    resize_listener: ListenerId,
}

/// Activation state machine for one aurora instance.
pub struct Aurora<F: BackendFactory> {
    factory: F,
    program: ProgramSource,
    curve: CrossfadeCurve,
    state: LifecycleState,
    mount: Option<Mount<F>>,
    frames_until_visible: u32,
    unmount_timer: Option<TimerToken>,
    fade: FadeEnvelope,
}

impl<F: BackendFactory> Aurora<F> {
    pub fn new(factory: F, program: ProgramSource) -> Self {
        Self {
            factory,
            program,
            curve: CrossfadeCurve::default(),
            state: LifecycleState::Unmounted,
            mount: None,
            frames_until_visible: 0,
            unmount_timer: None,
            fade: FadeEnvelope::settled(0.0),
        }
    }

    pub fn with_curve(mut self, curve: CrossfadeCurve) -> Self {
        self.set_curve(curve);
        self
    }

    /// Easing for fades started from now on.
    pub fn set_curve(&mut self, curve: CrossfadeCurve) {
        self.curve = curve;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.mount.is_some()
    }

    pub fn surface(&self) -> Option<&RenderSurface<F::Backend>> {
        self.mount.as_ref().map(|mount| &mount.surface)
    }

    pub fn resize_listener(&self) -> Option<ListenerId> {
        self.mount.as_ref().map(|mount| mount.resize_listener)
    }

    pub fn unmount_timer(&self) -> Option<TimerToken> {
        self.unmount_timer
    }

    /// Target of the visibility crossfade: 1 once faded in, 0 when hidden.
    pub fn visibility_target(&self) -> f32 {
        self.fade.target()
    }

    /// Current crossfade factor in `[0, 1]`.
    pub fn visibility(&self, now: Duration) -> f32 {
        if self.mount.is_none() {
            return 0.0;
        }
        self.fade.value(now).clamp(0.0, 1.0)
    }

    pub fn set_active(
        &mut self,
        active: bool,
        runtime: &mut dyn HostRuntime,
        container: (u32, u32),
        params: &dyn ParameterSource,
    ) -> Result<(), MountError> {
        if active {
            self.activate(runtime, container, params)
        } else {
            self.deactivate(runtime);
            Ok(())
        }
    }

    /// Starts (or resumes) showing the effect.
    ///
    /// From `Unmounted` this creates the surface, compiles the program and
    /// starts the animation synchronously; on failure nothing stays alive and
    /// the state remains `Unmounted`. From `FadingOut` the pending unmount is
    /// cancelled and the live surface is reused.
    pub fn activate(
        &mut self,
        runtime: &mut dyn HostRuntime,
        container: (u32, u32),
        params: &dyn ParameterSource,
    ) -> Result<(), MountError> {
        match self.state {
            LifecycleState::Unmounted => {
                self.mount(runtime, container, params)?;
                self.fade = FadeEnvelope::settled(0.0);
            }
            LifecycleState::FadingOut => {
                if let Some(timer) = self.unmount_timer.take() {
                    runtime.clear_timeout(timer);
                }
            }
            LifecycleState::FadingIn | LifecycleState::Steady => return Ok(()),
        }
        self.frames_until_visible = FADE_IN_FRAMES;
        self.transition(LifecycleState::FadingIn);
        Ok(())
    }

    /// Starts fading out; the mount is torn down [`FADE_DURATION`] later
    /// unless the effect is re-activated first.
    pub fn deactivate(&mut self, runtime: &mut dyn HostRuntime) {
        match self.state {
            LifecycleState::FadingIn | LifecycleState::Steady => {
                let now = runtime.now();
                self.fade = self.fade.retarget(0.0, FADE_DURATION, self.curve, now);
                self.unmount_timer = Some(runtime.set_timeout(FADE_DURATION));
                self.transition(LifecycleState::FadingOut);
            }
            LifecycleState::FadingOut | LifecycleState::Unmounted => {}
        }
    }

    /// Frame callback. Stale tokens and ticks after teardown are ignored.
    pub fn on_frame(
        &mut self,
        token: FrameToken,
        timestamp: Duration,
        runtime: &mut dyn HostRuntime,
        params: &dyn ParameterSource,
    ) -> TickOutcome {
        let now = runtime.now();
        let visibility = self.visibility(now);
        let Some(mount) = self.mount.as_mut() else {
            trace!(?token, "frame after unmount");
            return TickOutcome::Ignored;
        };

        let outcome = mount
            .driver
            .tick(token, timestamp, params, visibility, &mut mount.surface, runtime);

        match &outcome {
            TickOutcome::Ignored => return outcome,
            TickOutcome::Drawn => {}
            TickOutcome::Failed(DrawError::Lost | DrawError::Outdated) => {
                let (width, height) = mount.surface.size();
                debug!(width, height, "surface lost or outdated; reconfiguring");
                mount.surface.resize(width, height);
            }
            TickOutcome::Failed(DrawError::Timeout) => {
                trace!("frame acquisition timed out; skipping frame");
            }
            TickOutcome::Failed(DrawError::OutOfMemory) => {
                error!("GPU out of memory; unmounting aurora");
                self.teardown(runtime);
                return outcome;
            }
            TickOutcome::Failed(DrawError::Other(message)) => {
                warn!(%message, "frame failed");
            }
        }

        if self.state == LifecycleState::FadingIn {
            self.frames_until_visible = self.frames_until_visible.saturating_sub(1);
            if self.frames_until_visible == 0 {
                self.fade = self.fade.retarget(1.0, FADE_DURATION, self.curve, now);
                self.transition(LifecycleState::Steady);
            }
        }
        outcome
    }

    /// Timer callback. Returns whether the timer was the pending unmount.
    pub fn on_timer(&mut self, token: TimerToken, runtime: &mut dyn HostRuntime) -> bool {
        if self.unmount_timer != Some(token) {
            return false;
        }
        self.unmount_timer = None;
        self.teardown(runtime);
        true
    }

    /// Applies a container resize. A no-op while unmounted.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(mount) = self.mount.as_mut() {
            mount.surface.resize(width, height);
        }
    }

    /// Tears everything down immediately, whatever the current state.
    pub fn unmount(&mut self, runtime: &mut dyn HostRuntime) {
        self.teardown(runtime);
    }

    fn mount(
        &mut self,
        runtime: &mut dyn HostRuntime,
        (width, height): (u32, u32),
        params: &dyn ParameterSource,
    ) -> Result<(), MountError> {
        // A minimised container reports 0x0; the resolution uniform must stay non-zero.
        let (width, height) = (width.max(1), height.max(1));
        let backend = self.factory.create(width, height)?;
        let mut surface = RenderSurface::new(backend, width, height);
        let initial = params.snapshot();
        let mut driver = AnimationDriver::start(runtime, &initial);

        if let Err(err) = surface.bind_program(&self.program, driver.initial_uniforms(&initial, width, height)) {
            driver.cancel(runtime);
            surface.destroy();
            return Err(err);
        }

        let resize_listener = runtime.listen_resize();
        info!(width, height, "aurora mounted");
        self.mount = Some(Mount {
            surface,
            driver,
            resize_listener,
        });
        Ok(())
    }

    fn teardown(&mut self, runtime: &mut dyn HostRuntime) {
        if let Some(timer) = self.unmount_timer.take() {
            runtime.clear_timeout(timer);
        }
        if let Some(mut mount) = self.mount.take() {
            mount.driver.cancel(runtime);
            runtime.unlisten_resize(mount.resize_listener);
            mount.surface.destroy();
            info!(ticks = mount.driver.ticks(), "aurora unmounted");
        }
        self.frames_until_visible = 0;
        self.fade = FadeEnvelope::settled(0.0);
        self.transition(LifecycleState::Unmounted);
    }

    fn transition(&mut self, next: LifecycleState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "aurora lifecycle transition");
            self.state = next;
        }
    }
}
