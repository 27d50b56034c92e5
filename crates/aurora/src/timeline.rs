use std::time::Duration;

use crate::types::CrossfadeCurve;

impl CrossfadeCurve {
    /// Maps fade progress to a mix factor; both ends are pinned to 0 and 1.
    pub fn sample(self, progress: f32) -> f32 {
        let x = progress.clamp(0.0, 1.0);
        match self {
            Self::Linear => x,
            Self::Smoothstep => x * x * (3.0 - 2.0 * x),
            // Quadratic in, quadratic out, meeting at (0.5, 0.5).
            Self::EaseInOut if x < 0.5 => 2.0 * x * x,
            Self::EaseInOut => {
                let rest = 1.0 - x;
                1.0 - 2.0 * rest * rest
            }
        }
    }
}

/// Eased transition of a scalar between two values over a fixed duration.
///
/// Retargeting mid-flight starts the new envelope from the value sampled at
/// that instant, so reversing a fade never jumps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeEnvelope {
    start: Duration,
    duration: Duration,
    from: f32,
    to: f32,
    curve: CrossfadeCurve,
}

impl FadeEnvelope {
    /// An envelope that holds `value` forever.
    pub fn settled(value: f32) -> Self {
        Self {
            start: Duration::ZERO,
            duration: Duration::ZERO,
            from: value,
            to: value,
            curve: CrossfadeCurve::Linear,
        }
    }

    pub fn new(from: f32, to: f32, duration: Duration, curve: CrossfadeCurve, now: Duration) -> Self {
        Self {
            start: now,
            duration,
            from,
            to,
            curve,
        }
    }

    /// Starts a new envelope from the current value towards `to`.
    pub fn retarget(&self, to: f32, duration: Duration, curve: CrossfadeCurve, now: Duration) -> Self {
        Self::new(self.value(now), to, duration, curve, now)
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn progress(&self, now: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start);
        (elapsed.as_secs_f32() / self.duration.as_secs_f32().max(f32::EPSILON)).min(1.0)
    }

    pub fn value(&self, now: Duration) -> f32 {
        let mix = self.curve.sample(self.progress(now));
        self.from + (self.to - self.from) * mix
    }

    pub fn finished(&self, now: Duration) -> bool {
        self.progress(now) >= 1.0
    }
}
