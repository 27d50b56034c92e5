use std::cell::RefCell;
use std::rc::Rc;

use crate::color::{resolve_stops, Rgb, STOP_COUNT};

/// Default colour stops of the aurora ramp.
pub const DEFAULT_COLOR_STOPS: [&str; 3] = ["#FF6B9D", "#3d4c85ff", "#FF6B9D"];
pub const DEFAULT_AMPLITUDE: f32 = 0.5;
pub const DEFAULT_BLEND: f32 = 1.2;
pub const DEFAULT_SPEED: f32 = 0.3;
pub const DEFAULT_OPACITY: f32 = 0.3;

/// [`DEFAULT_COLOR_STOPS`] decoded.
pub fn default_stops() -> [Rgb; STOP_COUNT] {
    resolve_stops(&DEFAULT_COLOR_STOPS, &[Rgb::BLACK; STOP_COUNT]).stops
}

/// Live, host-supplied inputs of the effect.
///
/// Optional fields mirror "unset" host props: the animation driver falls back
/// to its own defaults for them on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParameters {
    /// Hex colour stops; exactly three are evaluated.
    pub color_stops: Vec<String>,
    pub amplitude: Option<f32>,
    pub blend: Option<f32>,
    pub speed: Option<f32>,
    /// Explicit animation time. When unset, time follows the frame timestamp.
    pub time: Option<f32>,
    /// Opacity reached once the effect is fully faded in.
    pub opacity: f32,
}

impl Default for RenderParameters {
    fn default() -> Self {
        Self {
            color_stops: DEFAULT_COLOR_STOPS.iter().map(|s| s.to_string()).collect(),
            amplitude: Some(DEFAULT_AMPLITUDE),
            blend: Some(DEFAULT_BLEND),
            speed: Some(DEFAULT_SPEED),
            time: None,
            opacity: DEFAULT_OPACITY,
        }
    }
}

/// Anything the animation driver can take a per-tick snapshot from.
pub trait ParameterSource {
    /// Returns the latest parameters. Called exactly once per tick.
    fn snapshot(&self) -> RenderParameters;
}

/// Single-slot "latest wins" cell shared between the host and the driver.
///
/// The host is the only writer and replaces the whole value synchronously;
/// the driver reads one cloned snapshot at the start of each tick, so a tick
/// never observes a half-applied update and sees new values on the next tick.
/// Both sides live on the event-loop thread.
#[derive(Debug, Clone, Default)]
pub struct ParameterCell {
    slot: Rc<RefCell<RenderParameters>>,
}

impl ParameterCell {
    pub fn new(initial: RenderParameters) -> Self {
        Self {
            slot: Rc::new(RefCell::new(initial)),
        }
    }

    pub fn set(&self, params: RenderParameters) {
        *self.slot.borrow_mut() = params;
    }

    /// Applies an in-place edit, e.g. a single field change from the host.
    pub fn update(&self, edit: impl FnOnce(&mut RenderParameters)) {
        edit(&mut self.slot.borrow_mut());
    }
}

impl ParameterSource for ParameterCell {
    fn snapshot(&self) -> RenderParameters {
        self.slot.borrow().clone()
    }
}

impl ParameterSource for RenderParameters {
    fn snapshot(&self) -> RenderParameters {
        self.clone()
    }
}
