use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Handle for a requested animation frame, the analogue of a
/// `requestAnimationFrame` id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(u64);

/// Handle for a one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

/// Registration of a window-level resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Scheduling services the renderer borrows from its host.
///
/// Every call happens on the event-loop thread. Time is measured as the
/// duration since the host's origin, like a high-resolution page timestamp.
pub trait HostRuntime {
    fn now(&self) -> Duration;
    /// Requests a callback on the next display refresh.
    fn request_frame(&mut self) -> FrameToken;
    fn cancel_frame(&mut self, token: FrameToken);
    fn set_timeout(&mut self, delay: Duration) -> TimerToken;
    fn clear_timeout(&mut self, token: TimerToken);
    fn listen_resize(&mut self) -> ListenerId;
    fn unlisten_resize(&mut self, id: ListenerId);
}

/// In-process queue of frame requests, timers and resize listeners.
///
/// The host advances the clock and drains due work; nothing here fires on its
/// own, which makes the whole lifecycle deterministic under test.
#[derive(Debug, Default)]
pub struct EventClock {
    now: Duration,
    next_id: u64,
    frames: BTreeSet<FrameToken>,
    timers: BTreeMap<TimerToken, Duration>,
    listeners: BTreeSet<ListenerId>,
}

impl EventClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward. Going backwards is ignored.
    pub fn advance_to(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.now = self.now.saturating_add(by);
    }

    /// Drains every frame requested so far; the host runs them for one refresh.
    /// Frames requested while those callbacks run land in the next refresh.
    pub fn take_frames(&mut self) -> Vec<FrameToken> {
        std::mem::take(&mut self.frames).into_iter().collect()
    }

    /// Removes and returns timers whose deadline has passed, earliest first.
    pub fn take_due_timers(&mut self) -> Vec<TimerToken> {
        let mut due: Vec<(Duration, TimerToken)> = self
            .timers
            .iter()
            .filter(|(_, deadline)| **deadline <= self.now)
            .map(|(token, deadline)| (*deadline, *token))
            .collect();
        due.sort();
        for (_, token) in &due {
            self.timers.remove(token);
        }
        due.into_iter().map(|(_, token)| token).collect()
    }

    pub fn has_pending_frames(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest timer deadline, if any timer is armed.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.values().min().copied()
    }

    pub fn resize_listeners(&self) -> usize {
        self.listeners.len()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl HostRuntime for EventClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn request_frame(&mut self) -> FrameToken {
        let token = FrameToken(self.next_id());
        self.frames.insert(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.frames.remove(&token);
    }

    fn set_timeout(&mut self, delay: Duration) -> TimerToken {
        let token = TimerToken(self.next_id());
        self.timers.insert(token, self.now.saturating_add(delay));
        token
    }

    fn clear_timeout(&mut self, token: TimerToken) {
        self.timers.remove(&token);
    }

    fn listen_resize(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.insert(id);
        id
    }

    fn unlisten_resize(&mut self, id: ListenerId) {
        self.listeners.remove(&id);
    }
}
