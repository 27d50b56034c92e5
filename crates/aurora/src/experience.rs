//! Lifecycle wrapper for an externally built interactive experience.
//!
//! The experience itself is opaque: it is constructed from a target and may
//! need explicit teardown. [`ExperienceHost`] is the one owner of the live
//! instance, so "at most one per host" holds by construction.

use std::fmt;

use tracing::{debug, error};

/// A mounted experience. `destroy` runs exactly once, on unmount.
pub trait Experience {
    fn destroy(&mut self) {}
}

/// Arguments handed to an experience constructor.
#[derive(Debug, Clone)]
pub struct ExperienceOptions<T> {
    pub target: T,
}

/// Owner of at most one live experience.
pub struct ExperienceHost<E: Experience> {
    live: Option<E>,
}

impl<E: Experience> Default for ExperienceHost<E> {
    fn default() -> Self {
        Self { live: None }
    }
}

impl<E: Experience> ExperienceHost<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a new experience on `target`, destroying any live one first.
    ///
    /// Construction failures are logged and leave the host empty. Returns
    /// whether an experience is live afterwards.
    pub fn mount<T, Failure, Ctor>(&mut self, target: T, construct: Ctor) -> bool
    where
        Ctor: FnOnce(ExperienceOptions<T>) -> Result<E, Failure>,
        Failure: fmt::Display,
    {
        self.unmount();
        match construct(ExperienceOptions { target }) {
            Ok(experience) => {
                debug!("experience mounted");
                self.live = Some(experience);
                true
            }
            Err(err) => {
                error!(%err, "failed to load experience");
                false
            }
        }
    }

    pub fn unmount(&mut self) {
        if let Some(mut experience) = self.live.take() {
            experience.destroy();
            debug!("experience destroyed");
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn get(&self) -> Option<&E> {
        self.live.as_ref()
    }
}

impl<E: Experience> Drop for ExperienceHost<E> {
    fn drop(&mut self) {
        self.unmount();
    }
}
