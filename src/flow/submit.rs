//! In-flight submission state and mounted-liveness checks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::flow::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Submitting,
    Settled,
}

/// `Idle → Submitting → Settled`; a new submission is refused while one is
/// in flight.
#[derive(Debug, Clone, Default)]
pub struct SubmitGuard {
    state: SubmitState,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn is_submitting(&self) -> bool {
        self.state == SubmitState::Submitting
    }

    pub fn try_begin(&mut self) -> Result<(), FlowError> {
        if self.is_submitting() {
            return Err(FlowError::Busy);
        }
        self.state = SubmitState::Submitting;
        Ok(())
    }

    /// Returns `false` if nothing was in flight.
    pub fn settle(&mut self) -> bool {
        if self.state != SubmitState::Submitting {
            log::warn!("Submission settled while none was in flight");
            return false;
        }
        self.state = SubmitState::Settled;
        true
    }
}

/// Owns component state for as long as the component is mounted.
///
/// Dropping the guard unmounts; [`MountHandle`]s held by in-flight work
/// then stop applying their results.
pub struct MountGuard<T> {
    state: Arc<Mutex<T>>,
}

pub struct MountHandle<T> {
    state: Weak<Mutex<T>>,
}

impl<T> Clone for MountHandle<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> MountGuard<T> {
    pub fn mount(state: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn handle(&self) -> MountHandle<T> {
        MountHandle {
            state: Arc::downgrade(&self.state),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut lock(&self.state))
    }
}

impl<T> MountHandle<T> {
    pub fn is_mounted(&self) -> bool {
        self.state.strong_count() > 0
    }

    /// Runs `f` against the component state if it is still mounted.
    pub fn apply<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        match self.state.upgrade() {
            Some(state) => Some(f(&mut lock(&state))),
            None => {
                log::debug!("Dropping result for an unmounted component");
                None
            }
        }
    }
}
