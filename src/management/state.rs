use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::types::StateMode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state parameter is missing")]
    Missing,

    #[error("state {0:?} was never issued or has already been used")]
    Unknown(String),

    #[error("state {0:?} has expired")]
    Expired(String),
}

/// Upper bound on states waiting for their callback in strict mode.
pub const MAX_PENDING_STATES: usize = 10_000;

#[derive(Default)]
struct Issued {
    by_state: HashMap<String, i64>,
    // issue order, may still hold states that were redeemed since
    order: VecDeque<(String, i64)>,
}

impl Issued {
    fn pop_oldest(&mut self) {
        if let Some((state, issued_at)) = self.order.pop_front() {
            if self.by_state.get(&state) == Some(&issued_at) {
                self.by_state.remove(&state);
            }
        }
    }
}

/// Keeps track of the `state` values handed out by the login endpoint.
///
/// In [`StateMode::Presence`] nothing is recorded and only the presence of a
/// value is checked on callback. In [`StateMode::Strict`] every issued value
/// is remembered with its issue time and can be redeemed exactly once
/// before `ttl` runs out. At most `capacity` values are kept; past that the
/// oldest one is forgotten.
pub struct StateManager {
    mode: StateMode,
    ttl: Duration,
    capacity: usize,
    issued: Mutex<Issued>,
}

impl StateManager {
    pub fn new(mode: StateMode, ttl: Duration) -> Self {
        Self::with_capacity(mode, ttl, MAX_PENDING_STATES)
    }

    pub fn with_capacity(mode: StateMode, ttl: Duration, capacity: usize) -> Self {
        Self {
            mode,
            ttl,
            capacity: capacity.max(1),
            issued: Mutex::new(Issued::default()),
        }
    }

    pub fn mode(&self) -> StateMode {
        self.mode
    }

    pub async fn add(&self, state: &str) {
        if self.mode == StateMode::Presence {
            return;
        }

        let now = Utc::now().timestamp_millis();
        let ttl = self.ttl_millis();
        let mut issued = self.issued.lock().await;

        while issued
            .order
            .front()
            .is_some_and(|(_, issued_at)| now - *issued_at >= ttl)
        {
            issued.pop_oldest();
        }
        while issued.order.len() >= self.capacity {
            issued.pop_oldest();
        }

        issued.by_state.insert(state.to_string(), now);
        issued.order.push_back((state.to_string(), now));
    }

    /// Checks a `state` received on callback and, in strict mode, consumes it.
    pub async fn redeem(&self, state: &str) -> Result<(), StateError> {
        if state.is_empty() {
            return Err(StateError::Missing);
        }

        if self.mode == StateMode::Presence {
            return Ok(());
        }

        let issued_at = self
            .issued
            .lock()
            .await
            .by_state
            .remove(state)
            .ok_or_else(|| StateError::Unknown(state.to_string()))?;

        if Utc::now().timestamp_millis() - issued_at >= self.ttl_millis() {
            return Err(StateError::Expired(state.to_string()));
        }

        Ok(())
    }

    pub async fn pending(&self) -> usize {
        self.issued.lock().await.by_state.len()
    }

    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }
}
