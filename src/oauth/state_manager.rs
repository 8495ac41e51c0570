//! OAuth state management for CSRF protection.
//!
//! `/login` mints a state value; `/callback` consumes it.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Outstanding state values with their issue time
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    expiry_duration: Duration,
}

impl StateManager {
    /// Create a new state manager
    ///
    /// # Arguments
    /// * `expiry_seconds` - How long states remain valid (default: 600 = 10 minutes)
    pub fn new(expiry_seconds: i64) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            expiry_duration: Duration::seconds(expiry_seconds),
        }
    }

    /// Generate a new state token and store it.
    ///
    /// Expired entries are pruned on the way in, so the map stays bounded
    /// without a background task.
    pub fn create_state(&self) -> String {
        let state = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.retain(|_, created_at| now - *created_at <= self.expiry_duration);
        states.insert(state.clone(), now);

        state
    }

    /// Validate and consume a state token.
    ///
    /// Returns false for unknown, reused, or expired values.
    pub fn validate_and_consume(&self, state: &str) -> bool {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());

        match states.remove(state) {
            Some(created_at) => Utc::now() - created_at <= self.expiry_duration,
            None => false,
        }
    }

    /// Count of outstanding states
    pub fn count(&self) -> usize {
        self.states.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
