//! # Backoff module
//!
//! This module provide a per-object exponential backoff used to requeue
//! resources after a transient failure

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use rand::Rng;

use crate::svc::cfg;

// -----------------------------------------------------------------------------
// Constants

pub const MULTIPLIER: u32 = 2;
pub const RANDOMIZATION_FACTOR: f64 = 0.1;

/// returns the key under which the attempts of an object are counted
pub fn key(kind: &str, namespace: &str, name: &str) -> String {
    format!("{kind}/{namespace}/{name}")
}

// -----------------------------------------------------------------------------
// Backoff structure

/// exponential delay computed per object key, the counter of a key grows on
/// each call of [`Backoff::next`] and is dropped by [`Backoff::reset`].
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    randomization_factor: f64,
    attempts: Mutex<HashMap<String, u32>>,
}

impl From<&cfg::Backoff> for Backoff {
    fn from(config: &cfg::Backoff) -> Self {
        Self::new(
            Duration::from_secs(config.base),
            Duration::from_secs(config.max),
        )
    }
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            randomization_factor: RANDOMIZATION_FACTOR,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.randomization_factor = 0.0;
        self
    }

    /// returns the delay to wait before the next attempt for the given key
    pub fn next(&self, key: &str) -> Duration {
        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let attempt = attempts.entry(key.to_string()).or_insert(0);

        let delay = MULTIPLIER
            .checked_pow(*attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .unwrap_or(self.max)
            .min(self.max);

        *attempt = attempt.saturating_add(1);
        self.jitter(delay)
    }

    pub fn reset(&self, key: &str) {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// returns the number of keys with pending attempts
    pub fn len(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn jitter(&self, delay: Duration) -> Duration {
        if self.randomization_factor == 0.0 || delay.is_zero() {
            return delay;
        }

        let secs = delay.as_secs_f64();
        let delta = secs * self.randomization_factor;

        Duration::from_secs_f64(rand::thread_rng().gen_range(secs - delta..=secs + delta))
    }
}
