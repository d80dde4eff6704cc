//! Exclusive intent locks
//!
//! The named primitive behind "acquire exclusive intent on account X".
//! Holding the intent for a resource blocks every other unit of work that
//! asks for the same resource until the guard is dropped. Waits are bounded
//! and expire as [`Error::LockTimeout`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::domain::result::{Error, Result};

/// Registry of currently held intents
#[derive(Debug)]
pub struct IntentLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
    timeout: Duration,
}

impl IntentLocks {
    pub fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        })
    }

    /// Resource key for an account
    pub fn account_key(user_id: &str) -> String {
        format!("account:{}", user_id)
    }

    /// Resource key for a display name
    pub fn username_key(username: &str) -> String {
        format!("username:{}", username)
    }

    /// Block until `resource` is free, then hold it until the guard drops
    pub fn acquire(self: &Arc<Self>, resource: &str) -> Result<IntentGuard> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        let mut held = self.held.lock();
        while held.contains(resource) {
            if self.released.wait_until(&mut held, deadline).timed_out() && held.contains(resource) {
                let waited_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(resource, waited_ms, "intent wait timed out");
                return Err(Error::LockTimeout {
                    resource: resource.to_string(),
                    waited_ms,
                });
            }
        }
        held.insert(resource.to_string());
        drop(held);

        tracing::debug!(resource, waited_us = started.elapsed().as_micros() as u64, "intent acquired");

        Ok(IntentGuard {
            locks: Arc::clone(self),
            resource: resource.to_string(),
        })
    }

    /// Whether some unit currently holds `resource`
    pub fn is_held(&self, resource: &str) -> bool {
        self.held.lock().contains(resource)
    }
}

/// A held intent; released on drop
#[derive(Debug)]
pub struct IntentGuard {
    locks: Arc<IntentLocks>,
    resource: String,
}

impl IntentGuard {
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl Drop for IntentGuard {
    fn drop(&mut self) {
        self.locks.held.lock().remove(&self.resource);
        self.locks.released.notify_all();
    }
}
