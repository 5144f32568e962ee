//! Caps how many engine processes run at once.
//!
//! A slot is an [`OwnedSemaphorePermit`]; it goes back to the pool when the
//! permit is dropped, whichever way the request ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::BridgeError;

#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    queue_timeout: Duration,
}

impl ConcurrencyLimiter {
    /// `queue_timeout` of zero rejects as soon as every slot is taken.
    pub fn new(capacity: usize, queue_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            queue_timeout,
        }
    }

    /// Take a slot, waiting at most `queue_timeout` for one to free up.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, BridgeError> {
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(permit);
        }
        if self.queue_timeout.is_zero() {
            return Err(BridgeError::TooManyRequests);
        }

        match tokio::time::timeout(self.queue_timeout, self.semaphore.clone().acquire_owned()).await
        {
            Ok(Ok(permit)) => Ok(permit),
            // Closed semaphore: never happens, we never close it.
            Ok(Err(_)) => Err(BridgeError::Internal("limiter closed".to_string())),
            Err(_) => Err(BridgeError::TooManyRequests),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}
