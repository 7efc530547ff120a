//! Fixed-capacity admission control for browser sessions.
//!
//! Each extraction pipeline run holds one permit for the whole life of its
//! browser session. Callers beyond capacity suspend until a slot frees; the
//! permit is RAII so release happens on every exit path, panics included.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

pub struct SessionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// Ownership token for one of the gate's slots. Dropping it frees the slot.
pub struct SessionPermit {
    _permit: OwnedSemaphorePermit,
}

impl SessionGate {
    /// Capacity is fixed for the process lifetime, never resized.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Suspend until a slot is free. Waiters are served in arrival order.
    pub async fn acquire(&self) -> SessionPermit {
        if self.permits.available_permits() == 0 {
            info!(
                "all {} browser slots busy, queueing until one frees",
                self.capacity
            );
        }
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("session gate semaphore is never closed");
        debug!(
            "browser slot acquired ({} of {} now free)",
            self.permits.available_permits(),
            self.capacity
        );
        SessionPermit { _permit: permit }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn capacity_reported() {
        tokio_test::block_on(async {
            let gate = SessionGate::new(2);
            assert_eq!(gate.capacity(), 2);
            assert_eq!(gate.available(), 2);
            let _p = gate.acquire().await;
            assert_eq!(gate.available(), 1);
        });
    }

    #[tokio::test]
    async fn third_caller_waits_until_a_slot_frees() {
        let gate = SessionGate::new(2);
        let p1 = gate.acquire().await;
        let _p2 = gate.acquire().await;

        let gate2 = gate.clone();
        let third = tokio::spawn(async move {
            let _p3 = gate2.acquire().await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!third.is_finished(), "third caller should be queued");

        drop(p1);
        tokio::time::timeout(Duration::from_secs(1), third)
            .await
            .expect("third caller should resume once a slot frees")
            .unwrap();
    }

    #[tokio::test]
    async fn permit_released_on_drop_even_after_error() {
        let gate = SessionGate::new(1);
        {
            let _p = gate.acquire().await;
            assert_eq!(gate.available(), 0);
            // simulated failure path: permit goes out of scope with the error
        }
        assert_eq!(gate.available(), 1);
    }
}
