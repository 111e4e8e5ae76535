//! One-shot expiry timer
//!
//! Arms a single tokio timer task that fires a callback at a wall-clock
//! deadline. Arming replaces any previous timer; disarming aborts it. The
//! delay is computed from the injected [`Clock`] at arming time.

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use gymdesk_core::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

struct Armed {
    deadline: DateTime<Utc>,
    handle: JoinHandle<()>,
}

pub struct ExpiryScheduler {
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<Armed>>,
    arm_count: AtomicU64,
}

impl ExpiryScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slot: Mutex::new(None),
            arm_count: AtomicU64::new(0),
        }
    }

    /// Arm the timer to run `on_fire` at `deadline`, replacing any armed timer
    ///
    /// A deadline in the past fires on the next scheduler turn. Must be called
    /// from within a Tokio runtime.
    pub fn arm<F>(&self, deadline: DateTime<Utc>, on_fire: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::Config("expiry timer requires a Tokio runtime".to_string()))?;

        let delay = (deadline - self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }

        debug!(
            deadline = %deadline,
            delay_ms = delay.as_millis() as u64,
            "Arming session expiry timer"
        );

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire();
        });

        *slot = Some(Armed { deadline, handle });
        self.arm_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Abort the armed timer; returns whether one was pending
    pub fn disarm(&self) -> bool {
        let armed = self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        match armed {
            Some(armed) => {
                let pending = !armed.handle.is_finished();
                armed.handle.abort();
                if pending {
                    debug!(deadline = %armed.deadline, "Disarmed session expiry timer");
                }
                pending
            }
            None => false,
        }
    }

    /// Deadline of the pending timer, if any
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .filter(|armed| !armed.handle.is_finished())
            .map(|armed| armed.deadline)
    }

    pub fn is_armed(&self) -> bool {
        self.deadline().is_some()
    }

    /// Number of times a timer has been armed since creation
    pub fn arm_count(&self) -> u64 {
        self.arm_count.load(Ordering::SeqCst)
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        if let Some(armed) = self.slot.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            armed.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::AtomicBool;

    fn scheduler() -> (Arc<ManualClock>, ExpiryScheduler) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let scheduler = ExpiryScheduler::new(clock.clone());
        (clock, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_deadline() {
        let (clock, scheduler) = scheduler();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        let deadline = clock.now() + chrono::Duration::milliseconds(100);
        scheduler
            .arm(deadline, move || flag.store(true, Ordering::SeqCst))
            .unwrap();
        assert_eq!(scheduler.deadline(), Some(deadline));

        tokio::time::sleep(Duration::from_millis(90)).await;
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(fired.load(Ordering::SeqCst));
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_prevents_fire() {
        let (clock, scheduler) = scheduler();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        scheduler
            .arm(clock.now() + chrono::Duration::milliseconds(50), move || {
                flag.store(true, Ordering::SeqCst)
            })
            .unwrap();
        assert!(scheduler.disarm());
        assert!(!scheduler.disarm());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_timer() {
        let (clock, scheduler) = scheduler();
        let fired = Arc::new(AtomicU64::new(0));

        let first = fired.clone();
        scheduler
            .arm(clock.now() + chrono::Duration::milliseconds(50), move || {
                first.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let second = fired.clone();
        scheduler
            .arm(clock.now() + chrono::Duration::milliseconds(200), move || {
                second.fetch_add(10, Ordering::SeqCst);
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
        assert_eq!(scheduler.arm_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_deadline_fires_immediately() {
        let (clock, scheduler) = scheduler();
        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();

        scheduler
            .arm(clock.now() - chrono::Duration::seconds(5), move || {
                flag.store(true, Ordering::SeqCst)
            })
            .unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_arm_outside_runtime_fails() {
        let (clock, scheduler) = scheduler();
        let result = scheduler.arm(clock.now(), || {});
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
