use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// Shared pause/resume switch for a run.
///
/// Tracks cumulative paused wall-clock time so that duration-based gates and ramping
/// schedules can subtract it back out: pausing for `P` delays termination by `P`, rather
/// than just blocking iteration starts while schedules keep advancing underneath.
#[derive(Debug)]
pub struct PauseGate {
    paused: AtomicBool,
    notify: Notify,
    paused_since: Mutex<Option<Instant>>,
    total_paused_micros: AtomicU64,
}

impl PauseGate {
    pub fn new(start_paused: bool) -> Self {
        let gate = Self {
            paused: AtomicBool::new(false),
            notify: Notify::new(),
            paused_since: Mutex::new(None),
            total_paused_micros: AtomicU64::new(0),
        };
        if start_paused {
            gate.pause();
        }
        gate
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        if self.paused.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut since = self
            .paused_since
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *since = Some(Instant::now());
    }

    pub fn resume(&self) {
        if !self.paused.swap(false, Ordering::AcqRel) {
            return;
        }
        let mut since = self
            .paused_since
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(start) = since.take() {
            let micros = start.elapsed().as_micros().min(u128::from(u64::MAX)) as u64;
            self.total_paused_micros.fetch_add(micros, Ordering::Relaxed);
        }
        drop(since);
        self.notify.notify_waiters();
    }

    /// Blocks while paused. Returns immediately if not currently paused.
    pub async fn wait_while_paused(&self) {
        while self.is_paused() {
            self.notify.notified().await;
        }
    }

    fn total_paused(&self) -> Duration {
        let mut total = Duration::from_micros(self.total_paused_micros.load(Ordering::Relaxed));
        let since = *self
            .paused_since
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(start) = since {
            total += start.elapsed();
        }
        total
    }

    /// A wall-clock `Instant` shifted back by the run's accumulated pause time. Compare this
    /// against deadlines computed from the run's start instant so pauses delay them 1:1.
    pub fn logical_now(&self) -> Instant {
        Instant::now() - self.total_paused()
    }

    /// Subtracts accumulated paused duration from a wall-clock elapsed duration, so ramping
    /// schedules driven by "elapsed since start" freeze in place while paused.
    pub fn logical_elapsed(&self, wall_elapsed: Duration) -> Duration {
        wall_elapsed.saturating_sub(self.total_paused())
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_paused_blocks_until_resumed() {
        let gate = std::sync::Arc::new(PauseGate::new(true));
        assert!(gate.is_paused());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move {
                gate.wait_while_paused().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        gate.resume();
        waiter.await.expect("waiter task completes");
        assert!(!gate.is_paused());
    }

    #[tokio::test]
    async fn logical_elapsed_freezes_during_pause() {
        let gate = PauseGate::new(false);
        gate.pause();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let frozen = gate.logical_elapsed(Duration::from_millis(30));
        gate.resume();
        assert!(frozen < Duration::from_millis(10));
    }
}
