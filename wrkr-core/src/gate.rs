use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::pause::PauseGate;

#[derive(Debug)]
pub struct IterationGate {
    counter: AtomicU64,
    iterations: Option<u64>,
    duration: Option<Duration>,
    deadline: OnceLock<Instant>,
    pause: Arc<PauseGate>,
    cancel: CancellationToken,
}

impl IterationGate {
    pub fn new(
        iterations: Option<u64>,
        duration: Option<Duration>,
        pause: Arc<PauseGate>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            counter: AtomicU64::new(0),
            iterations,
            duration,
            deadline: OnceLock::new(),
            pause,
            cancel,
        }
    }

    pub fn start_at(&self, started: Instant) {
        if self.deadline.get().is_some() {
            return;
        }

        if let Some(duration) = self.duration {
            let _ = self.deadline.set(started + duration);
        }
    }

    pub fn start(&self) {
        self.start_at(Instant::now());
    }

    pub async fn next(&self) -> bool {
        self.pause.wait_while_paused().await;

        if self.cancel.is_cancelled() {
            return false;
        }

        // Hot path: avoid timekeeping entirely unless we're in duration mode.
        if self.duration.is_some() {
            let now = self.pause.logical_now();

            // If the runner didn't explicitly set a start time, lazily initialize the deadline
            // from the first observed iteration.
            if self.deadline.get().is_none() {
                self.start_at(Instant::now());
            }

            if let Some(deadline) = self.deadline.get()
                && now >= *deadline
            {
                return false;
            }
        }

        if let Some(total) = self.iterations {
            let idx = self.counter.fetch_add(1, Ordering::Relaxed);
            if idx >= total {
                return false;
            }
        } else if self.duration.is_none() {
            // Neither iterations nor duration => run once.
            let idx = self.counter.fetch_add(1, Ordering::Relaxed);
            if idx > 0 {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pausing_delays_duration_deadline() {
        let pause = Arc::new(PauseGate::new(false));
        let gate = IterationGate::new(
            None,
            Some(Duration::from_millis(60)),
            pause.clone(),
            CancellationToken::new(),
        );
        gate.start();

        pause.pause();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(gate.next().await, "deadline must not elapse while paused");
        pause.resume();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!gate.next().await, "deadline elapses once resumed");
    }

    #[tokio::test]
    async fn cancellation_stops_the_gate_immediately() {
        let pause = Arc::new(PauseGate::default());
        let cancel = CancellationToken::new();
        let gate = IterationGate::new(Some(1_000), None, pause, cancel.clone());
        gate.start();

        assert!(gate.next().await);
        cancel.cancel();
        assert!(!gate.next().await, "cancellation must stop new iterations");
    }
}
