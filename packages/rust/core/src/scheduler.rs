//! Timer loop that runs reconciliation cycles until cancelled.
//!
//! The first cycle starts immediately. After each cycle the loop waits for
//! `repeat - cycle_duration` (never negative), so cycle starts stay on a
//! fixed cadence unless a cycle overruns it. Cancellation is only observed
//! while waiting; a running cycle always completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::engine::Reconciler;

/// Time to wait before the next cycle, given how long the last one took.
pub fn next_wait(repeat: Duration, elapsed: Duration) -> Duration {
    repeat.saturating_sub(elapsed)
}

pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    repeat: Duration,
}

impl Scheduler {
    /// Run `reconciler` every `repeat_interval` of its config.
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        let repeat = reconciler.config().repeat_interval;
        Self { reconciler, repeat }
    }

    /// Spawn the loop on the current tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        self.start_with_token(CancellationToken::new())
    }

    /// Spawn the loop, stopping when `token` is cancelled.
    pub fn start_with_token(self, token: CancellationToken) -> SchedulerHandle {
        let task = tokio::spawn(run_loop(self.reconciler, self.repeat, token.clone()));
        SchedulerHandle { token, task }
    }
}

/// Control handle for a running [`Scheduler`].
pub struct SchedulerHandle {
    token: CancellationToken,
    task: JoinHandle<u64>,
}

impl SchedulerHandle {
    /// Ask the loop to stop after the current cycle. Safe to call more than once.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for the loop to exit. Returns the number of cycles run.
    pub async fn join(self) -> Result<u64, JoinError> {
        self.task.await
    }
}

async fn run_loop(
    reconciler: Arc<Reconciler>,
    repeat: Duration,
    token: CancellationToken,
) -> u64 {
    let mut cycles = 0u64;
    let mut wait = Duration::ZERO;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let start = Instant::now();
        match reconciler.run_cycle().await {
            Ok(report) => debug!(%report, "cycle finished"),
            Err(e) => error!(error = %e, "reconciliation cycle failed, retrying next interval"),
        }
        cycles += 1;

        let elapsed = start.elapsed();
        wait = next_wait(repeat, elapsed);
        debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            wait_ms = wait.as_millis() as u64,
            "next cycle scheduled"
        );
    }

    info!(cycles, "scheduler stopped");
    cycles
}
