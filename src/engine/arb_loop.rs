//! Cancellable periodic task driving the arbitrage cycle.
//!
//! At most one task runs at a time. `stop` only returns once the task has
//! exited, so no cycle starts after a stop has been acknowledged. A cycle that
//! is already in flight is allowed to finish.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_LOOP_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum LoopError {
    #[error("the arbitrage loop is already running")]
    AlreadyRunning,
    #[error("the arbitrage loop is not running")]
    NotRunning,
}

struct LoopHandle {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct ArbitrageLoop {
    interval: Duration,
    // Some(handle) iff a task is scheduled
    state: Mutex<Option<LoopHandle>>,
}

impl ArbitrageLoop {
    pub fn new(interval: Duration) -> Self {
        Self { interval, state: Mutex::new(None) }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn is_running(&self) -> bool {
        matches!(&*self.state.lock().await, Some(handle) if !handle.task.is_finished())
    }

    /// Spawn the periodic task. The first cycle runs immediately.
    #[instrument(skip_all, fields(interval_ms = self.interval.as_millis() as u64))]
    pub async fn start<F, Fut>(&self, tick: F) -> Result<(), LoopError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock().await;
        if let Some(handle) = state.as_ref() {
            if !handle.task.is_finished() {
                debug!("Start requested while running");
                return Err(LoopError::AlreadyRunning);
            }
            warn!("Previous arbitrage task ended on its own; replacing it");
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(drive(tick, self.interval, stop_rx));
        *state = Some(LoopHandle { stop_tx, task });
        info!("Arbitrage loop started");
        Ok(())
    }

    /// Signal the task and wait for it to exit.
    #[instrument(skip_all)]
    pub async fn stop(&self) -> Result<(), LoopError> {
        let mut state = self.state.lock().await;
        let handle = match state.take() {
            Some(handle) if !handle.task.is_finished() => handle,
            Some(_) | None => {
                debug!("Stop requested while stopped");
                return Err(LoopError::NotRunning);
            }
        };

        // The receiver may already be gone if the task just ended
        let _ = handle.stop_tx.send(());
        if let Err(e) = handle.task.await {
            warn!(error = %e, "Arbitrage task terminated abnormally");
        }
        info!("Arbitrage loop stopped");
        Ok(())
    }
}

async fn drive<F, Fut>(mut tick: F, period: Duration, mut stop_rx: oneshot::Receiver<()>)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles: u64 = 0;

    loop {
        tokio::select! {
            // Stop wins over a due tick
            biased;
            _ = &mut stop_rx => break,
            _ = interval.tick() => {
                cycles += 1;
                debug!(cycle = cycles, "Running scheduled cycle");
                tick().await;
            }
        }
    }
    debug!(cycles, "Arbitrage task exiting");
}
