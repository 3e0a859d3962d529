//! Background refresh task.

use std::sync::Weak;
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Something the poller refreshes on every tick.
#[async_trait]
pub(crate) trait Tick: Send + Sync {
    /// Run one refresh. Returns false when polling should end.
    async fn tick(&self) -> bool;
}

/// An owned polling task. Dropping it aborts the task.
#[derive(Debug)]
pub(crate) struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    /// Spawn a task calling `target.tick()` every `period`, starting one
    /// period from now.
    ///
    /// The task holds only a weak reference and ends once the target is gone.
    pub(crate) fn spawn(runtime: &Handle, target: Weak<dyn Tick>, period: Duration) -> Self {
        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(target) = target.upgrade() else {
                    break;
                };
                if !target.tick().await {
                    break;
                }
            }
            tracing::debug!("poller stopped");
        });

        Self { handle }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
