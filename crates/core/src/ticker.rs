//! Cancellable periodic task.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::trace;

/// Sends an event on a channel once per period until cancelled.
///
/// The task never touches the owner's state; the owner applies the events
/// it receives. Dropping the ticker cancels it.
#[derive(Debug)]
pub struct Ticker {
    handle: JoinHandle<()>,
    period: Duration,
}

impl Ticker {
    /// Spawn the ticker on the current Tokio runtime. The first event is
    /// sent one `period` after spawning.
    pub fn spawn<E, F>(period: Duration, sender: mpsc::Sender<E>, mut make_event: F) -> Self
    where
        E: Send + 'static,
        F: FnMut() -> E + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if sender.send(make_event()).await.is_err() {
                    trace!("ticker receiver closed");
                    break;
                }
            }
        });
        Self { handle, period }
    }

    /// Interval between events.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Whether the task has stopped, either cancelled or because the
    /// receiver went away.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task. Events already queued stay in the channel.
    pub fn cancel(self) {
        // Drop aborts the task.
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
