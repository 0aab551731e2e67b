//! The poll loop that drives scan, dispatch and bookkeeping.
//!
//! A [`ReminderScheduler`] owns its own timer task and cancellation token, so
//! any number of independent instances can exist. Cycles are serialized by a
//! lock shared between the timer task and [`ReminderScheduler::run_once`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::compose::compose;
use crate::constants::{DEFAULT_POLL_INTERVAL, DEFAULT_SEND_TIMEOUT};
use crate::dispatch::Dispatcher;
use crate::local_time::Clock;
use crate::messenger::Messenger;
use crate::pending::due_reminders;
use crate::store::ReminderStore;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between the starts of consecutive cycles
    pub poll_interval: Duration,
    /// Upper bound on each individual delivery call
    pub send_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

/// Counts from one scan-dispatch-mark cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Due reminders handled this cycle
    pub processed: usize,
    /// Reminders that reached at least one recipient
    pub sent: usize,
}

struct Pipeline {
    store: Arc<dyn ReminderStore>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    cycle_lock: AsyncMutex<()>,
}

impl Pipeline {
    async fn run_cycle(&self) -> CycleSummary {
        let _cycle = self.cycle_lock.lock().await;
        let now = self.clock.now();

        let due = match due_reminders(self.store.as_ref(), now).await {
            Ok(due) => due,
            Err(e) => {
                error!("Failed to query due reminders: {}", e);
                return CycleSummary::default();
            }
        };

        if due.is_empty() {
            debug!(%now, "No reminders due");
            return CycleSummary::default();
        }

        let mut summary = CycleSummary::default();
        for pending in due {
            let message = compose(&pending.event, &pending.reminder);
            let report = self
                .dispatcher
                .dispatch(&pending.event, &pending.reminder, &message)
                .await;

            summary.processed += 1;
            if report.any_sent() {
                summary.sent += 1;
            } else {
                warn!(reminder_id = pending.reminder.id, "Reminder reached no recipients");
            }

            // Marked whatever the delivery outcome; a failed mark means a resend next cycle.
            if let Err(e) = self
                .store
                .mark_reminder_notified(pending.reminder.id, self.clock.now())
                .await
            {
                error!(
                    reminder_id = pending.reminder.id,
                    "Failed to mark reminder notified: {}", e
                );
            }
        }

        info!(
            processed = summary.processed,
            sent = summary.sent,
            "Reminder cycle complete"
        );
        summary
    }

    /// A cycle that panics is logged and counted as empty.
    async fn run_cycle_contained(&self) -> CycleSummary {
        match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
            Ok(summary) => summary,
            Err(panic) => {
                error!("Reminder cycle panicked: {}", panic_message(panic.as_ref()));
                CycleSummary::default()
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Runs reminder cycles on a fixed interval, starting with one immediate cycle.
pub struct ReminderScheduler {
    pipeline: Arc<Pipeline>,
    poll_interval: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        let dispatcher =
            Dispatcher::new(store.clone(), messenger).with_send_timeout(config.send_timeout);

        ReminderScheduler {
            pipeline: Arc::new(Pipeline {
                store,
                dispatcher,
                clock,
                cycle_lock: AsyncMutex::new(()),
            }),
            poll_interval: config.poll_interval.max(MIN_POLL_INTERVAL),
            running: Mutex::new(None),
        }
    }

    fn running(&self) -> MutexGuard<'_, Option<RunningLoop>> {
        self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.running()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Spawn the timer task. Does nothing if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut running = self.running();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("Reminder scheduler already running");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.pipeline.clone(),
            self.poll_interval,
            cancel.clone(),
        ));
        *running = Some(RunningLoop { cancel, handle });

        info!(
            interval = %humantime::format_duration(self.poll_interval),
            "Reminder scheduler started"
        );
    }

    /// Cancel the timer and wait for an in-flight cycle to finish.
    /// Does nothing if the scheduler is not running.
    pub async fn stop(&self) {
        let Some(running) = self.running().take() else {
            return;
        };

        running.cancel.cancel();
        if let Err(e) = running.handle.await {
            error!("Reminder loop ended abnormally: {}", e);
        }
        info!("Reminder scheduler stopped");
    }

    /// Perform exactly one cycle, waiting for any cycle already in progress.
    pub async fn run_once(&self) -> CycleSummary {
        self.pipeline.run_cycle_contained().await
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running().take() {
            running.cancel.cancel();
        }
    }
}

async fn run_loop(pipeline: Arc<Pipeline>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    // A cycle that overruns the period swallows the ticks it covered.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                pipeline.run_cycle_contained().await;
            }
        }
    }
}
