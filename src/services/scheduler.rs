use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observable state of a registered task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Stopped,
}

struct TaskEntry {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Registry of periodic background tasks with explicit start/stop/status.
///
/// Each task runs its job once per period until cancelled through its watch
/// channel, so an update cycle can be driven and shut down from tests
/// without touching process lifecycle or signals.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, TaskEntry>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register and start a periodic task. The job runs immediately, then
    /// once per period. Re-registering a name stops the previous task first.
    pub async fn register<F, Fut>(&self, name: &str, period: Duration, mut job: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.stop(name).await;

        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!(task = %task_name, "Running scheduled task");
                        job().await;
                    }
                    _ = cancel_rx.changed() => {
                        info!(task = %task_name, "Scheduled task cancelled");
                        break;
                    }
                }
            }
        });

        self.tasks.lock().await.insert(
            name.to_string(),
            TaskEntry {
                cancel: cancel_tx,
                handle,
            },
        );
        info!(task = name, period_secs = period.as_secs(), "Scheduled task registered");
    }

    /// Cancel a task and wait for it to finish. Returns false if no task
    /// with that name was registered.
    pub async fn stop(&self, name: &str) -> bool {
        let entry = self.tasks.lock().await.remove(name);
        let Some(entry) = entry else {
            return false;
        };

        let _ = entry.cancel.send(true);
        if let Err(e) = entry.handle.await {
            if !e.is_cancelled() {
                warn!(task = name, error = %e, "Scheduled task ended abnormally");
            }
        }
        true
    }

    /// Cancel every registered task
    pub async fn stop_all(&self) {
        let names: Vec<String> = self.tasks.lock().await.keys().cloned().collect();
        for name in names {
            self.stop(&name).await;
        }
    }

    /// Snapshot of registered tasks and whether they are still running
    pub async fn status(&self) -> Vec<(String, TaskStatus)> {
        self.tasks
            .lock()
            .await
            .iter()
            .map(|(name, entry)| {
                let status = if entry.handle.is_finished() {
                    TaskStatus::Stopped
                } else {
                    TaskStatus::Running
                };
                (name.clone(), status)
            })
            .collect()
    }
}
