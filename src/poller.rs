//! Observation loop for remote acquisition tasks.
//!
//! The poller turns "submit work, get a task id" into a suspension that
//! resolves when the task reaches a terminal status or the run is aborted.
//! It queries immediately, then waits a fixed interval between queries, and
//! never queries again after observing a terminal status. With no attempt
//! cap configured, a task that never settles is polled until `abort()` —
//! the documented liveness risk of the remote task contract.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::remote::{RemoteTaskStatus, TaskApi};

/// Terminal observation of one remote task.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Task reached `done`; carries its result payload if any.
    Done(Option<serde_json::Value>),
    /// Task reached `failed`; carries the backend's error message if any.
    Failed { error: Option<String> },
    /// We could not observe the task to a terminal state. Gated like a
    /// failure, but distinguishable so operators can tell "the crawl
    /// failed" from "we lost contact with the task system."
    LostContact { reason: String },
    /// The run was aborted while the task was still in flight.
    Cancelled,
}

pub struct TaskPoller {
    tasks: Arc<dyn TaskApi>,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl TaskPoller {
    pub fn new(tasks: Arc<dyn TaskApi>, interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            tasks,
            interval,
            max_attempts,
        }
    }

    /// Observe `task_id` until terminal, cancelled, or (if configured) the
    /// attempt cap is exhausted.
    pub async fn poll(
        &self,
        task_id: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> PollOutcome {
        let mut attempts: u32 = 0;

        loop {
            if *cancel.borrow() {
                return PollOutcome::Cancelled;
            }

            attempts += 1;
            match self.tasks.status(task_id).await {
                Ok(report) => match report.status {
                    RemoteTaskStatus::Done => {
                        debug!(task_id, attempts, "task reached done");
                        return PollOutcome::Done(report.result);
                    }
                    RemoteTaskStatus::Failed => {
                        debug!(task_id, attempts, "task reached failed");
                        return PollOutcome::Failed {
                            error: report.error,
                        };
                    }
                    RemoteTaskStatus::Queued | RemoteTaskStatus::Running => {}
                },
                Err(e) => {
                    warn!(task_id, error = %e, "task status query failed");
                    return PollOutcome::LostContact {
                        reason: format!("status query failed: {}", e),
                    };
                }
            }

            if let Some(max) = self.max_attempts
                && attempts >= max
            {
                return PollOutcome::LostContact {
                    reason: format!("gave up after {} status queries", attempts),
                };
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = cancel.changed() => {
                    // A dropped sender means the run that owned this poll is
                    // gone; stop observing either way.
                    if changed.is_err() || *cancel.borrow() {
                        return PollOutcome::Cancelled;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::errors::CollaboratorError;
    use crate::remote::{TaskHandle, TaskKind, TaskParams, TaskStatusReport};

    /// Replays a scripted status sequence; the final entry repeats forever.
    struct ScriptedTasks {
        script: Mutex<VecDeque<Result<TaskStatusReport, CollaboratorError>>>,
        queries: AtomicU32,
    }

    impl ScriptedTasks {
        fn new(script: Vec<Result<TaskStatusReport, CollaboratorError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                queries: AtomicU32::new(0),
            })
        }

        fn queries(&self) -> u32 {
            self.queries.load(Ordering::SeqCst)
        }
    }

    fn report(status: RemoteTaskStatus) -> Result<TaskStatusReport, CollaboratorError> {
        Ok(TaskStatusReport {
            status,
            result: None,
            error: None,
            created_at: Utc::now(),
        })
    }

    #[async_trait]
    impl TaskApi for ScriptedTasks {
        async fn submit(
            &self,
            _kind: TaskKind,
            _params: TaskParams,
        ) -> Result<TaskHandle, CollaboratorError> {
            Ok(TaskHandle {
                task_id: "task-1".to_string(),
            })
        }

        async fn status(&self, _task_id: &str) -> Result<TaskStatusReport, CollaboratorError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }
    }

    fn poller(tasks: Arc<ScriptedTasks>, max_attempts: Option<u32>) -> TaskPoller {
        TaskPoller::new(tasks, Duration::from_secs(5), max_attempts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_terminal_requires_single_query() {
        let tasks = ScriptedTasks::new(vec![report(RemoteTaskStatus::Done)]);
        let (_tx, mut rx) = watch::channel(false);

        let outcome = poller(tasks.clone(), None).poll("task-1", &mut rx).await;
        assert_eq!(outcome, PollOutcome::Done(None));
        assert_eq!(tasks.queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_through_queued_and_running_to_done() {
        let tasks = ScriptedTasks::new(vec![
            report(RemoteTaskStatus::Queued),
            report(RemoteTaskStatus::Running),
            report(RemoteTaskStatus::Done),
        ]);
        let (_tx, mut rx) = watch::channel(false);

        let outcome = poller(tasks.clone(), None).poll("task-1", &mut rx).await;
        assert_eq!(outcome, PollOutcome::Done(None));
        assert_eq!(tasks.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_task_carries_backend_error() {
        let tasks = ScriptedTasks::new(vec![Ok(TaskStatusReport {
            status: RemoteTaskStatus::Failed,
            result: None,
            error: Some("crawler crashed".to_string()),
            created_at: Utc::now(),
        })]);
        let (_tx, mut rx) = watch::channel(false);

        let outcome = poller(tasks, None).poll("task-1", &mut rx).await;
        assert_eq!(
            outcome,
            PollOutcome::Failed {
                error: Some("crawler crashed".to_string())
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_lost_contact() {
        let tasks = ScriptedTasks::new(vec![Err(CollaboratorError::transport(
            "/tasks/task-1",
            "timed out",
        ))]);
        let (_tx, mut rx) = watch::channel(false);

        let outcome = poller(tasks.clone(), None).poll("task-1", &mut rx).await;
        match outcome {
            PollOutcome::LostContact { reason } => {
                assert!(reason.starts_with("status query failed:"), "{reason}");
            }
            other => panic!("Expected LostContact, got {:?}", other),
        }
        assert_eq!(tasks.queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_interval_stops_polling() {
        // Never-terminal task; only cancellation can end the loop.
        let tasks = ScriptedTasks::new(vec![report(RemoteTaskStatus::Running)]);
        let (tx, mut rx) = watch::channel(false);

        let poller = poller(tasks.clone(), None);
        let handle = tokio::spawn(async move { poller.poll("task-1", &mut rx).await });

        // Let the first query land, then abort.
        tokio::task::yield_now().await;
        tx.send(true).unwrap();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(tasks.queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_never_queries() {
        let tasks = ScriptedTasks::new(vec![report(RemoteTaskStatus::Done)]);
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        let outcome = poller(tasks.clone(), None).poll("task-1", &mut rx).await;
        assert_eq!(outcome, PollOutcome::Cancelled);
        assert_eq!(tasks.queries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_gives_up() {
        let tasks = ScriptedTasks::new(vec![report(RemoteTaskStatus::Running)]);
        let (_tx, mut rx) = watch::channel(false);

        let outcome = poller(tasks.clone(), Some(3)).poll("task-1", &mut rx).await;
        assert_eq!(
            outcome,
            PollOutcome::LostContact {
                reason: "gave up after 3 status queries".to_string()
            }
        );
        assert_eq!(tasks.queries(), 3);
    }
}
