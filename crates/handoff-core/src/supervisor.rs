//! Task supervisor
//!
//! Orchestrates one task's lifecycle against a session: authorization,
//! exclusivity, start/finish notices, error containment, and the
//! guaranteed registry cleanup. Nothing a single user's task does may
//! propagate past `run` — the transport glue above must stay alive for
//! everyone else.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::notify::{Authorizer, NotifierFactory};
use crate::registry::SessionRegistry;
use crate::session::Session;

/// The automated task a session hosts. Implementations call back into
/// the session for progress, confirmation, and takeover at their own
/// step boundaries, and are expected to poll `is_cancelled` between
/// steps.
#[async_trait]
pub trait Task: Send + Sync {
    /// Execute `instruction` to completion, returning a short summary.
    async fn run(&self, session: Arc<Session>, instruction: &str) -> Result<String>;
}

/// Terminal state of one supervised task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Completed(String),
    Failed(String),
    Cancelled,
    /// Rejected up front: the user already had a live session.
    Busy,
    /// Rejected up front: the user is not on the allow list.
    Unauthorized,
}

/// Runs `abandon_all` + `release` exactly once when dropped, on every
/// exit path out of `run` — normal completion, task error, or panic.
struct SessionGuard {
    registry: Arc<SessionRegistry>,
    session: Arc<Session>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.abandon_all();
        self.registry.release(self.session.user_id());
    }
}

/// Supervises task runs against the session registry.
pub struct TaskSupervisor {
    registry: Arc<SessionRegistry>,
    notifiers: NotifierFactory,
    authorizer: Arc<dyn Authorizer>,
    task: Arc<dyn Task>,
}

impl TaskSupervisor {
    pub fn new(
        registry: Arc<SessionRegistry>,
        notifiers: NotifierFactory,
        authorizer: Arc<dyn Authorizer>,
        task: Arc<dyn Task>,
    ) -> Self {
        Self {
            registry,
            notifiers,
            authorizer,
            task,
        }
    }

    /// Run one instruction for one user, end to end.
    ///
    /// Rejections (unauthorized, busy) are reported to the operator and
    /// returned without creating a session. Task failures are contained
    /// here: surfaced to the operator as a short message, logged in
    /// full, never re-raised.
    pub async fn run(&self, user_id: &str, instruction: &str) -> TaskResult {
        let notifier = (self.notifiers)(user_id);

        if !self.authorizer.is_allowed(user_id).await {
            warn!(user_id, "unauthorized task attempt");
            if let Err(e) = notifier.send_text("Unauthorized user.").await {
                warn!(user_id, error = %e, "failed to send unauthorized notice");
            }
            return TaskResult::Unauthorized;
        }

        let session = match self.registry.try_acquire(user_id, notifier.clone()) {
            Ok(session) => session,
            Err(Error::Busy(_)) => {
                info!(user_id, "instruction rejected, another task is running");
                if let Err(e) = notifier
                    .send_text("Another task is already running. Cancel it or wait for it to finish.")
                    .await
                {
                    warn!(user_id, error = %e, "failed to send busy notice");
                }
                return TaskResult::Busy;
            }
            Err(e) => {
                error!(user_id, error = %e, "session acquisition failed");
                return TaskResult::Failed(e.to_string());
            }
        };

        let _guard = SessionGuard {
            registry: self.registry.clone(),
            session: session.clone(),
        };

        session
            .send_text(&format!("Starting task: {instruction}"))
            .await;

        match self.task.run(session.clone(), instruction).await {
            Ok(summary) => {
                if session.is_cancelled() {
                    info!(user_id, "task cancelled");
                    session.send_text("Task cancelled.").await;
                    TaskResult::Cancelled
                } else {
                    info!(user_id, summary = %summary, "task completed");
                    TaskResult::Completed(summary)
                }
            }
            Err(Error::Cancelled) => {
                info!(user_id, "task cancelled");
                session.send_text("Task cancelled.").await;
                TaskResult::Cancelled
            }
            Err(e) => {
                error!(user_id, error = %e, "task failed");
                session.send_text(&format!("Error: {e}")).await;
                TaskResult::Failed(e.to_string())
            }
        }
        // _guard drops here: abandon_all + release on every path.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{AllowList, Notifier, NullNotifier};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::timeout;

    fn null_factory() -> NotifierFactory {
        Arc::new(|_user_id: &str| Arc::new(NullNotifier) as Arc<dyn Notifier>)
    }

    fn allow(users: &[&str]) -> Arc<dyn Authorizer> {
        Arc::new(AllowList::new(users.iter().map(|u| u.to_string()).collect()))
    }

    struct OkTask;

    #[async_trait]
    impl Task for OkTask {
        async fn run(&self, _session: Arc<Session>, instruction: &str) -> Result<String> {
            Ok(format!("done: {instruction}"))
        }
    }

    struct FailingTask;

    #[async_trait]
    impl Task for FailingTask {
        async fn run(&self, _session: Arc<Session>, _instruction: &str) -> Result<String> {
            Err(Error::Task("device unreachable".to_string()))
        }
    }

    /// Opens a confirmation gate and reports which way it went.
    struct ConfirmingTask;

    #[async_trait]
    impl Task for ConfirmingTask {
        async fn run(&self, session: Arc<Session>, _instruction: &str) -> Result<String> {
            if session.ask_confirmation("Proceed with the risky step?").await {
                Ok("confirmed".to_string())
            } else {
                Ok("declined".to_string())
            }
        }
    }

    fn supervisor(task: Arc<dyn Task>) -> (Arc<SessionRegistry>, TaskSupervisor) {
        let registry = Arc::new(SessionRegistry::new());
        let sup = TaskSupervisor::new(registry.clone(), null_factory(), allow(&["ou_u1"]), task);
        (registry, sup)
    }

    #[tokio::test]
    async fn test_run_completes_and_releases() {
        let (registry, sup) = supervisor(Arc::new(OkTask));
        let result = sup.run("ou_u1", "tidy the desktop").await;
        assert_eq!(result, TaskResult::Completed("done: tidy the desktop".to_string()));
        assert_eq!(registry.session_count(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_short_circuits() {
        let (registry, sup) = supervisor(Arc::new(OkTask));
        let result = sup.run("ou_stranger", "anything").await;
        assert_eq!(result, TaskResult::Unauthorized);
        assert_eq!(registry.session_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_contained_and_released() {
        let (registry, sup) = supervisor(Arc::new(FailingTask));
        let result = sup.run("ou_u1", "anything").await;
        assert_eq!(result, TaskResult::Failed("task error: device unreachable".to_string()));
        assert_eq!(registry.session_count(), 0);
    }

    #[tokio::test]
    async fn test_busy_while_first_task_blocked_on_gate() {
        let (registry, sup) = supervisor(Arc::new(ConfirmingTask));
        let sup = Arc::new(sup);

        let first = {
            let sup = sup.clone();
            tokio::spawn(async move { sup.run("ou_u1", "step one").await })
        };

        // Wait until the first run holds the session and is suspended.
        while registry.session_count() == 0 {
            tokio::task::yield_now().await;
        }

        let second = sup.run("ou_u1", "step two").await;
        assert_eq!(second, TaskResult::Busy);

        // Release the first task via its gate, the way a card action would.
        let session = registry.lookup("ou_u1").unwrap();
        while session.gate_count() == 0 {
            tokio::task::yield_now().await;
        }
        let gate_id = session.test_pending_ids().remove(0);
        let router = crate::router::CallbackRouter::new(registry.clone());
        router.dispatch("ou_u1", &gate_id, crate::event::ActionKind::Confirm);

        let result = timeout(Duration::from_secs(1), first).await.unwrap().unwrap();
        assert_eq!(result, TaskResult::Completed("confirmed".to_string()));
        assert_eq!(registry.session_count(), 0);
    }

    struct CountingTask {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Task for CountingTask {
        async fn run(&self, _session: Arc<Session>, _instruction: &str) -> Result<String> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok("ok".to_string())
        }
    }

    #[tokio::test]
    async fn test_sequential_runs_reuse_slot() {
        let task = Arc::new(CountingTask { runs: AtomicUsize::new(0) });
        let registry = Arc::new(SessionRegistry::new());
        let sup = TaskSupervisor::new(
            registry.clone(),
            null_factory(),
            allow(&["ou_u1"]),
            task.clone(),
        );

        assert_eq!(sup.run("ou_u1", "one").await, TaskResult::Completed("ok".to_string()));
        assert_eq!(sup.run("ou_u1", "two").await, TaskResult::Completed("ok".to_string()));
        assert_eq!(task.runs.load(Ordering::SeqCst), 2);
    }
}
