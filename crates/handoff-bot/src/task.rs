//! Dry-run task backend
//!
//! The real automation backend (the thing that actually drives a device
//! or desktop) plugs in as a `Task` implementation. This crate ships a
//! scripted stand-in that walks the full gating protocol — progress,
//! confirmation, takeover — so the relay can be deployed and exercised
//! end to end before a backend exists.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use handoff_core::{Error, ProgressUpdate, Result, Session, Task};

pub struct DryRunTask;

#[async_trait]
impl Task for DryRunTask {
    async fn run(&self, session: Arc<Session>, instruction: &str) -> Result<String> {
        info!(instruction, "dry run starting");

        session
            .send_progress(&ProgressUpdate {
                step_num: 1,
                total_steps: 3,
                thinking: format!("Planning how to carry out: {instruction}"),
                action: "plan".to_string(),
            })
            .await;
        if session.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if !session
            .ask_confirmation(&format!("Execute \"{instruction}\"?"))
            .await
        {
            return Ok("stopped before execution".to_string());
        }
        if session.is_cancelled() {
            return Err(Error::Cancelled);
        }

        session
            .send_progress(&ProgressUpdate {
                step_num: 2,
                total_steps: 3,
                thinking: "This step needs a human at the controls.".to_string(),
                action: "handoff".to_string(),
            })
            .await;
        session
            .ask_takeover("Manual step: complete it on the device, then press Done.")
            .await;
        if session.is_cancelled() {
            return Err(Error::Cancelled);
        }

        session
            .send_progress(&ProgressUpdate {
                step_num: 3,
                total_steps: 3,
                thinking: "Wrapping up.".to_string(),
                action: "finish".to_string(),
            })
            .await;
        session.send_text("Dry run finished.").await;
        Ok(format!("dry run of \"{instruction}\" complete"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::{ActionKind, CallbackRouter, Notifier, SessionRegistry};
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::time::timeout;

    /// Captures the correlation ids of outbound prompts so the test can
    /// answer them the way a card action would.
    #[derive(Default)]
    struct PromptSpy {
        prompt_ids: Mutex<Vec<String>>,
    }

    impl PromptSpy {
        async fn next_prompt_id(&self) -> String {
            loop {
                if let Some(id) = self.prompt_ids.lock().pop() {
                    return id;
                }
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl Notifier for PromptSpy {
        async fn send_text(&self, _text: &str) -> Result<()> {
            Ok(())
        }
        async fn send_confirmation_prompt(&self, _m: &str, correlation_id: &str) -> Result<()> {
            self.prompt_ids.lock().push(correlation_id.to_string());
            Ok(())
        }
        async fn send_takeover_prompt(&self, _m: &str, correlation_id: &str) -> Result<()> {
            self.prompt_ids.lock().push(correlation_id.to_string());
            Ok(())
        }
        async fn send_progress(&self, _u: &ProgressUpdate) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dry_run_stops_when_declined() {
        let registry = Arc::new(SessionRegistry::new());
        let spy = Arc::new(PromptSpy::default());
        let session = registry
            .try_acquire("ou_u1", spy.clone() as Arc<dyn Notifier>)
            .unwrap();
        let router = CallbackRouter::new(registry.clone());

        let run = {
            let session = session.clone();
            tokio::spawn(async move { DryRunTask.run(session, "format the disk").await })
        };

        let correlation_id = spy.next_prompt_id().await;
        router.dispatch("ou_u1", &correlation_id, ActionKind::Cancel);

        let result = timeout(Duration::from_secs(2), run).await.unwrap().unwrap();
        assert_eq!(result.unwrap(), "stopped before execution");
    }

    #[tokio::test]
    async fn test_dry_run_full_walkthrough() {
        let registry = Arc::new(SessionRegistry::new());
        let spy = Arc::new(PromptSpy::default());
        let session = registry
            .try_acquire("ou_u1", spy.clone() as Arc<dyn Notifier>)
            .unwrap();
        let router = CallbackRouter::new(registry.clone());

        let run = {
            let session = session.clone();
            tokio::spawn(async move { DryRunTask.run(session, "open settings").await })
        };

        let confirm_id = spy.next_prompt_id().await;
        assert!(confirm_id.starts_with("confirm-"));
        router.dispatch("ou_u1", &confirm_id, ActionKind::Confirm);

        let takeover_id = spy.next_prompt_id().await;
        assert!(takeover_id.starts_with("takeover-"));
        router.dispatch("ou_u1", &takeover_id, ActionKind::TakeoverDone);

        let result = timeout(Duration::from_secs(2), run).await.unwrap().unwrap();
        assert_eq!(result.unwrap(), "dry run of \"open settings\" complete");
    }
}
