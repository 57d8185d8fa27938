//! Outbound notification and authorization seams
//!
//! The core never talks to the chat platform directly. Sessions hold a
//! `Notifier` for their operator, the supervisor gets them from a
//! `NotifierFactory`, and authorization is a trait so transports can
//! plug in whatever policy source they have.
//!
//! Delivery is best-effort by contract: callers log failures and move
//! on. In particular a gate still awaits its resolution even when the
//! prompt card failed to send.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// A progress report for one step of a running task.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub step_num: usize,
    pub total_steps: usize,
    /// Model/automation reasoning for this step; transports may truncate.
    pub thinking: String,
    /// Short name of the action being performed.
    pub action: String,
}

/// Delivers messages and interactive prompts to one operator.
///
/// A notifier is bound to a single recipient; the correlation id passed
/// to the prompt methods must be embedded such that the platform echoes
/// it back verbatim in the matching card action.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a plain text message.
    async fn send_text(&self, text: &str) -> Result<()>;

    /// Deliver a confirm/cancel prompt carrying `correlation_id`.
    async fn send_confirmation_prompt(&self, message: &str, correlation_id: &str) -> Result<()>;

    /// Deliver a manual-takeover prompt carrying `correlation_id`.
    async fn send_takeover_prompt(&self, message: &str, correlation_id: &str) -> Result<()>;

    /// Deliver a step progress card.
    async fn send_progress(&self, update: &ProgressUpdate) -> Result<()>;
}

/// Factory producing a notifier bound to the given user id.
pub type NotifierFactory = Arc<dyn Fn(&str) -> Arc<dyn Notifier> + Send + Sync>;

/// Decides whether a user may start tasks at all.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn is_allowed(&self, user_id: &str) -> bool;
}

/// Static allow-list authorizer.
pub struct AllowList {
    users: Vec<String>,
}

impl AllowList {
    pub fn new(users: Vec<String>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authorizer for AllowList {
    async fn is_allowed(&self, user_id: &str) -> bool {
        self.users.iter().any(|u| u == user_id)
    }
}

/// Notifier that drops everything on the floor.
///
/// Useful for standalone runs and tests where no platform is attached;
/// deliveries are traced at debug level and always succeed.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        tracing::debug!(text, "null notifier: text");
        Ok(())
    }

    async fn send_confirmation_prompt(&self, message: &str, correlation_id: &str) -> Result<()> {
        tracing::debug!(message, correlation_id, "null notifier: confirmation prompt");
        Ok(())
    }

    async fn send_takeover_prompt(&self, message: &str, correlation_id: &str) -> Result<()> {
        tracing::debug!(message, correlation_id, "null notifier: takeover prompt");
        Ok(())
    }

    async fn send_progress(&self, update: &ProgressUpdate) -> Result<()> {
        tracing::debug!(step = update.step_num, "null notifier: progress");
        Ok(())
    }
}
