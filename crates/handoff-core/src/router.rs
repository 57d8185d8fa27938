//! Callback router
//!
//! Dispatches an inbound card action to the right gate inside the right
//! session. Correlation ids arrive from the wire and may be stale,
//! duplicated, or fabricated; every miss here is a logged no-op, never
//! a fault — the common benign race is a callback landing after the
//! user's task already finished.

use std::sync::Arc;

use tracing::{info, warn};

use crate::event::ActionKind;
use crate::gate::ResolveStatus;
use crate::registry::SessionRegistry;

/// Routes card actions to suspended gate waiters.
pub struct CallbackRouter {
    registry: Arc<SessionRegistry>,
}

impl CallbackRouter {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver one operator reply.
    ///
    /// `Cancel` carries a double meaning: it resolves its gate with the
    /// negative outcome and also raises the session's cooperative
    /// cancellation flag, which the task observes at its next step
    /// boundary. The flag is raised only when the cancel actually wins
    /// its gate — stale ids and duplicates must leave session state
    /// untouched.
    pub fn dispatch(&self, user_id: &str, correlation_id: &str, action: ActionKind) {
        let Some(session) = self.registry.lookup(user_id) else {
            warn!(user_id, correlation_id, "card action for user with no active session");
            return;
        };

        match session.resolve(correlation_id, action.outcome()) {
            ResolveStatus::Resolved => {
                if action == ActionKind::Cancel {
                    session.request_cancel();
                }
                info!(user_id, correlation_id, action = %action, "card action resolved gate");
            }
            ResolveStatus::AlreadyResolved => {
                info!(user_id, correlation_id, action = %action, "duplicate card action discarded");
            }
            ResolveStatus::NotFound => {
                warn!(user_id, correlation_id, action = %action, "stale correlation id, ignoring");
            }
        }
    }
}
