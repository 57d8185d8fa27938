//! Per-user session runtime
//!
//! A session bundles everything one user's in-flight task needs: the
//! output channel back to the operator, the cooperative cancellation
//! flag, and the table of pending decision gates keyed by correlation
//! id.
//!
//! Lock discipline: the gate table is behind a plain mutex and every
//! critical section is short and non-awaiting. Resolution takes the
//! sender out under the lock and signals the waiter after releasing it,
//! so the callback path can never deadlock against a suspended waiter.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::gate::{Gate, GateKind, GateOutcome, GateState, ResolveStatus};
use crate::notify::{Notifier, ProgressUpdate};

/// Runtime context for one user's in-flight task.
pub struct Session {
    user_id: String,
    notifier: Arc<dyn Notifier>,
    cancelled: AtomicBool,
    gates: Mutex<HashMap<String, GateState>>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            user_id: user_id.into(),
            notifier,
            cancelled: AtomicBool::new(false),
            gates: Mutex::new(HashMap::new()),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Create a pending gate and return the waiter half.
    ///
    /// The correlation id is unique for the session's lifetime (uuid
    /// based); the caller embeds it in the outbound prompt.
    pub fn new_gate(&self, kind: GateKind) -> Gate {
        let (tx, rx) = oneshot::channel();
        let mut gates = self.gates.lock();
        // uuid collisions are not a practical concern, but the table is
        // the source of truth, so regenerate rather than clobber.
        let mut correlation_id = kind.new_correlation_id();
        while gates.contains_key(&correlation_id) {
            correlation_id = kind.new_correlation_id();
        }
        gates.insert(correlation_id.clone(), GateState::Pending { kind, tx });
        debug!(user_id = %self.user_id, correlation_id = %correlation_id, "gate opened");
        Gate::new(correlation_id, kind, rx)
    }

    /// Suspend the task until the gate leaves `pending`, then drop the
    /// table entry now that its outcome has been observed.
    pub async fn await_gate(&self, gate: Gate) -> GateOutcome {
        let (correlation_id, outcome) = gate.wait().await;
        self.gates.lock().remove(&correlation_id);
        debug!(
            user_id = %self.user_id,
            correlation_id = %correlation_id,
            ?outcome,
            "gate observed"
        );
        outcome
    }

    /// Resolve a pending gate. Called from the callback path.
    ///
    /// First resolution wins; a second call for the same id returns
    /// `AlreadyResolved` and its outcome is discarded. Unknown ids are
    /// `NotFound` — callers treat both as benign.
    pub fn resolve(&self, correlation_id: &str, outcome: bool) -> ResolveStatus {
        let pending = {
            let mut gates = self.gates.lock();
            match gates.get_mut(correlation_id) {
                None => return ResolveStatus::NotFound,
                Some(state) => match state.take_pending() {
                    None => return ResolveStatus::AlreadyResolved,
                    Some((kind, tx)) => (kind, tx),
                },
            }
        };
        let (kind, tx) = pending;
        // Signal outside the table lock. A send failure means the
        // waiter already gave up (session teardown raced us); the
        // tombstone stays until teardown drains the table.
        if tx.send(GateOutcome::Resolved(outcome)).is_err() {
            warn!(
                user_id = %self.user_id,
                correlation_id = %correlation_id,
                "gate resolved but waiter was gone"
            );
        } else {
            debug!(
                user_id = %self.user_id,
                correlation_id = %correlation_id,
                ?kind,
                outcome,
                "gate resolved"
            );
        }
        ResolveStatus::Resolved
    }

    /// Force-resolve every pending gate to `Abandoned` and wake its
    /// waiter. Invoked during teardown; no waiter may be left blocked.
    pub fn abandon_all(&self) {
        let drained: Vec<(String, GateState)> = {
            let mut gates = self.gates.lock();
            gates.drain().collect()
        };
        for (correlation_id, mut state) in drained {
            if let Some((_, tx)) = state.take_pending() {
                let _ = tx.send(GateOutcome::Abandoned);
                debug!(
                    user_id = %self.user_id,
                    correlation_id = %correlation_id,
                    "gate abandoned"
                );
            }
        }
    }

    /// Cooperative cancellation flag. The task polls this between steps
    /// and terminates promptly; nothing is forcibly preempted.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Number of gates still in the table (pending or unobserved).
    pub fn gate_count(&self) -> usize {
        self.gates.lock().len()
    }

    /// Correlation ids currently in the table, for tests that need to
    /// resolve a gate opened inside a task.
    #[cfg(test)]
    pub(crate) fn test_pending_ids(&self) -> Vec<String> {
        self.gates.lock().keys().cloned().collect()
    }

    // High-level decision points, mirroring what a task calls at a
    // step boundary.

    /// Send a confirmation prompt and suspend until the operator
    /// answers or the session is torn down.
    ///
    /// Delivery failure is logged but the gate still awaits: the
    /// operator may never see the prompt, and the wait is unbounded by
    /// design, but teardown will release the waiter.
    pub async fn ask_confirmation(&self, message: &str) -> bool {
        let gate = self.new_gate(GateKind::Confirmation);
        if let Err(e) = self
            .notifier
            .send_confirmation_prompt(message, gate.correlation_id())
            .await
        {
            warn!(user_id = %self.user_id, error = %e, "failed to send confirmation prompt");
        }
        self.await_gate(gate).await.confirmed()
    }

    /// Send a takeover prompt and suspend until the operator reports
    /// the manual intervention is done (or the session is torn down).
    pub async fn ask_takeover(&self, message: &str) {
        let gate = self.new_gate(GateKind::Takeover);
        if let Err(e) = self
            .notifier
            .send_takeover_prompt(message, gate.correlation_id())
            .await
        {
            warn!(user_id = %self.user_id, error = %e, "failed to send takeover prompt");
        }
        self.await_gate(gate).await;
    }

    /// Best-effort text delivery to the operator.
    pub async fn send_text(&self, text: &str) {
        if let Err(e) = self.notifier.send_text(text).await {
            warn!(user_id = %self.user_id, error = %e, "failed to send message");
        }
    }

    /// Best-effort progress card delivery.
    pub async fn send_progress(&self, update: &ProgressUpdate) {
        if let Err(e) = self.notifier.send_progress(update).await {
            warn!(user_id = %self.user_id, error = %e, "failed to send progress update");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("cancelled", &self.is_cancelled())
            .field("gates", &self.gate_count())
            .finish()
    }
}
