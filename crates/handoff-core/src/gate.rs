//! Decision gates
//!
//! A gate is a single-use rendezvous between a suspended task and one
//! future operator reply. The task holds the receiving half of a
//! oneshot channel; the sending half lives in its session's gate table
//! under an opaque correlation id that the outbound card embeds and the
//! platform echoes back.
//!
//! ## Design
//!
//! - Each gate gets its own oneshot channel; the waiter suspends on the
//!   receiver without holding any lock
//! - First resolution wins: resolving consumes the sender and leaves a
//!   `Resolved` tombstone so a duplicate callback is a logged no-op
//! - Teardown force-resolves every pending gate to `Abandoned` so no
//!   waiter blocks forever

use tokio::sync::oneshot;
use uuid::Uuid;

/// What kind of decision a gate is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    /// Binary confirm/cancel decision.
    Confirmation,
    /// Manual intervention; the operator only acknowledges completion.
    Takeover,
}

impl GateKind {
    /// Prefix used when generating correlation ids, so the id itself
    /// hints at what kind of card it belongs to.
    fn id_prefix(self) -> &'static str {
        match self {
            GateKind::Confirmation => "confirm",
            GateKind::Takeover => "takeover",
        }
    }

    /// Generate a fresh correlation id for a gate of this kind.
    pub(crate) fn new_correlation_id(self) -> String {
        format!("{}-{}", self.id_prefix(), Uuid::new_v4())
    }
}

/// Terminal outcome observed by a gate's waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// A callback resolved the gate. The flag is the confirmation
    /// outcome; for takeover gates it is always `true`.
    Resolved(bool),
    /// The owning session was torn down while the gate was pending.
    Abandoned,
}

impl GateOutcome {
    /// Collapse to the boolean a confirmation waiter cares about.
    /// Abandonment maps to the safe negative.
    pub fn confirmed(self) -> bool {
        matches!(self, GateOutcome::Resolved(true))
    }
}

/// Result of attempting to resolve a gate by correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    /// The waiter was woken with the given outcome.
    Resolved,
    /// The gate was already resolved; this outcome was discarded.
    AlreadyResolved,
    /// No gate with that correlation id exists (stale or bogus id).
    NotFound,
}

/// Table-side state of a gate.
///
/// `Resolved` stays in the table until the waiter observes the outcome
/// and removes the entry; that is what lets a duplicate callback be
/// distinguished from a stale id.
#[derive(Debug)]
pub(crate) enum GateState {
    Pending {
        kind: GateKind,
        tx: oneshot::Sender<GateOutcome>,
    },
    Resolved,
}

impl GateState {
    /// Transition `Pending -> Resolved`, handing back the sender so the
    /// caller can signal the waiter outside the table lock.
    pub(crate) fn take_pending(&mut self) -> Option<(GateKind, oneshot::Sender<GateOutcome>)> {
        match std::mem::replace(self, GateState::Resolved) {
            GateState::Pending { kind, tx } => Some((kind, tx)),
            GateState::Resolved => None,
        }
    }
}

/// Waiter half of a gate, held by the suspended task.
#[derive(Debug)]
pub struct Gate {
    correlation_id: String,
    kind: GateKind,
    rx: oneshot::Receiver<GateOutcome>,
}

impl Gate {
    pub(crate) fn new(
        correlation_id: String,
        kind: GateKind,
        rx: oneshot::Receiver<GateOutcome>,
    ) -> Self {
        Self {
            correlation_id,
            kind,
            rx,
        }
    }

    /// The opaque id embedded in the outbound card and echoed back by
    /// the platform.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    /// Suspend until the gate leaves `pending`.
    ///
    /// A dropped sender (session torn down without an explicit abandon
    /// signal) reads as `Abandoned`, so the waiter can never block
    /// forever once its session is gone.
    pub(crate) async fn wait(self) -> (String, GateOutcome) {
        let outcome = self.rx.await.unwrap_or(GateOutcome::Abandoned);
        (self.correlation_id, outcome)
    }
}
