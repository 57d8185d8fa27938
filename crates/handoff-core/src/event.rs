//! Inbound event model
//!
//! The platform delivers operator activity as independent webhook
//! callbacks. The transport layer normalizes them into this closed enum
//! so the rest of the system can match exhaustively; unrecognized kinds
//! are a distinct terminal case, not a fallback error.

use std::fmt;
use std::str::FromStr;

/// A normalized inbound event from the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// The operator sent a new instruction (plain text message).
    NewInstruction { user_id: String, text: String },
    /// The operator pressed a button on an interactive card.
    CardAction {
        user_id: String,
        correlation_id: String,
        action: ActionKind,
    },
    /// Anything else: unknown event types, non-text messages,
    /// malformed payloads. Logged and dropped by the caller.
    Unrecognized { event_type: String },
}

/// Button actions a card can report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Approve a pending confirmation.
    Confirm,
    /// Decline a pending confirmation; also signals task cancellation.
    Cancel,
    /// Acknowledge that a manual takeover is finished.
    TakeoverDone,
}

impl ActionKind {
    /// The outcome this action resolves a gate with.
    pub fn outcome(self) -> bool {
        match self {
            ActionKind::Confirm | ActionKind::TakeoverDone => true,
            ActionKind::Cancel => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Confirm => "confirm",
            ActionKind::Cancel => "cancel",
            ActionKind::TakeoverDone => "takeover_done",
        }
    }
}

impl FromStr for ActionKind {
    type Err = UnknownAction;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "confirm" => Ok(ActionKind::Confirm),
            "cancel" => Ok(ActionKind::Cancel),
            "takeover_done" => Ok(ActionKind::TakeoverDone),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a card reports an action string we don't know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown card action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}
