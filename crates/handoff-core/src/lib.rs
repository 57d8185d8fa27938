//! Handoff Core - Human-in-the-loop gating between chat and automation
//!
//! This crate provides the core functionality for the Handoff relay:
//! - Decision gates: one-shot rendezvous points correlating a suspended
//!   task with exactly one future operator reply
//! - Per-user sessions with cooperative cancellation and a gate table
//! - A process-wide session registry enforcing one task per user
//! - A callback router mapping card actions onto pending gates
//! - A task supervisor guaranteeing registry cleanup on every exit path
//!
//! The chat platform itself (message delivery, card rendering, webhook
//! transport) lives behind the `Notifier` trait and the inbound event
//! enum; see the `handoff-lark` crate for the Lark implementation.

pub mod config;
pub mod error;
pub mod event;
pub mod gate;
pub mod notify;
pub mod registry;
pub mod router;
pub mod session;
pub mod supervisor;

pub use config::{Config, LarkConfig, WebhookConfig};
pub use error::{Error, Result};
pub use event::{ActionKind, InboundEvent};
pub use gate::{Gate, GateKind, GateOutcome, ResolveStatus};
pub use notify::{AllowList, Authorizer, Notifier, NotifierFactory, NullNotifier, ProgressUpdate};
pub use registry::SessionRegistry;
pub use router::CallbackRouter;
pub use session::Session;
pub use supervisor::{Task, TaskResult, TaskSupervisor};
