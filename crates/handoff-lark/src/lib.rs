//! Handoff Lark - Lark/Feishu transport for the Handoff relay
//!
//! Implements the collaborator contracts the core defines:
//! - `LarkClient`: REST client (tenant token cache, messages, images)
//! - `LarkNotifier`: the `Notifier` trait over interactive cards
//! - `webhook`: raw callback bodies -> the core's `InboundEvent`
//! - `cards`: interactive card JSON builders

pub mod cards;
pub mod client;
pub mod notifier;
pub mod webhook;

pub use client::LarkClient;
pub use notifier::LarkNotifier;
