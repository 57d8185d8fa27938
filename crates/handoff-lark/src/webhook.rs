//! Webhook payload parsing
//!
//! Normalizes raw open-platform event bodies into the core's closed
//! `InboundEvent` enum. Payloads are wire input and may be malformed or
//! hostile; everything that doesn't parse cleanly degrades to
//! `Unrecognized` with a logged warning, never an error.

use serde_json::Value;
use tracing::{debug, warn};

use handoff_core::{ActionKind, InboundEvent};

/// The url_verification challenge, if this body is one. The platform
/// sends it once when the webhook endpoint is registered and expects
/// the challenge echoed back synchronously.
pub fn challenge(body: &Value) -> Option<String> {
    if body["type"].as_str() == Some("url_verification") {
        body["challenge"].as_str().map(|c| c.to_string())
    } else {
        None
    }
}

/// Normalize an event callback body.
pub fn parse_event(body: &Value) -> InboundEvent {
    let event_type = body["header"]["event_type"].as_str().unwrap_or("");

    match event_type {
        "im.message.receive_v1" => parse_message(&body["event"]),
        "card.action.trigger" => parse_card_action(&body["event"]),
        other => {
            debug!(event_type = other, "unrecognized event type");
            InboundEvent::Unrecognized {
                event_type: other.to_string(),
            }
        }
    }
}

fn unrecognized(event_type: &str, reason: &str) -> InboundEvent {
    warn!(event_type, reason, "dropping unusable event payload");
    InboundEvent::Unrecognized {
        event_type: event_type.to_string(),
    }
}

fn parse_message(event: &Value) -> InboundEvent {
    const TYPE: &str = "im.message.receive_v1";

    let Some(user_id) = event["sender"]["sender_id"]["open_id"].as_str() else {
        return unrecognized(TYPE, "missing sender open_id");
    };

    let message = &event["message"];
    if message["message_type"].as_str() != Some("text") {
        debug!(
            message_type = message["message_type"].as_str().unwrap_or("?"),
            "ignoring non-text message"
        );
        return InboundEvent::Unrecognized {
            event_type: TYPE.to_string(),
        };
    }

    // Message content is itself a JSON string: {"text": "..."}
    let text = message["content"]
        .as_str()
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .and_then(|content| content["text"].as_str().map(|t| t.trim().to_string()))
        .unwrap_or_default();

    if text.is_empty() {
        debug!("ignoring empty text message");
        return InboundEvent::Unrecognized {
            event_type: TYPE.to_string(),
        };
    }

    InboundEvent::NewInstruction {
        user_id: user_id.to_string(),
        text,
    }
}

fn parse_card_action(event: &Value) -> InboundEvent {
    const TYPE: &str = "card.action.trigger";

    let Some(user_id) = event["operator"]["open_id"].as_str() else {
        return unrecognized(TYPE, "missing operator open_id");
    };

    // Button values travel as an opaque JSON string, though some
    // platform versions deliver them pre-parsed.
    let value = match &event["action"]["value"] {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(v) => v,
            Err(_) => return unrecognized(TYPE, "action value is not valid JSON"),
        },
        v @ Value::Object(_) => v.clone(),
        _ => return unrecognized(TYPE, "action value missing"),
    };

    let Some(correlation_id) = value["msg_id"].as_str() else {
        return unrecognized(TYPE, "action value missing msg_id");
    };
    let Some(action) = value["action"].as_str().and_then(|a| a.parse::<ActionKind>().ok()) else {
        return unrecognized(TYPE, "unknown action kind");
    };

    InboundEvent::CardAction {
        user_id: user_id.to_string(),
        correlation_id: correlation_id.to_string(),
        action,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::ActionKind;
    use serde_json::json;

    #[test]
    fn test_challenge_detection() {
        let body = json!({ "type": "url_verification", "challenge": "c-123" });
        assert_eq!(challenge(&body), Some("c-123".to_string()));

        let body = json!({ "header": { "event_type": "im.message.receive_v1" } });
        assert_eq!(challenge(&body), None);
    }

    #[test]
    fn test_parse_text_message() {
        let body = json!({
            "header": { "event_type": "im.message.receive_v1" },
            "event": {
                "sender": { "sender_id": { "open_id": "ou_alice" } },
                "message": {
                    "message_type": "text",
                    "content": "{\"text\": \"  open the settings app  \"}"
                }
            }
        });
        assert_eq!(
            parse_event(&body),
            InboundEvent::NewInstruction {
                user_id: "ou_alice".to_string(),
                text: "open the settings app".to_string(),
            }
        );
    }

    #[test]
    fn test_non_text_message_dropped() {
        let body = json!({
            "header": { "event_type": "im.message.receive_v1" },
            "event": {
                "sender": { "sender_id": { "open_id": "ou_alice" } },
                "message": { "message_type": "image", "content": "{}" }
            }
        });
        assert!(matches!(parse_event(&body), InboundEvent::Unrecognized { .. }));
    }

    #[test]
    fn test_empty_text_dropped() {
        let body = json!({
            "header": { "event_type": "im.message.receive_v1" },
            "event": {
                "sender": { "sender_id": { "open_id": "ou_alice" } },
                "message": { "message_type": "text", "content": "{\"text\": \"   \"}" }
            }
        });
        assert!(matches!(parse_event(&body), InboundEvent::Unrecognized { .. }));
    }

    #[test]
    fn test_parse_card_action_string_value() {
        let body = json!({
            "header": { "event_type": "card.action.trigger" },
            "event": {
                "operator": { "open_id": "ou_alice" },
                "action": {
                    "value": "{\"action\": \"confirm\", \"msg_id\": \"confirm-42\"}"
                }
            }
        });
        assert_eq!(
            parse_event(&body),
            InboundEvent::CardAction {
                user_id: "ou_alice".to_string(),
                correlation_id: "confirm-42".to_string(),
                action: ActionKind::Confirm,
            }
        );
    }

    #[test]
    fn test_parse_card_action_object_value() {
        let body = json!({
            "header": { "event_type": "card.action.trigger" },
            "event": {
                "operator": { "open_id": "ou_bob" },
                "action": {
                    "value": { "action": "takeover_done", "msg_id": "takeover-7" }
                }
            }
        });
        assert_eq!(
            parse_event(&body),
            InboundEvent::CardAction {
                user_id: "ou_bob".to_string(),
                correlation_id: "takeover-7".to_string(),
                action: ActionKind::TakeoverDone,
            }
        );
    }

    #[test]
    fn test_malformed_action_value_dropped() {
        let body = json!({
            "header": { "event_type": "card.action.trigger" },
            "event": {
                "operator": { "open_id": "ou_alice" },
                "action": { "value": "{not json" }
            }
        });
        assert!(matches!(parse_event(&body), InboundEvent::Unrecognized { .. }));
    }

    #[test]
    fn test_unknown_action_kind_dropped() {
        let body = json!({
            "header": { "event_type": "card.action.trigger" },
            "event": {
                "operator": { "open_id": "ou_alice" },
                "action": {
                    "value": "{\"action\": \"snooze\", \"msg_id\": \"confirm-42\"}"
                }
            }
        });
        assert!(matches!(parse_event(&body), InboundEvent::Unrecognized { .. }));
    }

    #[test]
    fn test_unknown_event_type() {
        let body = json!({ "header": { "event_type": "im.chat.updated_v1" }, "event": {} });
        assert_eq!(
            parse_event(&body),
            InboundEvent::Unrecognized {
                event_type: "im.chat.updated_v1".to_string()
            }
        );
    }

    #[test]
    fn test_garbage_body() {
        assert!(matches!(
            parse_event(&json!("not an object")),
            InboundEvent::Unrecognized { .. }
        ));
        assert!(matches!(parse_event(&json!({})), InboundEvent::Unrecognized { .. }));
    }
}
