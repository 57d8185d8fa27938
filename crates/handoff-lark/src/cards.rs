//! Interactive card builders
//!
//! Card JSON for the three interactive shapes the relay sends. Button
//! `value` payloads embed the correlation id under `msg_id` together
//! with the action string; the platform echoes them back verbatim in
//! the matching `card.action.trigger` event.

use serde_json::{Value, json};

/// Longest thinking preview shown on a progress card.
const THINKING_PREVIEW_LEN: usize = 200;

/// Confirm/cancel prompt card.
pub fn confirmation_card(message: &str, correlation_id: &str) -> Value {
    json!({
        "config": { "wide_screen_mode": true },
        "header": {
            "template": "orange",
            "title": { "tag": "plain_text", "content": "Confirmation required" }
        },
        "elements": [
            {
                "tag": "div",
                "text": { "tag": "lark_md", "content": message }
            },
            {
                "tag": "action",
                "actions": [
                    {
                        "tag": "button",
                        "text": { "tag": "plain_text", "content": "Confirm" },
                        "type": "primary",
                        "value": action_value("confirm", correlation_id)
                    },
                    {
                        "tag": "button",
                        "text": { "tag": "plain_text", "content": "Cancel" },
                        "type": "default",
                        "value": action_value("cancel", correlation_id)
                    }
                ]
            }
        ]
    })
}

/// Manual-takeover prompt card with a single Done button.
pub fn takeover_card(message: &str, correlation_id: &str) -> Value {
    json!({
        "config": { "wide_screen_mode": true },
        "header": {
            "template": "red",
            "title": { "tag": "plain_text", "content": "Manual action required" }
        },
        "elements": [
            {
                "tag": "div",
                "text": {
                    "tag": "lark_md",
                    "content": format!("{message}\n\nPress the button below when done.")
                }
            },
            {
                "tag": "action",
                "actions": [
                    {
                        "tag": "button",
                        "text": { "tag": "plain_text", "content": "Done" },
                        "type": "primary",
                        "value": action_value("takeover_done", correlation_id)
                    }
                ]
            }
        ]
    })
}

/// Step progress card.
pub fn progress_card(step_num: usize, total_steps: usize, thinking: &str, action: &str) -> Value {
    let preview = if thinking.chars().count() > THINKING_PREVIEW_LEN {
        let truncated: String = thinking.chars().take(THINKING_PREVIEW_LEN).collect();
        format!("{truncated}...")
    } else {
        thinking.to_string()
    };

    json!({
        "config": { "wide_screen_mode": true },
        "header": {
            "template": "blue",
            "title": { "tag": "plain_text", "content": format!("Step {step_num}/{total_steps}") }
        },
        "elements": [
            {
                "tag": "div",
                "fields": [
                    {
                        "is_short": false,
                        "text": { "tag": "lark_md", "content": format!("**Thinking:**\n{preview}") }
                    },
                    {
                        "is_short": false,
                        "text": { "tag": "lark_md", "content": format!("**Action:** {action}") }
                    }
                ]
            }
        ]
    })
}

/// Button value payload, serialized as a string because the platform
/// round-trips it opaquely.
fn action_value(action: &str, correlation_id: &str) -> String {
    json!({ "action": action, "msg_id": correlation_id }).to_string()
}
