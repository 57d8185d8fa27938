//! `Notifier` implementation backed by the Lark client

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use handoff_core::error::Result;
use handoff_core::notify::{Notifier, NotifierFactory, ProgressUpdate};

use crate::cards;
use crate::client::LarkClient;

/// Sends messages and cards to one operator over Lark.
pub struct LarkNotifier {
    client: Arc<LarkClient>,
    receive_id_type: String,
    receive_id: String,
}

impl LarkNotifier {
    pub fn new(
        client: Arc<LarkClient>,
        receive_id_type: impl Into<String>,
        receive_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            receive_id_type: receive_id_type.into(),
            receive_id: receive_id.into(),
        }
    }

    /// Factory that binds notifiers to user ids as sessions come and go.
    pub fn factory(client: Arc<LarkClient>, receive_id_type: impl Into<String>) -> NotifierFactory {
        let receive_id_type = receive_id_type.into();
        Arc::new(move |user_id: &str| {
            Arc::new(LarkNotifier::new(
                client.clone(),
                receive_id_type.clone(),
                user_id,
            )) as Arc<dyn Notifier>
        })
    }

    /// Upload an image and send it, with an optional text caption as a
    /// follow-up message.
    pub async fn send_image(&self, path: &Path, caption: &str) -> Result<()> {
        let image_key = self.client.upload_image(path).await?;
        debug!(image_key = %image_key, "sending image message");
        self.client
            .send_message(
                &self.receive_id_type,
                &self.receive_id,
                "image",
                &json!({ "image_key": image_key }),
            )
            .await?;
        if !caption.is_empty() {
            self.send_text(caption).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for LarkNotifier {
    async fn send_text(&self, text: &str) -> Result<()> {
        self.client
            .send_message(
                &self.receive_id_type,
                &self.receive_id,
                "text",
                &json!({ "text": text }),
            )
            .await
    }

    async fn send_confirmation_prompt(&self, message: &str, correlation_id: &str) -> Result<()> {
        let card = cards::confirmation_card(message, correlation_id);
        self.client
            .send_message(&self.receive_id_type, &self.receive_id, "interactive", &card)
            .await
    }

    async fn send_takeover_prompt(&self, message: &str, correlation_id: &str) -> Result<()> {
        let card = cards::takeover_card(message, correlation_id);
        self.client
            .send_message(&self.receive_id_type, &self.receive_id, "interactive", &card)
            .await
    }

    async fn send_progress(&self, update: &ProgressUpdate) -> Result<()> {
        let card = cards::progress_card(
            update.step_num,
            update.total_steps,
            &update.thinking,
            &update.action,
        );
        self.client
            .send_message(&self.receive_id_type, &self.receive_id, "interactive", &card)
            .await
    }
}
