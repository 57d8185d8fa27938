//! Lark open-platform HTTP client
//!
//! Thin wrapper over the REST API: tenant access token with expiry
//! caching, message creation, and image upload. All failures surface as
//! `Error::Delivery`; callers treat delivery as best-effort.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use handoff_core::error::{Error, Result};

/// Refresh the cached token this long before it actually expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Client for one Lark application.
pub struct LarkClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: String,
    /// Seconds until expiry
    #[serde(default)]
    expire: i64,
}

#[derive(Deserialize)]
struct ApiResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}

impl LarkClient {
    pub fn new(base_url: impl Into<String>, app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            token: Mutex::new(None),
        }
    }

    /// Tenant access token, fetched lazily and cached until shortly
    /// before expiry.
    async fn tenant_access_token(&self) -> Result<String> {
        if let Some(cached) = self.token.lock().clone() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.token);
            }
        }

        let url = format!("{}/open-apis/auth/v3/tenant_access_token/internal", self.base_url);
        let resp: TokenResponse = self
            .http
            .post(&url)
            .json(&json!({ "app_id": self.app_id, "app_secret": self.app_secret }))
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("token request failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Delivery(format!("token response unreadable: {e}")))?;

        if resp.code != 0 {
            return Err(Error::Delivery(format!(
                "token request rejected: code={} msg={}",
                resp.code, resp.msg
            )));
        }

        let expires_at =
            Utc::now() + Duration::seconds(resp.expire.max(TOKEN_REFRESH_MARGIN_SECS) - TOKEN_REFRESH_MARGIN_SECS);
        *self.token.lock() = Some(CachedToken {
            token: resp.tenant_access_token.clone(),
            expires_at,
        });
        debug!("tenant access token refreshed");
        Ok(resp.tenant_access_token)
    }

    /// Create a message. `content` is the platform's content object for
    /// the given `msg_type` (it goes over the wire as a JSON string).
    pub async fn send_message(
        &self,
        receive_id_type: &str,
        receive_id: &str,
        msg_type: &str,
        content: &Value,
    ) -> Result<()> {
        let token = self.tenant_access_token().await?;
        let url = format!(
            "{}/open-apis/im/v1/messages?receive_id_type={receive_id_type}",
            self.base_url
        );
        let body = json!({
            "receive_id": receive_id,
            "msg_type": msg_type,
            "content": serde_json::to_string(content)?,
        });

        let resp: ApiResponse = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("message send failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Delivery(format!("message response unreadable: {e}")))?;

        if resp.code != 0 {
            return Err(Error::Delivery(format!(
                "message rejected: code={} msg={}",
                resp.code, resp.msg
            )));
        }
        Ok(())
    }

    /// Upload an image for use in messages, returning its image key.
    pub async fn upload_image(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), size = bytes.len(), "uploading image");

        let token = self.tenant_access_token().await?;
        let url = format!("{}/open-apis/im/v1/images", self.base_url);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let form = reqwest::multipart::Form::new()
            .text("image_type", "message")
            .part("image", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let resp: ApiResponse = self
            .http
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("image upload failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Delivery(format!("image upload response unreadable: {e}")))?;

        if resp.code != 0 {
            return Err(Error::Delivery(format!(
                "image upload rejected: code={} msg={}",
                resp.code, resp.msg
            )));
        }

        let image_key = resp.data["image_key"]
            .as_str()
            .ok_or_else(|| Error::Delivery("image upload response missing image_key".to_string()))?
            .to_string();
        info!(image_key = %image_key, "image uploaded");
        Ok(image_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = LarkClient::new("https://open.feishu.cn/", "cli_abc", "shh");
        assert_eq!(client.base_url, "https://open.feishu.cn");
    }

    #[test]
    fn test_token_cache_respects_expiry() {
        let client = LarkClient::new("https://open.feishu.cn", "cli_abc", "shh");
        *client.token.lock() = Some(CachedToken {
            token: "t-1".to_string(),
            expires_at: Utc::now() - Duration::seconds(1),
        });
        // Expired entry must not be served; we can't hit the network in
        // tests, so just assert the cache check itself.
        let cached = client.token.lock().clone().unwrap();
        assert!(cached.expires_at <= Utc::now());
    }

    #[test]
    fn test_token_response_parses() {
        let resp: TokenResponse = serde_json::from_str(
            r#"{"code":0,"msg":"ok","tenant_access_token":"t-abc","expire":7200}"#,
        )
        .unwrap();
        assert_eq!(resp.code, 0);
        assert_eq!(resp.tenant_access_token, "t-abc");
        assert_eq!(resp.expire, 7200);
    }
}
