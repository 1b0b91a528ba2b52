//! DingTalk webhook notifications
//!
//! Delivers supervisor alerts to a DingTalk group robot as markdown cards.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{Result, SentinelError};

/// Outbound alert channel.
///
/// The supervisor treats delivery as best-effort: a failed send is logged
/// and the alert window still advances, so a flapping webhook cannot turn
/// into an alert storm.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, title: &str, body: &str) -> Result<()>;
}

/// DingTalk robot client
#[derive(Clone)]
pub struct DingTalkNotifier {
    client: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct DingTalkMessage {
    msgtype: String,
    markdown: DingTalkMarkdown,
}

#[derive(Serialize)]
struct DingTalkMarkdown {
    title: String,
    text: String,
}

/// Robot responses carry their own status; HTTP 200 alone does not mean
/// the message was accepted.
#[derive(Deserialize)]
struct DingTalkReply {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl DingTalkNotifier {
    pub fn new(webhook_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            webhook_url,
        })
    }
}

#[async_trait]
impl NotificationSink for DingTalkNotifier {
    async fn send(&self, title: &str, body: &str) -> Result<()> {
        let message = DingTalkMessage {
            msgtype: "markdown".to_string(),
            markdown: DingTalkMarkdown {
                title: title.to_string(),
                text: body.to_string(),
            },
        };

        let resp = self
            .client
            .post(&self.webhook_url)
            .json(&message)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("DingTalk notification failed: {} - {}", status, body);
            return Err(SentinelError::WebhookRejected {
                code: i64::from(status.as_u16()),
                message: body,
            });
        }

        let reply: DingTalkReply = resp.json().await?;
        if reply.errcode == 0 {
            debug!("DingTalk notification sent successfully");
            Ok(())
        } else {
            error!(
                "DingTalk robot rejected message: {} - {}",
                reply.errcode, reply.errmsg
            );
            Err(SentinelError::WebhookRejected {
                code: reply.errcode,
                message: reply.errmsg,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_payload_shape() {
        let message = DingTalkMessage {
            msgtype: "markdown".to_string(),
            markdown: DingTalkMarkdown {
                title: "Service monitor alert".to_string(),
                text: "### Service monitor alert: \n\n   pid: 42\n\n".to_string(),
            },
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["msgtype"], "markdown");
        assert_eq!(json["markdown"]["title"], "Service monitor alert");
        assert!(json["markdown"]["text"]
            .as_str()
            .unwrap()
            .starts_with("### "));
    }

    #[test]
    fn reply_parses_with_missing_fields() {
        let reply: DingTalkReply = serde_json::from_str("{}").unwrap();
        assert_eq!(reply.errcode, 0);
        assert!(reply.errmsg.is_empty());

        let reply: DingTalkReply =
            serde_json::from_str(r#"{"errcode":310000,"errmsg":"keywords not in content"}"#)
                .unwrap();
        assert_eq!(reply.errcode, 310000);
        assert_eq!(reply.errmsg, "keywords not in content");
    }
}
