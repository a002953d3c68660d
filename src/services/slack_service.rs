use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::error::{Error, Result};
use crate::models::notification::ProgressMessage;

const SLACK_API_BASE: &str = "https://slack.com/api";

/// Delivery channel for pipeline progress messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: &str, message: &ProgressMessage) -> Result<()>;
}

#[derive(Clone)]
pub struct SlackNotifier {
    client: Client,
    bot_token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    pub fn new(client: Client, bot_token: String) -> Self {
        Self {
            client,
            bot_token,
            api_base: SLACK_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send(&self, channel: &str, message: &ProgressMessage) -> Result<()> {
        let payload = json!({
            "channel": channel,
            "text": fallback_text(message),
            "blocks": progress_blocks(message),
        });

        let resp = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        // Slack reports most failures as 200 with `ok: false`.
        let body: PostMessageResponse = resp.json().await?;
        if !body.ok {
            return Err(Error::Internal(format!(
                "slack rejected message: {}",
                body.error.unwrap_or_else(|| "unknown_error".to_string())
            )));
        }
        tracing::info!(channel, match_id = %message.match_id, "slack notification sent");
        Ok(())
    }
}

/// Used when Slack is disabled; records what would have been sent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, channel: &str, message: &ProgressMessage) -> Result<()> {
        tracing::info!(
            channel,
            match_id = %message.match_id,
            status = %message.status,
            "slack disabled, notification logged only"
        );
        Ok(())
    }
}

fn fallback_text(message: &ProgressMessage) -> String {
    format!(
        "{} {} moved to \"{}\"",
        message.status.emoji(),
        message.candidate_name,
        message.status_label
    )
}

/// Block Kit layout for a progress update.
pub fn progress_blocks(message: &ProgressMessage) -> JsonValue {
    let emoji = message.status.emoji();
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": format!("{} Progress update", emoji), "emoji": true }
        }),
        json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*Candidate:*\n{}", message.candidate_name) },
                { "type": "mrkdwn", "text": format!("*Company:*\n{}", message.company_name) }
            ]
        }),
    ];

    if let Some(title) = message.job_title.as_deref().filter(|t| !t.is_empty()) {
        blocks.push(json!({
            "type": "section",
            "fields": [{ "type": "mrkdwn", "text": format!("*Job:*\n{}", title) }]
        }));
    }

    blocks.push(json!({
        "type": "section",
        "fields": [{
            "type": "mrkdwn",
            "text": format!("*New status:*\n{} {}", emoji, message.status_label)
        }]
    }));

    if let Some(at) = message.event_date {
        blocks.push(json!({
            "type": "section",
            "fields": [{
                "type": "mrkdwn",
                "text": format!("*Date:*\n📅 {}", at.format("%Y-%m-%d %H:%M UTC"))
            }]
        }));
    }

    if let Some(notes) = message.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*Notes:*\n{}", notes) }
        }));
    }

    blocks.push(json!({
        "type": "actions",
        "elements": [{
            "type": "button",
            "text": { "type": "plain_text", "text": "View details", "emoji": true },
            "url": message.detail_url,
            "style": "primary"
        }]
    }));

    JsonValue::Array(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::status::MatchStatus;
    use axum::{
        extract::State,
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    fn message() -> ProgressMessage {
        ProgressMessage {
            match_id: "m1".into(),
            candidate_name: "Tanaka Yui".into(),
            company_name: "Acme Foods".into(),
            job_title: None,
            status: MatchStatus::Interview,
            status_label: "Interview (round 2)".into(),
            detail_url: "http://localhost:3000/progress/m1".into(),
            event_date: Some(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()),
            notes: Some("Bring portfolio".into()),
        }
    }

    #[test]
    fn blocks_include_optional_sections_only_when_present() {
        let blocks = progress_blocks(&message());
        let items = blocks.as_array().unwrap();
        // header, people, status, date, notes, actions
        assert_eq!(items.len(), 6);
        assert_eq!(items[0]["type"], "header");
        assert_eq!(items[5]["elements"][0]["url"], "http://localhost:3000/progress/m1");
        assert!(items[3]["fields"][0]["text"]
            .as_str()
            .unwrap()
            .contains("2024-03-01 10:30"));

        let mut bare = message();
        bare.event_date = None;
        bare.notes = None;
        bare.job_title = Some("Line cook".into());
        let items = progress_blocks(&bare);
        let items = items.as_array().unwrap();
        assert_eq!(items.len(), 5);
        assert!(items[2]["fields"][0]["text"].as_str().unwrap().contains("Line cook"));
    }

    #[test]
    fn fallback_text_uses_status_label() {
        assert_eq!(
            fallback_text(&message()),
            "🗓️ Tanaka Yui moved to \"Interview (round 2)\""
        );
    }

    /// Minimal `chat.postMessage` stand-in. Unknown channels get Slack's
    /// `ok: false` reply; a wrong token gets a 401.
    async fn fake_slack() -> (String, Arc<Mutex<Vec<JsonValue>>>) {
        let received: Arc<Mutex<Vec<JsonValue>>> = Arc::default();
        let app = Router::new()
            .route(
                "/chat.postMessage",
                post(
                    |State(received): State<Arc<Mutex<Vec<JsonValue>>>>,
                     headers: HeaderMap,
                     Json(body): Json<JsonValue>| async move {
                        if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
                            != Some("Bearer xoxb-test")
                        {
                            return (StatusCode::UNAUTHORIZED, Json(json!({ "ok": false })));
                        }
                        let reply = if body["channel"] == "C404" {
                            json!({ "ok": false, "error": "channel_not_found" })
                        } else {
                            json!({ "ok": true })
                        };
                        received.lock().unwrap().push(body);
                        (StatusCode::OK, Json(reply))
                    },
                ),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), received)
    }

    #[tokio::test]
    async fn slack_notifier_posts_blocks_and_surfaces_rejections() {
        let (base, received) = fake_slack().await;
        let notifier = SlackNotifier::new(Client::new(), "xoxb-test".into()).with_api_base(&base);

        notifier.send("U123", &message()).await.unwrap();
        {
            let sent = received.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert_eq!(sent[0]["channel"], "U123");
            assert_eq!(sent[0]["text"], fallback_text(&message()));
            assert_eq!(sent[0]["blocks"], progress_blocks(&message()));
        }

        let err = notifier.send("C404", &message()).await.unwrap_err();
        assert!(matches!(&err, Error::Internal(m) if m.contains("channel_not_found")), "{}", err);

        let wrong_token = SlackNotifier::new(Client::new(), "xoxb-other".into()).with_api_base(&base);
        assert!(matches!(
            wrong_token.send("U123", &message()).await,
            Err(Error::Reqwest(_))
        ));
    }
}
