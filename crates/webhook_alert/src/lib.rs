//! Extra Innings Live — Webhook Alert
//!
//! Posts `{"content": "..."}` to a Discord-style webhook. Success is HTTP 204;
//! anything else is reported back as a [`DeliveryOutcome`], never as an error.

use async_trait::async_trait;
use mlb_monitor::Game;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{error, info, warn};

/// Longest response body kept in a rejection report.
const MAX_BODY_CHARS: usize = 300;

pub fn format_alert(game: &Game) -> String {
    format!(
        "⚾ Extra Innings: {} vs {} has entered extra innings!",
        game.away, game.home
    )
}

#[derive(Serialize, Debug)]
pub struct WebhookPayload<'a> {
    pub content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Rejected { status: u16, body: String },
    TransportFailed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered            => write!(f, "delivered"),
            DeliveryOutcome::Rejected { status, .. } => write!(f, "rejected_{status}"),
            DeliveryOutcome::TransportFailed(_)   => write!(f, "transport_failed"),
        }
    }
}

pub fn outcome_from_status(status: u16, body: &str) -> DeliveryOutcome {
    if status == 204 {
        DeliveryOutcome::Delivered
    } else {
        DeliveryOutcome::Rejected {
            status,
            body: body.chars().take(MAX_BODY_CHARS).collect(),
        }
    }
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, game: &Game) -> DeliveryOutcome;
}

pub struct WebhookNotifier {
    client:      reqwest::Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookNotifier {
    /// One POST, no retry.
    async fn notify(&self, game: &Game) -> DeliveryOutcome {
        let message = format_alert(game);
        let payload = WebhookPayload { content: &message };

        let resp = match self.client.post(&self.webhook_url).json(&payload).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("❌ Webhook POST failed: {e}");
                return DeliveryOutcome::TransportFailed(e.to_string());
            }
        };

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Webhook response body unreadable (HTTP {status}): {e}");
                String::new()
            }
        };
        let outcome = outcome_from_status(status, &body);

        match &outcome {
            DeliveryOutcome::Delivered => info!("✅ Notification sent successfully: {message}"),
            DeliveryOutcome::Rejected { status, body } => {
                warn!("❌ Failed to send notification: {status}, {body}")
            }
            DeliveryOutcome::TransportFailed(_) => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlb_monitor::GamePk;

    fn game() -> Game {
        Game {
            game_pk: Some(GamePk(100)),
            home: "Yankees".to_string(),
            away: "Red Sox".to_string(),
        }
    }

    #[test]
    fn alert_names_away_team_first() {
        assert_eq!(
            format_alert(&game()),
            "⚾ Extra Innings: Red Sox vs Yankees has entered extra innings!"
        );
    }

    #[test]
    fn payload_is_content_object() {
        let msg = format_alert(&game());
        let v = serde_json::to_value(WebhookPayload { content: &msg }).unwrap();
        assert_eq!(v, serde_json::json!({ "content": msg }));
    }

    #[test]
    fn only_204_counts_as_delivered() {
        assert_eq!(outcome_from_status(204, ""), DeliveryOutcome::Delivered);
        assert!(!outcome_from_status(200, "{}").is_delivered());
        assert_eq!(
            outcome_from_status(500, "Internal Server Error"),
            DeliveryOutcome::Rejected { status: 500, body: "Internal Server Error".to_string() }
        );
    }

    #[test]
    fn rejection_body_is_truncated() {
        let long = "x".repeat(MAX_BODY_CHARS * 2);
        match outcome_from_status(429, &long) {
            DeliveryOutcome::Rejected { body, .. } => assert_eq!(body.len(), MAX_BODY_CHARS),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(DeliveryOutcome::Delivered.to_string(), "delivered");
        assert_eq!(outcome_from_status(500, "").to_string(), "rejected_500");
        assert_eq!(DeliveryOutcome::TransportFailed("refused".into()).to_string(), "transport_failed");
    }

    /// One-shot HTTP server on loopback: reads the request, writes `response`, hangs up.
    async fn serve_once(response: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            // The JSON payload is the last thing sent.
            while !request.ends_with(b"}") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        });
        format!("http://{addr}/hook")
    }

    #[tokio::test]
    async fn non_204_reports_status_and_body() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom"
        ).await;
        let notifier = WebhookNotifier::new(url, Duration::from_secs(5));

        let outcome = notifier.notify(&game()).await;
        assert_eq!(outcome, DeliveryOutcome::Rejected { status: 500, body: "boom".to_string() });
    }

    #[tokio::test]
    async fn truncated_rejection_body_still_reports_status() {
        // Promises 100 bytes, sends 5, then closes.
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort"
        ).await;
        let notifier = WebhookNotifier::new(url, Duration::from_secs(5));

        let outcome = notifier.notify(&game()).await;
        assert_eq!(outcome, DeliveryOutcome::Rejected { status: 500, body: String::new() });
    }

    #[tokio::test]
    async fn delivered_on_204() {
        let url = serve_once("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;
        let notifier = WebhookNotifier::new(url, Duration::from_secs(5));

        assert_eq!(notifier.notify(&game()).await, DeliveryOutcome::Delivered);
    }

    #[tokio::test]
    async fn unreachable_webhook_does_not_panic() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook", Duration::from_secs(2));
        let outcome = notifier.notify(&game()).await;
        assert!(matches!(outcome, DeliveryOutcome::TransportFailed(_)));
    }
}
