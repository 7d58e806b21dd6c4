//! Chat webhook sink.
//!
//! Posts each notification as a single JSON embed. The webhook URL carries
//! its own credential, so it is held in a zeroizing buffer and never logged.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::BoxFuture;

use super::{Notification, NotificationField, NotificationSink, NotifyError};

/// Whole-request deadline for one webhook post.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookSink {
    client: Client,
    url: Zeroizing<String>,
    color: u32,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, color: u32) -> Result<Self, NotifyError> {
        Self::with_timeout(url, color, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        url: impl Into<String>,
        color: u32,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: Zeroizing::new(url.into()),
            color,
        })
    }

    fn build_payload<'a>(&self, n: &'a Notification) -> WebhookPayload<'a> {
        WebhookPayload {
            content: &n.content,
            embeds: [Embed {
                title: &n.title,
                url: n.url.as_deref(),
                description: n.description.as_deref(),
                color: self.color,
                fields: &n.fields,
                image: n.image.as_deref().map(|url| EmbedImage { url }),
                footer: n.footer.as_deref().map(|text| EmbedFooter { text }),
                timestamp: n.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            }],
        }
    }
}

impl std::fmt::Debug for WebhookSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSink")
            .field("url", &"<redacted>")
            .field("color", &self.color)
            .finish()
    }
}

impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>> {
        let body = self.build_payload(notification);
        Box::pin(async move {
            debug!(title = %notification.title, "Posting webhook notification");

            let resp = self
                .client
                .post(self.url.as_str())
                .json(&body)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(NotifyError::Status {
                    status: status.as_u16(),
                });
            }
            Ok(())
        })
    }
}

// ── Wire format ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
    embeds: [Embed<'a>; 1],
}

#[derive(Serialize)]
struct Embed<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    color: u32,
    fields: &'a [NotificationField],
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EmbedImage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<EmbedFooter<'a>>,
    timestamp: String,
}

#[derive(Serialize)]
struct EmbedImage<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct EmbedFooter<'a> {
    text: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use pretty_assertions::assert_eq;

    type Captured = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn serve(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/hook",
                post(
                    move |State(store): State<Captured>, axum::Json(body): axum::Json<serde_json::Value>| async move {
                        store.lock().unwrap().push(body);
                        status
                    },
                ),
            )
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), captured)
    }

    #[test]
    fn test_payload_shape() {
        let sink = WebhookSink::new("http://unused", 0x7b2fb5).unwrap();
        let n = Notification::new("Module created: m")
            .with_url("https://example.com/m")
            .with_field("Author", "o", true)
            .with_image("https://img")
            .with_footer("Query by a");
        let json = serde_json::to_value(sink.build_payload(&n)).unwrap();
        let embed = &json["embeds"][0];
        assert_eq!(embed["title"], "Module created: m");
        assert_eq!(embed["color"], 0x7b2fb5);
        assert_eq!(embed["fields"][0]["name"], "Author");
        assert_eq!(embed["fields"][0]["inline"], true);
        assert_eq!(embed["image"]["url"], "https://img");
        assert_eq!(embed["footer"]["text"], "Query by a");
        assert!(embed["timestamp"].as_str().unwrap().ends_with('Z'));
        assert!(embed.get("description").is_none());
    }

    #[test]
    fn test_debug_redacts_url() {
        let sink = WebhookSink::new("https://discord.example/api/webhooks/1/secret", 0).unwrap();
        assert!(!format!("{sink:?}").contains("secret"));
    }

    #[tokio::test]
    async fn test_posts_notification() {
        let (url, captured) = serve(StatusCode::NO_CONTENT).await;
        let sink = WebhookSink::new(url, 0x123456).unwrap();
        let n = Notification::new("Module deleted: m");
        sink.send(&n).await.unwrap();

        let bodies = captured.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["embeds"][0]["title"], "Module deleted: m");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let (url, _captured) = serve(StatusCode::TOO_MANY_REQUESTS).await;
        let sink = WebhookSink::new(url, 0).unwrap();
        let err = sink.send(&Notification::new("x")).await.unwrap_err();
        assert!(matches!(err, NotifyError::Status { status: 429 }));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let app = Router::new().route(
            "/hook",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                StatusCode::NO_CONTENT
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let sink =
            WebhookSink::with_timeout(format!("http://{addr}/hook"), 0, Duration::from_millis(100)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), sink.send(&Notification::new("x")))
            .await
            .expect("webhook post was not bounded");
        match result {
            Err(NotifyError::Http(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }
}
