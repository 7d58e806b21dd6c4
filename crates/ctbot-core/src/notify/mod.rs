//! Outbound notifications.
//!
//! A [`Notification`] is the platform-neutral content of one outbound
//! message: which fields exist, in what order, with what text. Turning it
//! into chat markup is the job of a [`NotificationSink`].

/// Builders for every notification the bot sends.
pub mod content;
/// Sink that writes notifications to the log.
pub mod log;
/// Sink that posts notifications to a chat webhook.
pub mod webhook;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ctbot_config::NotifyConfig;

use crate::BoxFuture;

pub use self::log::LogSink;
pub use self::webhook::WebhookSink;

/// One labelled block of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Semantic content of an outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Plain text shown above the body (used for usage errors).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<NotificationField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            title: title.into(),
            url: None,
            description: None,
            fields: Vec::new(),
            image: None,
            footer: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(NotificationField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&NotificationField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Errors from delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {status}")]
    Status { status: u16 },

    #[error("webhook URL not set: environment variable {var} is missing")]
    MissingWebhookUrl { var: String },

    #[error("sink closed")]
    Closed,
}

/// Where notifications go.
///
/// Sinks are shared between the event dispatcher and every command task, so
/// `send` takes `&self`.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    fn send<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>>;
}

/// Build the sink selected by `[notify] sink`.
pub fn sink_from_config(config: &NotifyConfig) -> Result<Box<dyn NotificationSink>, NotifyError> {
    match config.sink.as_str() {
        "webhook" => {
            let url = std::env::var(&config.webhook_url_env).map_err(|_| {
                NotifyError::MissingWebhookUrl {
                    var: config.webhook_url_env.clone(),
                }
            })?;
            Ok(Box::new(WebhookSink::new(url, config.color)?))
        }
        _ => Ok(Box::new(LogSink::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_keeps_field_order() {
        let n = Notification::new("Title")
            .with_field("A", "1", true)
            .with_field("B", "2", false)
            .with_footer("Query by alice");
        let names: Vec<&str> = n.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(n.field("B").map(|f| f.inline), Some(false));
        assert_eq!(n.footer.as_deref(), Some("Query by alice"));
    }

    #[test]
    fn test_serialization_skips_empty_parts() {
        let json = serde_json::to_value(Notification::new("Module deleted: x")).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("title"));
        assert!(object.contains_key("timestamp"));
        assert!(!object.contains_key("fields"));
        assert!(!object.contains_key("content"));
        assert!(!object.contains_key("url"));
    }

    #[test]
    fn test_default_sink_is_log() {
        let config = NotifyConfig::default();
        let sink = sink_from_config(&config).unwrap();
        assert_eq!(sink.name(), "log");
    }

    #[test]
    fn test_webhook_sink_requires_env() {
        let config = NotifyConfig {
            sink: "webhook".to_string(),
            webhook_url_env: "CTBOT_TEST_WEBHOOK_URL_THAT_IS_NOT_SET".to_string(),
            ..NotifyConfig::default()
        };
        let err = sink_from_config(&config).err().unwrap();
        assert!(matches!(err, NotifyError::MissingWebhookUrl { .. }));
    }
}
