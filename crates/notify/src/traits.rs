//! Notifier trait definition and shared message types.

use chrono::{DateTime, Utc};
use vigil_core::Level;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// A notification for one alert event, ready for delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertMessage {
    /// Severity of the event being announced.
    pub level: Level,
    /// The alert name the event belongs to.
    pub alert_name: String,
    /// Free-form text supplied by the script.
    pub text: String,
    /// Extra context lines attached by the script.
    pub fields: Vec<String>,
    /// Reference to a rendered chart, when the report carried series data.
    pub chart_url: Option<String>,
    /// When the engine made the dispatch decision.
    pub timestamp: DateTime<Utc>,
}

impl AlertMessage {
    pub fn new(level: Level, alert_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level,
            alert_name: alert_name.into(),
            text: text.into(),
            fields: Vec::new(),
            chart_url: None,
            timestamp: Utc::now(),
        }
    }

    /// Uniform plain-text body: `[LEVEL] name — text` plus one line per
    /// field. Channels that want richer formatting build on top of this.
    pub fn render_body(&self) -> String {
        let mut body = format!(
            "[{}] {} — {}",
            self.level.tag(),
            self.alert_name,
            self.text
        );
        for field in &self.fields {
            body.push('\n');
            body.push_str(field);
        }
        if let Some(ref url) = self.chart_url {
            body.push('\n');
            body.push_str(url);
        }
        body
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, message: &AlertMessage) -> Result<(), NotifyError>;

    /// Probe connectivity with a sample notification.
    async fn test(&self) -> Result<(), NotifyError> {
        let probe = AlertMessage::new(
            Level::Ok,
            "vigil-test",
            "This is a test notification from vigil.",
        );
        self.send(&probe).await
    }

    /// Configured name this channel is addressed by.
    fn name(&self) -> &str;
}

/// Result of dispatching a notification to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_renders_level_and_fields() {
        let mut msg = AlertMessage::new(Level::Warn, "disk-full", "/var full");
        msg.fields = vec!["host=web-1".to_string(), "usage=97%".to_string()];
        let body = msg.render_body();
        assert!(body.starts_with("[WARN] disk-full — /var full"));
        assert!(body.contains("host=web-1"));
        assert!(body.ends_with("usage=97%"));
    }

    #[test]
    fn body_appends_chart_url() {
        let mut msg = AlertMessage::new(Level::Error, "latency", "p99 over budget");
        msg.chart_url = Some("https://charts.example.com/abc".to_string());
        assert!(msg.render_body().ends_with("https://charts.example.com/abc"));
    }
}
