//! Fans one alert decision out to named channels.
//!
//! The dispatcher resolves channel names to concrete notifiers and
//! delivers the message to each. Individual channel failures are logged
//! and collected; they never block other channels and never surface as an
//! error to the engine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use vigil_core::config::ChannelsConfig;
use vigil_core::Level;

use crate::email::EmailNotifier;
use crate::telegram::TelegramNotifier;
use crate::traits::{AlertMessage, DispatchResult, Notifier, NotifyError};
use crate::webhook::WebhookNotifier;

/// Default upper bound on a single channel `send`.
const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Dispatches alert notifications to named channels.
pub struct Dispatcher {
    channels: HashMap<String, Arc<dyn Notifier>>,
    send_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over a set of notifiers, keyed by their
    /// configured names.
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        let mut channels = HashMap::with_capacity(notifiers.len());
        for notifier in notifiers {
            channels.insert(notifier.name().to_string(), notifier);
        }
        Self {
            channels,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self {
            channels: HashMap::new(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Override the per-send timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Effective per-send timeout.
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Build every configured channel and assemble a dispatcher using
    /// `send_timeout` as the per-send upper bound.
    ///
    /// Fails fast on any channel whose configuration is unusable
    /// (malformed addresses, missing env vars, invalid HTTP methods).
    pub fn from_config(
        config: &ChannelsConfig,
        send_timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
        for c in &config.telegram {
            notifiers.push(Arc::new(TelegramNotifier::from_config(
                c.name.clone(),
                c.token.clone(),
                c.chat_id.clone(),
                c.parse_mode.clone(),
            )?));
        }
        for c in &config.webhook {
            notifiers.push(Arc::new(WebhookNotifier::from_config(
                c.name.clone(),
                c.url.clone(),
                c.method.clone(),
                c.headers.clone(),
            )?));
        }
        for c in &config.email {
            notifiers.push(Arc::new(EmailNotifier::from_config(
                c.name.clone(),
                &c.host,
                c.port,
                c.tls,
                &c.from,
                &c.to,
            )?));
        }
        Ok(Self::new(notifiers).with_send_timeout(send_timeout))
    }

    /// Names of all registered channels.
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    /// Deliver a message for `alert_name` to every channel in `channels`
    /// (deduplicated, order-preserving).
    ///
    /// Never fails to the caller. Unknown channel names, timeouts, and
    /// delivery errors are logged and recorded in the returned results.
    pub async fn dispatch(
        &self,
        level: Level,
        alert_name: &str,
        text: &str,
        channels: &[String],
        fields: &[String],
        chart_url: Option<String>,
    ) -> Vec<DispatchResult> {
        if channels.is_empty() {
            tracing::debug!(alert = %alert_name, "no notification channels configured");
            return Vec::new();
        }

        let mut message = AlertMessage::new(level, alert_name, text);
        message.fields = fields.to_vec();
        message.chart_url = chart_url;

        let mut seen: HashSet<&str> = HashSet::with_capacity(channels.len());
        let mut results = Vec::with_capacity(channels.len());

        for name in channels {
            if !seen.insert(name.as_str()) {
                continue;
            }

            let Some(channel) = self.channels.get(name) else {
                tracing::warn!(alert = %alert_name, channel = %name, "unknown channel");
                results.push(DispatchResult {
                    channel: name.clone(),
                    success: false,
                    error: Some("unknown channel".to_string()),
                    duration_ms: 0,
                });
                continue;
            };

            let start = std::time::Instant::now();
            let outcome = tokio::time::timeout(self.send_timeout, channel.send(&message)).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match outcome {
                Ok(Ok(())) => {
                    tracing::info!(
                        alert = %alert_name,
                        channel = %name,
                        level = %level,
                        duration_ms,
                        "notification delivered"
                    );
                    (true, None)
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        alert = %alert_name,
                        channel = %name,
                        error = %e,
                        duration_ms,
                        "notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
                Err(_) => {
                    tracing::warn!(
                        alert = %alert_name,
                        channel = %name,
                        timeout = ?self.send_timeout,
                        "notification delivery timed out"
                    );
                    (false, Some("send timed out".to_string()))
                }
            };

            results.push(DispatchResult {
                channel: name.clone(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }

    /// Send a test notification through a named channel.
    pub async fn test_channel(&self, name: &str) -> Result<(), NotifyError> {
        let channel = self
            .channels
            .get(name)
            .ok_or_else(|| NotifyError::Config(format!("unknown channel '{name}'")))?;
        channel.test().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockNotifier {
        name: String,
        send_count: Arc<AtomicUsize>,
        should_fail: bool,
        delay: Option<Duration>,
    }

    impl MockNotifier {
        fn ok(name: &str, count: Arc<AtomicUsize>) -> Arc<dyn Notifier> {
            Arc::new(Self {
                name: name.to_string(),
                send_count: count,
                should_fail: false,
                delay: None,
            })
        }
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _message: &AlertMessage) -> Result<(), NotifyError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.send_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(NotifyError::Config("mock failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn dispatches_to_all_channels() {
        let count_a = Arc::new(AtomicUsize::new(0));
        let count_b = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(vec![
            MockNotifier::ok("a", count_a.clone()),
            MockNotifier::ok("b", count_b.clone()),
        ]);

        let results = dispatcher
            .dispatch(Level::Error, "disk-full", "/var full", &names(&["a", "b"]), &[], None)
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(count_a.load(Ordering::SeqCst), 1);
        assert_eq!(count_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn partial_failure_does_not_block_remaining() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(vec![
            Arc::new(MockNotifier {
                name: "bad".to_string(),
                send_count: Arc::new(AtomicUsize::new(0)),
                should_fail: true,
                delay: None,
            }),
            MockNotifier::ok("good", count.clone()),
        ]);

        let results = dispatcher
            .dispatch(Level::Warn, "a", "t", &names(&["bad", "good"]), &[], None)
            .await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deduplicates_preserving_order() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(vec![MockNotifier::ok("a", count.clone())]);

        let results = dispatcher
            .dispatch(Level::Warn, "a", "t", &names(&["a", "a", "a"]), &[], None)
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_channel_is_recorded_not_fatal() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(vec![MockNotifier::ok("known", count.clone())]);

        let results = dispatcher
            .dispatch(Level::Warn, "a", "t", &names(&["ghost", "known"]), &[], None)
            .await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("unknown channel"));
        assert!(results[1].success);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_channel_times_out() {
        let count = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::new(vec![
            Arc::new(MockNotifier {
                name: "slow".to_string(),
                send_count: Arc::new(AtomicUsize::new(0)),
                should_fail: false,
                delay: Some(Duration::from_secs(5)),
            }),
            MockNotifier::ok("fast", count.clone()),
        ])
        .with_send_timeout(Duration::from_millis(50));

        let results = dispatcher
            .dispatch(Level::Error, "a", "t", &names(&["slow", "fast"]), &[], None)
            .await;

        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("send timed out"));
        assert!(results[1].success);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_channel_list_is_a_noop() {
        let dispatcher = Dispatcher::empty();
        let results = dispatcher
            .dispatch(Level::Warn, "a", "t", &[], &[], None)
            .await;
        assert!(results.is_empty());
    }

    #[test]
    fn from_config_applies_send_timeout() {
        let config = ChannelsConfig::default();
        let dispatcher = Dispatcher::from_config(&config, Duration::from_secs(3)).unwrap();
        assert_eq!(dispatcher.send_timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_channel_unknown_name_errors() {
        let dispatcher = Dispatcher::empty();
        let err = dispatcher.test_channel("nope").await.unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
