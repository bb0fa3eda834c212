//! Generic HTTP webhook notifier.
//!
//! Delivers alert notifications as JSON payloads to a configured endpoint
//! with optional custom headers. Environment variable references
//! (`${VAR_NAME}`) in the URL and header values are resolved at
//! construction time.

use std::collections::HashMap;

use crate::traits::{AlertMessage, Notifier, NotifyError};

/// Delivers alert notifications as JSON over HTTP.
#[derive(Debug)]
pub struct WebhookNotifier {
    name: String,
    /// Target URL (env vars already resolved).
    url: String,
    /// HTTP method (defaults to POST).
    method: reqwest::Method,
    /// Custom headers to include on every request.
    headers: HashMap<String, String>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Construct a [`WebhookNotifier`] from config-level primitives.
    ///
    /// `method` is parsed from a string (e.g. `"POST"`, `"PUT"`) and
    /// defaults to `POST`. Invalid method strings and missing env vars
    /// produce [`NotifyError::Config`].
    pub fn from_config(
        name: String,
        url: String,
        method: Option<String>,
        headers: HashMap<String, String>,
    ) -> Result<Self, NotifyError> {
        let parsed_method = match method {
            Some(m) => {
                let upper = m.to_uppercase();
                upper
                    .parse::<reqwest::Method>()
                    .map_err(|_| NotifyError::Config(format!("invalid HTTP method: '{m}'")))?
            }
            None => reqwest::Method::POST,
        };

        let resolved_url = resolve_env_vars(&url)?;
        let mut resolved_headers = HashMap::with_capacity(headers.len());
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        Ok(Self {
            name,
            url: resolved_url,
            method: parsed_method,
            headers: resolved_headers,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    /// Sends the alert message as a JSON payload.
    async fn send(&self, message: &AlertMessage) -> Result<(), NotifyError> {
        tracing::debug!(
            channel = %self.name,
            url = %self.url,
            alert = %message.alert_name,
            "sending webhook notification"
        );

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .json(message);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            tracing::info!(channel = %self.name, status = %status, "webhook notification sent");
            return Ok(());
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Config(format!(
            "webhook returned {status}: {body}"
        )))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Resolve `${VAR_NAME}` references against the process environment.
///
/// Literal text around references is preserved. A reference to an unset
/// variable produces [`NotifyError::Config`].
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            NotifyError::Config(format!("malformed env var reference in '{input}'"))
        })?;
        let var_name = &after[..end];
        let value = std::env::var(var_name).map_err(|_| {
            NotifyError::Config(format!("environment variable '{var_name}' is not set"))
        })?;
        result.push_str(&value);
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_env_vars_in_place() {
        std::env::set_var("TEST_VIGIL_HOOK_TOKEN", "secret");
        let resolved =
            resolve_env_vars("https://example.com/hook?token=${TEST_VIGIL_HOOK_TOKEN}&x=1")
                .unwrap();
        assert_eq!(resolved, "https://example.com/hook?token=secret&x=1");
        std::env::remove_var("TEST_VIGIL_HOOK_TOKEN");
    }

    #[test]
    fn missing_env_var_errors() {
        let err = resolve_env_vars("${NONEXISTENT_VAR_VIGIL_HOOK}").unwrap_err();
        assert!(err.to_string().contains("NONEXISTENT_VAR_VIGIL_HOOK"));
    }

    #[test]
    fn malformed_reference_errors() {
        let err = resolve_env_vars("https://x/${UNCLOSED").unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn literal_text_passes_through() {
        assert_eq!(resolve_env_vars("plain").unwrap(), "plain");
    }

    #[test]
    fn invalid_method_rejected() {
        let result = WebhookNotifier::from_config(
            "hook".to_string(),
            "https://example.com".to_string(),
            Some("FETCH ME".to_string()),
            HashMap::new(),
        );
        assert!(result.unwrap_err().to_string().contains("invalid HTTP method"));
    }

    #[test]
    fn method_defaults_to_post() {
        let notifier = WebhookNotifier::from_config(
            "hook".to_string(),
            "https://example.com".to_string(),
            None,
            HashMap::new(),
        )
        .unwrap();
        assert_eq!(notifier.method, reqwest::Method::POST);
        assert_eq!(notifier.name(), "hook");
    }

    #[test]
    fn headers_resolve_env_vars() {
        std::env::set_var("TEST_VIGIL_HOOK_AUTH", "Bearer abc");
        let notifier = WebhookNotifier::from_config(
            "hook".to_string(),
            "https://example.com".to_string(),
            Some("put".to_string()),
            HashMap::from([("Authorization".to_string(), "${TEST_VIGIL_HOOK_AUTH}".to_string())]),
        )
        .unwrap();
        assert_eq!(notifier.method, reqwest::Method::PUT);
        assert_eq!(notifier.headers["Authorization"], "Bearer abc");
        std::env::remove_var("TEST_VIGIL_HOOK_AUTH");
    }
}
