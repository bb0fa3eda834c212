//! Script-facing capability surface.
//!
//! A sandbox does not talk to the [`Engine`](crate::Engine) directly: the
//! runner binds the engine to one script via [`Engine::bind`] and hands
//! the resulting [`ScriptAlerts`] into the sandbox as the `AlertApi`
//! capability set. The sandbox registers its methods as the script's
//! `alert.on` / `alert.off` / `alert.ok` / `alert.warn` / `alert.error`
//! entry points.

use std::sync::Arc;

use async_trait::async_trait;
use vigil_core::{Level, Script};

use crate::chart::ChartSpec;
use crate::engine::{AlertError, Engine};

/// Options bundle for a leveled report.
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    /// Extra context lines attached to the notification.
    pub fields: Vec<String>,
    /// Overrides the script's default channel set when non-empty.
    pub channels: Vec<String>,
    /// Suppress all notification for this call.
    pub quiet: bool,
    /// When > 0 and the level is unchanged, re-notify only every
    /// `repeat`-th consecutive occurrence.
    pub repeat: u64,
    /// Optional chart series data to render and attach.
    pub chart: Option<ChartSpec>,
}

/// The alerting operations exposed to a single script execution.
#[async_trait]
pub trait AlertApi: Send + Sync {
    /// Presence discipline: mark `name` active, notifying on the first raise.
    async fn raise(&self, name: &str, text: &str, fields: &[String]) -> Result<(), AlertError>;

    /// Presence discipline: clear `name`. A no-op when it was never raised.
    async fn clear(&self, name: &str, text: &str, fields: &[String]) -> Result<(), AlertError>;

    /// Leveled discipline: report `name` at `level`.
    async fn report(
        &self,
        name: &str,
        text: &str,
        opts: ReportOptions,
        level: Level,
    ) -> Result<(), AlertError>;
}

/// [`AlertApi`] implementation bound to one script.
pub struct ScriptAlerts {
    engine: Arc<Engine>,
    script: Arc<Script>,
}

impl ScriptAlerts {
    pub(crate) fn new(engine: Arc<Engine>, script: Arc<Script>) -> Self {
        Self { engine, script }
    }

    /// The script this handle is bound to.
    pub fn script(&self) -> &Script {
        &self.script
    }
}

#[async_trait]
impl AlertApi for ScriptAlerts {
    async fn raise(&self, name: &str, text: &str, fields: &[String]) -> Result<(), AlertError> {
        self.engine.raise(&self.script, name, text, fields).await
    }

    async fn clear(&self, name: &str, text: &str, fields: &[String]) -> Result<(), AlertError> {
        self.engine.clear(&self.script, name, text, fields).await
    }

    async fn report(
        &self,
        name: &str,
        text: &str,
        opts: ReportOptions,
        level: Level,
    ) -> Result<(), AlertError> {
        self.engine
            .report(&self.script, name, text, opts, level)
            .await
    }
}
