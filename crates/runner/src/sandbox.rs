//! Script sandbox collaborator contract.
//!
//! The sandbox accepts a script body and a registered function surface and
//! invokes it to completion. Concrete implementations (an embedded
//! interpreter, a test double) live outside this workspace; the runner
//! only depends on this trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use vigil_alert::AlertApi;
use vigil_core::{Datasource, Script};

/// Errors from one script execution. Caught and logged by the runner,
/// never fatal to the cycle or the process.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("script parse failed: {0}")]
    Parse(String),

    #[error("script execution failed: {0}")]
    Execution(String),
}

/// Capabilities bound into a single script execution.
pub struct ScriptContext {
    /// Alerting operations bound to the executing script.
    pub alerts: Arc<dyn AlertApi>,
    /// Named query backends available to the script body.
    pub datasources: HashMap<String, Arc<dyn Datasource>>,
}

/// Executes a script body with its bound capability surface.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(&self, script: &Script, ctx: ScriptContext) -> Result<(), SandboxError>;
}
