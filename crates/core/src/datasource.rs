//! Datasource collaborator contract.
//!
//! Datasources are queried by script bodies through the sandbox, never by
//! the engine directly. Concrete backends (SQL, HTTP log stores, ...) live
//! outside this workspace and implement [`Datasource`].

use async_trait::async_trait;

/// Errors surfaced by a datasource query.
#[derive(Debug, thiserror::Error)]
pub enum DatasourceError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("datasource unavailable: {0}")]
    Unavailable(String),
}

/// A named query backend exposed to scripts.
#[async_trait]
pub trait Datasource: Send + Sync {
    /// Execute a backend-specific query expression.
    async fn query(&self, expression: &str) -> Result<serde_json::Value, DatasourceError>;

    /// Name scripts use to address this datasource.
    fn name(&self) -> &str;
}
