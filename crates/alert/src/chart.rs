//! Chart rendering collaborator contract.
//!
//! Leveled reports may carry time series data to attach as a chart. The
//! engine renders it through an external [`ChartRenderer`] and attaches
//! the returned reference to the notification payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors from chart rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("no chart renderer configured")]
    Unavailable,
}

/// One data point of a chart series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// One series of a chart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartSeries {
    pub data: Vec<ChartPoint>,
}

/// Chart data carried by a leveled report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub series: Vec<ChartSeries>,
}

/// Renders chart series data into an attachable reference (e.g. a URL).
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, spec: &ChartSpec) -> Result<String, RenderError>;
}
