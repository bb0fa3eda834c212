//! Alert state engine for vigil.
//!
//! This crate provides:
//! - `Engine` — the only mutation surface over the alert registry,
//!   applying the presence (on/off) and leveled (severity) disciplines
//! - `AlertApi` — the capability set bound into a script sandbox
//! - `ChartRenderer` — collaborator seam for chart attachments

pub mod api;
pub mod chart;
pub mod engine;
pub mod record;

pub use api::{AlertApi, ReportOptions, ScriptAlerts};
pub use chart::{ChartRenderer, ChartSpec, RenderError};
pub use engine::{AlertError, Engine};
pub use record::{LeveledAlert, PresenceAlert};
