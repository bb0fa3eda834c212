//! The alert state engine.
//!
//! Owns the alert registry and decides, for every operation, whether a
//! notification must be dispatched. The registry is a single map guarded
//! by one mutex; critical sections are pure in-memory mutation and every
//! dispatch happens after the lock is released, so slow channel I/O never
//! blocks unrelated alert updates.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;
use vigil_core::{Level, Script};
use vigil_notify::Dispatcher;

use crate::api::{ReportOptions, ScriptAlerts};
use crate::chart::{ChartRenderer, RenderError};
use crate::record::{AlertRecord, AlertState, LeveledAlert, PresenceAlert};

/// Errors returned to the calling script. None of these are fatal to the
/// process.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert name must be specified and not empty")]
    InvalidName,

    #[error("alert '{name}' is owned by the {owner} discipline")]
    ModeConflict { name: String, owner: &'static str },

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Applies the presence and leveled alerting disciplines against the
/// registry and drives the dispatcher. The only component allowed to
/// mutate alert state.
pub struct Engine {
    registry: Mutex<HashMap<String, AlertRecord>>,
    dispatcher: Arc<Dispatcher>,
    chart_renderer: Option<Arc<dyn ChartRenderer>>,
}

impl Engine {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            dispatcher,
            chart_renderer: None,
        }
    }

    /// Attach a chart rendering collaborator.
    pub fn with_chart_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.chart_renderer = Some(renderer);
        self
    }

    /// Bind the engine to one script, producing the capability handle the
    /// sandbox exposes to the script body.
    pub fn bind(self: &Arc<Self>, script: Arc<Script>) -> Arc<ScriptAlerts> {
        Arc::new(ScriptAlerts::new(self.clone(), script))
    }

    /// Raise a presence alert.
    ///
    /// Creates the record and dispatches an [`Level::Error`] notification
    /// on the first raise; repeated raises only increment the occurrence
    /// counter.
    pub async fn raise(
        &self,
        script: &Script,
        name: &str,
        text: &str,
        fields: &[String],
    ) -> Result<(), AlertError> {
        let name = normalize_name(name)?;

        let (notify, count) = {
            let mut registry = self.registry.lock().unwrap();
            match registry.get_mut(&name) {
                None => {
                    registry.insert(name.clone(), AlertRecord::presence(script.name.clone()));
                    (true, 1)
                }
                Some(record) => match record.state {
                    AlertState::Presence { .. } => {
                        record.count += 1;
                        (false, record.count)
                    }
                    AlertState::Leveled { .. } => {
                        return Err(AlertError::ModeConflict {
                            name,
                            owner: record.discipline(),
                        })
                    }
                },
            }
        };

        debug!(alert = %name, script = %script.name, count, "alert raise");

        if notify {
            self.dispatcher
                .dispatch(Level::Error, &name, text, &script.channels, fields, None)
                .await;
        }

        Ok(())
    }

    /// Clear a presence alert.
    ///
    /// Removes the record and dispatches an [`Level::Ok`] notification
    /// when it was active. Clearing an alert that was never raised is a
    /// deliberate no-op.
    pub async fn clear(
        &self,
        script: &Script,
        name: &str,
        text: &str,
        fields: &[String],
    ) -> Result<(), AlertError> {
        let name = normalize_name(name)?;

        let notify = {
            let mut registry = self.registry.lock().unwrap();
            match registry.get(&name) {
                None => false,
                Some(record) => match record.state {
                    AlertState::Presence { .. } => {
                        registry.remove(&name);
                        true
                    }
                    AlertState::Leveled { .. } => {
                        return Err(AlertError::ModeConflict {
                            name,
                            owner: record.discipline(),
                        })
                    }
                },
            }
        };

        debug!(alert = %name, script = %script.name, cleared = notify, "alert clear");

        if notify {
            self.dispatcher
                .dispatch(Level::Ok, &name, text, &script.channels, fields, None)
                .await;
        }

        Ok(())
    }

    /// Report a leveled alert at `level`.
    ///
    /// A level change always notifies unless `opts.quiet`; an unchanged
    /// level notifies only every `opts.repeat`-th consecutive occurrence.
    /// Chart data is rendered before any registry mutation: a render
    /// failure surfaces to the caller and leaves the record untouched.
    pub async fn report(
        &self,
        script: &Script,
        name: &str,
        text: &str,
        opts: ReportOptions,
        level: Level,
    ) -> Result<(), AlertError> {
        let name = normalize_name(name)?;

        let chart_url = match opts.chart {
            Some(ref spec) => {
                let renderer = self
                    .chart_renderer
                    .as_ref()
                    .ok_or(RenderError::Unavailable)?;
                Some(renderer.render(spec).await?)
            }
            None => None,
        };

        let (notify, count) = {
            let mut registry = self.registry.lock().unwrap();
            let record = registry
                .entry(name.clone())
                .or_insert_with(AlertRecord::leveled);

            let current = match record.state {
                AlertState::Leveled { level } => level,
                AlertState::Presence { .. } => {
                    let owner = record.discipline();
                    return Err(AlertError::ModeConflict { name, owner });
                }
            };

            if current == level {
                record.count += 1;
                let due = !opts.quiet && opts.repeat > 0 && record.count % opts.repeat == 0;
                (due, record.count)
            } else {
                record.state = AlertState::Leveled { level };
                record.count = 1;
                (!opts.quiet, 1)
            }
        };

        debug!(
            alert = %name,
            script = %script.name,
            level = %level,
            count,
            notify,
            "alert report"
        );

        if notify {
            let channels = if opts.channels.is_empty() {
                &script.channels
            } else {
                &opts.channels
            };
            self.dispatcher
                .dispatch(level, &name, text, channels, &opts.fields, chart_url)
                .await;
        }

        Ok(())
    }

    /// Snapshot of all active presence alerts, sorted by name.
    pub fn active(&self) -> Vec<PresenceAlert> {
        let registry = self.registry.lock().unwrap();
        let mut alerts: Vec<PresenceAlert> = registry
            .iter()
            .filter_map(|(name, record)| match record.state {
                AlertState::Presence { ref script } => Some(PresenceAlert {
                    name: name.clone(),
                    script: script.clone(),
                    count: record.count,
                }),
                AlertState::Leveled { .. } => None,
            })
            .collect();
        alerts.sort_by(|a, b| a.name.cmp(&b.name));
        alerts
    }

    /// Snapshot of all leveled alerts, sorted by name.
    pub fn levels(&self) -> Vec<LeveledAlert> {
        let registry = self.registry.lock().unwrap();
        let mut alerts: Vec<LeveledAlert> = registry
            .iter()
            .filter_map(|(name, record)| match record.state {
                AlertState::Leveled { level } => Some(LeveledAlert {
                    name: name.clone(),
                    level,
                    count: record.count,
                }),
                AlertState::Presence { .. } => None,
            })
            .collect();
        alerts.sort_by(|a, b| a.name.cmp(&b.name));
        alerts
    }
}

/// Trim and validate an alert name.
fn normalize_name(name: &str) -> Result<String, AlertError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AlertError::InvalidName);
    }
    Ok(trimmed.to_string())
}
