//! Registry record types.
//!
//! One record exists per alert name. The discipline that first creates a
//! name owns it: the tagged [`AlertState`] variant makes an operation of
//! the other discipline on the same name a detectable conflict instead of
//! silently tracking the name twice.

use serde::Serialize;
use vigil_core::Level;

/// Authoritative state for one alert name.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    /// Consecutive occurrences at the current level/active state. Always
    /// >= 1 once an operation on the record has completed; reset to 1 on
    /// a level change.
    pub count: u64,
    pub state: AlertState,
}

/// Which alerting discipline owns the record.
#[derive(Debug, Clone)]
pub enum AlertState {
    /// On/off alert. Exists only while active; cleared records are
    /// removed from the registry.
    Presence {
        /// Script that raised it, kept for diagnostics.
        script: String,
    },
    /// Ordered-severity alert. Never removed; returning to the rest
    /// level only updates `level` and resets the count.
    Leveled { level: Level },
}

impl AlertRecord {
    pub fn presence(script: String) -> Self {
        Self {
            count: 1,
            state: AlertState::Presence { script },
        }
    }

    /// Fresh leveled record at the rest level. The caller's first
    /// transition immediately sets the real count.
    pub fn leveled() -> Self {
        Self {
            count: 0,
            state: AlertState::Leveled { level: Level::Ok },
        }
    }

    /// Discipline name used in conflict errors.
    pub fn discipline(&self) -> &'static str {
        match self.state {
            AlertState::Presence { .. } => "presence",
            AlertState::Leveled { .. } => "leveled",
        }
    }
}

/// Snapshot of an active presence alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceAlert {
    pub name: String,
    pub script: String,
    pub count: u64,
}

/// Snapshot of a leveled alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeveledAlert {
    pub name: String,
    pub level: Level,
    pub count: u64,
}
