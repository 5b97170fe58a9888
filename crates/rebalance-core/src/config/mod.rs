//! Balance configuration.
//!
//! The configuration is a JSON document:
//!
//! ```json
//! {
//!   "enabled": true,
//!   "tech_time": { "tier_2": 45 },
//!   "units": {
//!     "Tank": { "cost_mult": 0.8, "pri_damage_mult": 1.25 },
//!     "Sniper": { "projectiles": { "Bullet_Sniper": { "m_fImpactDamage": 180 } } },
//!     "_teleport": { "cooldown": 20, "duration": 3 }
//!   },
//!   "sync": { "max_message_bytes": 1200 }
//! }
//! ```
//!
//! Malformed unit entries are logged and skipped. A document that cannot be
//! parsed at all is a [`ConfigError`].

mod document;
mod overlay;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub use document::{ConfigDocument, ConfigSource, FileConfigSource, MemoryConfigSource};
pub use overlay::{
    is_effective, Category, CategoryKind, CategoryValues, Overlay, ProjectileOverrides, EPSILON,
};

use crate::error::ConfigError;
use crate::host::member::Member;

// =============================================================================
// Sync Settings
// =============================================================================

/// Timing and size knobs for broadcasting overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Delay before the first broadcast after a session starts.
    pub initial_sync_delay_secs: f32,
    /// Delay before the broadcast that follows a reload.
    pub reload_sync_delay_secs: f32,
    /// Pause between two participants of one broadcast.
    pub participant_pacing_secs: f32,
    /// Largest message the transport accepts.
    pub max_message_bytes: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            initial_sync_delay_secs: 2.0,
            reload_sync_delay_secs: 0.5,
            participant_pacing_secs: 0.5,
            max_message_bytes: 1200,
        }
    }
}

fn secs(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or_default()
}

impl SyncSettings {
    /// [`initial_sync_delay_secs`](Self::initial_sync_delay_secs) as a duration.
    #[must_use]
    pub fn initial_sync_delay(&self) -> Duration {
        secs(self.initial_sync_delay_secs)
    }

    /// [`reload_sync_delay_secs`](Self::reload_sync_delay_secs) as a duration.
    #[must_use]
    pub fn reload_sync_delay(&self) -> Duration {
        secs(self.reload_sync_delay_secs)
    }

    /// [`participant_pacing_secs`](Self::participant_pacing_secs) as a duration.
    #[must_use]
    pub fn participant_pacing(&self) -> Duration {
        secs(self.participant_pacing_secs)
    }
}

// =============================================================================
// Balance Config
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    enabled: bool,
    dump_fields: bool,
    shrimp_disable_aim: bool,
    disable_ai_aim: Vec<String>,
    tech_time: BTreeMap<String, Value>,
    units: BTreeMap<String, Value>,
    sync: SyncSettings,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dump_fields: false,
            shrimp_disable_aim: false,
            disable_ai_aim: Vec::new(),
            tech_time: BTreeMap::new(),
            units: BTreeMap::new(),
            sync: SyncSettings::default(),
        }
    }
}

/// A parsed balance configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceConfig {
    /// Master switch.
    pub enabled: bool,
    /// Accepted for compatibility; field dumps are not part of the engine.
    pub dump_fields: bool,
    /// Units whose AI aiming is switched off.
    pub disable_ai_aim: Vec<String>,
    /// Resolved values.
    pub overlay: Overlay,
    /// Broadcast timing.
    pub sync: SyncSettings,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dump_fields: false,
            disable_ai_aim: Vec::new(),
            overlay: Overlay::new(),
            sync: SyncSettings::default(),
        }
    }
}

impl BalanceConfig {
    /// Parses a configuration from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not a valid document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid document.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Builds a configuration from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAnObject`] if the root is not an object and
    /// [`ConfigError::Parse`] if a top-level field has the wrong type.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        if !value.is_object() {
            return Err(ConfigError::NotAnObject);
        }
        let raw: RawConfig = serde_json::from_value(value)?;

        let mut overlay = Overlay::new();
        parse_tech_times(&raw.tech_time, &mut overlay);
        for (name, entry) in &raw.units {
            if let Some(pseudo) = name.strip_prefix('_') {
                parse_pseudo_unit(pseudo, entry, &mut overlay);
            } else {
                parse_unit(name, entry, &mut overlay);
            }
        }

        let mut disable_ai_aim = raw.disable_ai_aim;
        if raw.shrimp_disable_aim && !disable_ai_aim.iter().any(|n| n == "Shrimp") {
            disable_ai_aim.push("Shrimp".to_string());
        }

        Ok(Self {
            enabled: raw.enabled,
            dump_fields: raw.dump_fields,
            disable_ai_aim,
            overlay,
            sync: raw.sync,
        })
    }

    /// Whether the configuration would change anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.overlay.is_empty() && self.disable_ai_aim.is_empty()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_tech_times(tech_time: &BTreeMap<String, Value>, overlay: &mut Overlay) {
    for (key, value) in tech_time {
        let tier = key.strip_prefix("tier_").and_then(|t| t.parse::<i32>().ok());
        match (tier, value.as_f64()) {
            (Some(tier), Some(seconds)) if seconds >= 0.0 => {
                overlay.insert_tech_tier(tier, seconds as f32);
            }
            _ => warn!(key = %key, "ignoring malformed tech_time entry"),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_pseudo_unit(name: &str, entry: &Value, overlay: &mut Overlay) {
    if name != "teleport" {
        debug!(unit = %name, "ignoring unknown pseudo-unit");
        return;
    }
    for (key, category) in [
        ("cooldown", Category::TeleportCooldown),
        ("duration", Category::TeleportDuration),
    ] {
        if let Some(value) = entry.get(key).and_then(Value::as_f64) {
            overlay.insert(category, "_teleport", None, value as f32);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_unit(name: &str, entry: &Value, overlay: &mut Overlay) {
    let Some(fields) = entry.as_object() else {
        warn!(unit = %name, "unit entry is not an object, skipping");
        return;
    };

    for (key, value) in fields {
        if key == "projectiles" {
            parse_projectile_overrides(name, value, overlay);
            continue;
        }
        let Some((category, slot)) = Category::parse_key(key) else {
            debug!(unit = %name, key = %key, "ignoring unknown unit key");
            continue;
        };
        let Some(number) = value.as_f64() else {
            warn!(unit = %name, key = %key, "value is not a number, skipping");
            continue;
        };
        let number = if category == Category::MinTier {
            number.round()
        } else {
            number
        };
        overlay.insert(category, name, slot, number as f32);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn parse_projectile_overrides(unit: &str, value: &Value, overlay: &mut Overlay) {
    let Some(projectiles) = value.as_object() else {
        warn!(unit = %unit, "projectiles entry is not an object, skipping");
        return;
    };
    for (projectile, fields) in projectiles {
        let Some(fields) = fields.as_object() else {
            warn!(unit = %unit, projectile = %projectile, "projectile overrides are not an object");
            continue;
        };
        for (member, v) in fields {
            match (member.parse::<Member>(), v.as_f64()) {
                (Ok(member), Some(v)) => {
                    overlay.insert_projectile_override(unit, projectile, member, v as f32);
                }
                (Err(err), _) => warn!(unit = %unit, projectile = %projectile, "{err}"),
                (_, None) => {
                    warn!(unit = %unit, projectile = %projectile, member = %member, "value is not a number");
                }
            }
        }
    }
}
