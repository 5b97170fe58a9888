//! Editable configuration document and its backing stores.
//!
//! Operator commands edit the JSON document in place and save it back; the
//! engine only ever sees the parsed [`BalanceConfig`].

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Number, Value};

use super::{BalanceConfig, Category};
use crate::error::ConfigError;

/// The raw, editable configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    root: Map<String, Value>,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self::blank()
    }
}

impl ConfigDocument {
    /// An enabled document with no overrides.
    #[must_use]
    pub fn blank() -> Self {
        let mut root = Map::new();
        root.insert("enabled".to_string(), Value::Bool(true));
        root.insert("tech_time".to_string(), json!({}));
        root.insert("units".to_string(), json!({}));
        Self { root }
    }

    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid JSON and
    /// [`ConfigError::NotAnObject`] if the root is not an object.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str(json)? {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    /// Serializes the document with indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    /// Parses the document into a [`BalanceConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if a top-level field has the wrong type.
    pub fn parse(&self) -> Result<BalanceConfig, ConfigError> {
        BalanceConfig::from_value(Value::Object(self.root.clone()))
    }

    fn with_object<R>(&mut self, key: &str, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        let slot = self
            .root
            .entry(key.to_string())
            .or_insert_with(|| json!({}));
        if let Value::Object(map) = slot {
            return f(map);
        }
        let mut map = Map::new();
        let result = f(&mut map);
        *slot = Value::Object(map);
        result
    }

    /// Reads a per-unit numeric value.
    #[must_use]
    pub fn unit_param(&self, unit: &str, key: &str) -> Option<f64> {
        self.root.get("units")?.get(unit)?.get(key)?.as_f64()
    }

    /// Writes a per-unit numeric value and returns the previous one.
    ///
    /// Integral keys (`min_tier`, `build_radius`, `target_distance`,
    /// `fow_distance`) are stored as integers; everything else is rounded
    /// to four decimals.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_unit_param(&mut self, unit: &str, key: &str, value: f64) -> Option<f64> {
        let previous = self.unit_param(unit, key);
        let integral = Category::parse_key(key).is_some_and(|(c, _)| c.is_integral());
        let stored = if integral {
            Value::from(value.round() as i64)
        } else {
            Number::from_f64((value * 10_000.0).round() / 10_000.0).map_or(Value::Null, Value::Number)
        };

        self.with_object("units", |units| {
            let entry = units.entry(unit.to_string()).or_insert_with(|| json!({}));
            if !entry.is_object() {
                *entry = json!({});
            }
            if let Value::Object(fields) = entry {
                fields.insert(key.to_string(), stored);
            }
        });
        previous
    }

    /// Reads the build time configured for a technology tier.
    #[must_use]
    pub fn tech_tier_time(&self, tier: u32) -> Option<f64> {
        self.root
            .get("tech_time")?
            .get(format!("tier_{tier}"))?
            .as_f64()
    }

    /// Writes the build time of a technology tier, rounded to whole seconds.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_tech_tier_time(&mut self, tier: u32, seconds: f64) -> Option<f64> {
        let previous = self.tech_tier_time(tier);
        self.with_object("tech_time", |tiers| {
            tiers.insert(format!("tier_{tier}"), Value::from(seconds.round() as i64));
        });
        previous
    }

    /// Writes a top-level boolean and returns the previous one.
    pub fn set_flag(&mut self, key: &str, value: bool) -> Option<bool> {
        self.root
            .insert(key.to_string(), Value::Bool(value))
            .and_then(|v| v.as_bool())
    }
}

// =============================================================================
// Backing Stores
// =============================================================================

/// Where the configuration document lives.
pub trait ConfigSource {
    /// Loads the current document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the document cannot be read or parsed.
    fn load(&mut self) -> Result<ConfigDocument, ConfigError>;

    /// Persists an edited document.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the document cannot be written.
    fn save(&mut self, document: &ConfigDocument) -> Result<(), ConfigError>;
}

/// A document stored in a JSON file.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    /// Creates a source reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&mut self) -> Result<ConfigDocument, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        ConfigDocument::from_json_str(&text)
    }

    fn save(&mut self, document: &ConfigDocument) -> Result<(), ConfigError> {
        let text = document.to_json_string()?;
        fs::write(&self.path, text).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// A document held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigSource {
    text: String,
}

impl MemoryConfigSource {
    /// Creates a source holding `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The current text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replaces the held text, as if the file had been edited by hand.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }
}

impl ConfigSource for MemoryConfigSource {
    fn load(&mut self) -> Result<ConfigDocument, ConfigError> {
        ConfigDocument::from_json_str(&self.text)
    }

    fn save(&mut self, document: &ConfigDocument) -> Result<(), ConfigError> {
        self.text = document.to_json_string()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_keys_are_stored_as_integers() {
        let mut doc = ConfigDocument::blank();
        assert_eq!(doc.set_unit_param("Tank", "target_distance", 152.7), None);
        assert_eq!(doc.set_unit_param("Tank", "cost_mult", 0.123_456), None);

        let text = doc.to_json_string().unwrap();
        assert!(text.contains("\"target_distance\": 153"));
        assert_eq!(doc.unit_param("Tank", "cost_mult"), Some(0.1235));
    }

    #[test]
    fn set_returns_previous_value() {
        let mut doc = ConfigDocument::blank();
        doc.set_unit_param("Tank", "health_mult", 1.5);
        assert_eq!(doc.set_unit_param("Tank", "health_mult", 2.0), Some(1.5));
        assert_eq!(doc.set_tech_tier_time(3, 59.6), None);
        assert_eq!(doc.tech_tier_time(3), Some(60.0));
        assert_eq!(doc.set_flag("enabled", false), Some(true));
    }

    #[test]
    fn memory_source_round_trips_edits() {
        let mut source = MemoryConfigSource::new(r#"{"units": {}}"#);
        let mut doc = source.load().unwrap();
        doc.set_unit_param("Scout", "move_speed_mult", 1.2);
        source.save(&doc).unwrap();

        let config = source.load().unwrap().parse().unwrap();
        assert_eq!(
            config.overlay.get(Category::MoveSpeed, "Scout", None),
            Some(1.2)
        );
    }

    #[test]
    fn non_object_units_entry_is_replaced() {
        let mut doc = ConfigDocument::from_json_str(r#"{"units": 3}"#).unwrap();
        doc.set_unit_param("Tank", "cost_mult", 0.5);
        assert_eq!(doc.unit_param("Tank", "cost_mult"), Some(0.5));
    }
}
