//! Operator commands.
//!
//! Commands arrive as chat lines. Edits go to the configuration document
//! and take effect on the next `rebalance`; only `rebalance` itself touches
//! the running session.

use std::fmt;
use std::time::Duration;

use tracing::info;

use crate::chunker::Transport;
use crate::config::{Category, ConfigSource};
use crate::error::CommandError;
use crate::host::{Participant, ParticipantId, Session};
use crate::lifecycle::LifecycleController;
use crate::store::SyncStore;

/// Top-level boolean keys `flag` may change.
pub const FLAG_KEYS: [&str; 3] = ["enabled", "dump_fields", "shrimp_disable_aim"];

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    /// Revert and reload, or revert only.
    Rebalance {
        /// Stop after the revert.
        defaults: bool,
    },
    /// Set one per-unit value.
    Set {
        /// Display name, may contain spaces.
        unit: String,
        /// Configuration key such as `pri_damage_mult`.
        key: String,
        /// New value.
        value: f64,
    },
    /// Set a technology tier's build time.
    Tech {
        /// Tier number.
        tier: u32,
        /// Build time in seconds.
        seconds: f64,
    },
    /// Set a top-level boolean.
    Flag {
        /// One of [`FLAG_KEYS`].
        key: String,
        /// New value.
        value: bool,
    },
}

fn number(what: &'static str, token: &str) -> Result<f64, CommandError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CommandError::InvalidValue {
            what,
            value: token.to_string(),
        })
}

fn switch(token: &str) -> Result<bool, CommandError> {
    match token.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(CommandError::InvalidValue {
            what: "switch (on/off)",
            value: token.to_string(),
        }),
    }
}

fn is_known_key(unit: &str, key: &str) -> bool {
    if unit == "_teleport" {
        return matches!(key, "cooldown" | "duration");
    }
    Category::parse_key(key).is_some()
}

impl OperatorCommand {
    /// Parses a chat line. A leading `/` is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] naming what is wrong with the line.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let line = line.strip_prefix('/').unwrap_or(line);
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = tokens.split_first() else {
            return Err(CommandError::Empty);
        };

        match command.to_ascii_lowercase().as_str() {
            "rebalance" => match args {
                [] => Ok(Self::Rebalance { defaults: false }),
                [arg] if arg.eq_ignore_ascii_case("default") || arg.eq_ignore_ascii_case("defaults") => {
                    Ok(Self::Rebalance { defaults: true })
                }
                [arg, ..] => Err(CommandError::InvalidValue {
                    what: "rebalance argument",
                    value: (*arg).to_string(),
                }),
            },
            "set" => {
                if args.len() < 3 {
                    return Err(CommandError::MissingArgument("set <unit> <key> <value>"));
                }
                let (unit, rest) = args.split_at(args.len() - 2);
                let unit = unit.join(" ");
                let key = rest[0].to_string();
                if !is_known_key(&unit, &key) {
                    return Err(CommandError::UnknownKey(key));
                }
                let value = number("number", rest[1])?;
                Ok(Self::Set { unit, key, value })
            }
            "tech" => {
                let [tier, seconds] = args else {
                    return Err(CommandError::MissingArgument("tech <tier> <seconds>"));
                };
                let tier = tier.parse::<u32>().map_err(|_| CommandError::InvalidValue {
                    what: "tier",
                    value: (*tier).to_string(),
                })?;
                let seconds = number("number of seconds", seconds)?;
                if seconds < 0.0 {
                    return Err(CommandError::InvalidValue {
                        what: "number of seconds",
                        value: seconds.to_string(),
                    });
                }
                Ok(Self::Tech { tier, seconds })
            }
            "flag" => {
                let [key, value] = args else {
                    return Err(CommandError::MissingArgument("flag <key> <on|off>"));
                };
                if !FLAG_KEYS.contains(key) {
                    return Err(CommandError::UnknownKey((*key).to_string()));
                }
                Ok(Self::Flag {
                    key: (*key).to_string(),
                    value: switch(value)?,
                })
            }
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    /// Carries out the command on behalf of `operator`, recording edits in
    /// `audit`. Returns a reply for the operator.
    ///
    /// # Errors
    ///
    /// Fails if the configuration cannot be edited or the controller refuses
    /// the transition.
    pub fn execute<C, S, T>(
        &self,
        controller: &mut LifecycleController<C, S, T>,
        session: &mut Session,
        operator: &Participant,
        audit: &mut AuditLog,
    ) -> Result<String, CommandError>
    where
        C: ConfigSource,
        S: SyncStore,
        T: Transport,
    {
        match self {
            Self::Rebalance { defaults } => {
                controller.rebalance(session, *defaults)?;
                Ok(if *defaults {
                    "Defaults restored.".to_string()
                } else {
                    "Balance reloaded and applied.".to_string()
                })
            }
            Self::Set { unit, key, value } => {
                let (old, stored) = controller.edit_config(|doc| {
                    let old = doc.set_unit_param(unit, key, *value);
                    (old, doc.unit_param(unit, key).unwrap_or(*value))
                })?;
                audit.record(controller.elapsed(), operator, unit, key, old, stored);
                Ok(format!("{unit} {key} = {stored}. Run 'rebalance' to apply."))
            }
            Self::Tech { tier, seconds } => {
                let old = controller.edit_config(|doc| doc.set_tech_tier_time(*tier, *seconds))?;
                audit.record(
                    controller.elapsed(),
                    operator,
                    "tech_time",
                    &format!("tier_{tier}"),
                    old,
                    seconds.round(),
                );
                Ok(format!("Tier {tier} build time = {}s. Run 'rebalance' to apply.", seconds.round()))
            }
            Self::Flag { key, value } => {
                let old = controller.edit_config(|doc| doc.set_flag(key, *value))?;
                audit.record(
                    controller.elapsed(),
                    operator,
                    "flags",
                    key,
                    old.map(f64::from),
                    f64::from(*value),
                );
                Ok(format!("{key} = {value}. Run 'rebalance' to apply."))
            }
        }
    }
}

// =============================================================================
// Audit Log
// =============================================================================

/// One recorded configuration edit.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Session time of the edit.
    pub at: Duration,
    /// Operator display name.
    pub operator: String,
    /// Operator identifier.
    pub operator_id: ParticipantId,
    /// Unit, or section for non-unit edits.
    pub unit: String,
    /// Key edited.
    pub key: String,
    /// Previous value, if one was set.
    pub old: Option<f64>,
    /// New value.
    pub new: f64,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[t={:.1}] {} ({}): {} {} ",
            self.at.as_secs_f64(),
            self.operator,
            self.operator_id,
            self.unit,
            self.key
        )?;
        match self.old {
            Some(old) => write!(f, "{old}")?,
            None => f.write_str("unset")?,
        }
        write!(f, " -> {}", self.new)
    }
}

/// Append-only record of operator edits.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and logs it.
    pub fn record(
        &mut self,
        at: Duration,
        operator: &Participant,
        unit: &str,
        key: &str,
        old: Option<f64>,
        new: f64,
    ) {
        let entry = AuditEntry {
            at,
            operator: operator.name.clone(),
            operator_id: operator.id,
            unit: unit.to_string(),
            key: key.to_string(),
            old,
            new,
        };
        info!(audit = %entry, "configuration edited");
        self.entries.push(entry);
    }

    /// Entries in order.
    #[must_use]
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Entries rendered one per line.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(ToString::to_string)
    }
}

#[cfg(test)]
mod commands_tests {
    use super::*;

    #[test]
    fn parses_rebalance_variants() {
        assert_eq!(
            OperatorCommand::parse("rebalance").unwrap(),
            OperatorCommand::Rebalance { defaults: false }
        );
        assert_eq!(
            OperatorCommand::parse("/rebalance default").unwrap(),
            OperatorCommand::Rebalance { defaults: true }
        );
        assert!(OperatorCommand::parse("rebalance now").is_err());
    }

    #[test]
    fn set_takes_multi_word_unit_names() {
        assert_eq!(
            OperatorCommand::parse("set Heavy Tank pri_damage_mult 1.25").unwrap(),
            OperatorCommand::Set {
                unit: "Heavy Tank".to_string(),
                key: "pri_damage_mult".to_string(),
                value: 1.25,
            }
        );
        assert!(matches!(
            OperatorCommand::parse("set Tank bogus_mult 2"),
            Err(CommandError::UnknownKey(_))
        ));
        assert!(matches!(
            OperatorCommand::parse("set Tank cost_mult abc"),
            Err(CommandError::InvalidValue { .. })
        ));
        assert!(matches!(
            OperatorCommand::parse("set Tank cost_mult"),
            Err(CommandError::MissingArgument(_))
        ));
    }

    #[test]
    fn teleport_pseudo_unit_accepts_its_keys() {
        assert!(OperatorCommand::parse("set _teleport cooldown 20").is_ok());
        assert!(OperatorCommand::parse("set Tank cooldown 20").is_err());
    }

    #[test]
    fn parses_tech_and_flag() {
        assert_eq!(
            OperatorCommand::parse("tech 2 45").unwrap(),
            OperatorCommand::Tech { tier: 2, seconds: 45.0 }
        );
        assert!(OperatorCommand::parse("tech two 45").is_err());
        assert_eq!(
            OperatorCommand::parse("flag enabled off").unwrap(),
            OperatorCommand::Flag {
                key: "enabled".to_string(),
                value: false,
            }
        );
        assert!(OperatorCommand::parse("flag verbose on").is_err());
        assert!(matches!(OperatorCommand::parse("   "), Err(CommandError::Empty)));
        assert!(matches!(
            OperatorCommand::parse("nuke"),
            Err(CommandError::UnknownCommand(_))
        ));
    }

    #[test]
    fn audit_entry_format() {
        let mut log = AuditLog::new();
        let operator = Participant::remote(42, "alice");
        log.record(Duration::from_millis(12_340), &operator, "Tank", "cost_mult", None, 0.8);
        log.record(Duration::from_secs(15), &operator, "Tank", "cost_mult", Some(0.8), 0.75);
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines[0], "[t=12.3] alice (42): Tank cost_mult unset -> 0.8");
        assert_eq!(lines[1], "[t=15.0] alice (42): Tank cost_mult 0.8 -> 0.75");
    }
}
