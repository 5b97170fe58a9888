//! Error types.
//!
//! Per-field failures during an apply pass are not errors: they surface as
//! [`ApplyOutcome::Skipped`](crate::engine::ApplyOutcome::Skipped). The types
//! here cover the operations that can genuinely fail as a whole.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::host::member::ValueKind;
use crate::host::ParticipantId;
use crate::lifecycle::LifecycleState;
use crate::store::TargetKey;

/// Errors raised while loading or saving the balance configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read balance config {path}: {source}")]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file could not be written.
    #[error("failed to write balance config {path}: {source}")]
    Write {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The document is not valid JSON or has the wrong shape.
    #[error("failed to parse balance config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The document root is not a JSON object.
    #[error("balance config root must be a JSON object")]
    NotAnObject,
}

/// Errors raised by the synchronized override store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The store has not been initialized or its capabilities are missing.
    #[error("override store unavailable")]
    Unavailable,
    /// No source is registered under this target.
    #[error("unknown override target {0}")]
    UnknownTarget(TargetKey),
    /// The target is known but does not expose this member.
    #[error("target {target} has no member {member}")]
    UnknownMember {
        /// Target key.
        target: TargetKey,
        /// Member name.
        member: String,
    },
    /// The value kind does not match the registered member kind.
    #[error("member {member} on {target} expects {expected:?}, got {found:?}")]
    KindMismatch {
        /// Target key.
        target: TargetKey,
        /// Member name.
        member: String,
        /// Registered kind.
        expected: ValueKind,
        /// Submitted kind.
        found: ValueKind,
    },
}

/// Errors raised while transmitting overrides to a participant.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The encoded message exceeds the transport's size limit.
    #[error("message of {size} bytes exceeds limit of {limit}")]
    MessageTooLarge {
        /// Encoded size.
        size: usize,
        /// Limit.
        limit: usize,
    },
    /// The participant is not connected.
    #[error("participant {0} is not connected")]
    Disconnected(ParticipantId),
    /// The message could not be encoded.
    #[error("failed to encode override message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised by operator commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The line was empty.
    #[error("empty command")]
    Empty,
    /// The command word is not recognised.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// A required argument is missing.
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),
    /// An argument that should be numeric is not.
    #[error("'{value}' is not a valid {what}")]
    InvalidValue {
        /// What was expected.
        what: &'static str,
        /// What was given.
        value: String,
    },
    /// The configuration key is not recognised.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
    /// The backing store rejected the edit.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The controller could not carry out the command.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Errors raised by lifecycle transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The transition is not valid from the current state.
    #[error("cannot {action} while {state:?}")]
    InvalidState {
        /// Attempted action.
        action: &'static str,
        /// Current state.
        state: LifecycleState,
    },
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
