//! Per-target chunking of override broadcasts.
//!
//! The transport sends the store's *whole* visible contents to one
//! participant and refuses messages above a size limit. A full override set
//! routinely exceeds that limit while any single target stays well below it,
//! so [`SyncChunker`] narrows the store's visible contents to one target at a
//! time, invokes the unmodified send, and restores the full contents
//! afterwards.
//!
//! The restore is carried by a drop guard, so it also happens if a send
//! panics.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::host::ParticipantId;
use crate::store::{active_targets, OverrideMap, SyncStore, TargetKey};

/// Default per-message limit, in encoded bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1200;

// =============================================================================
// Transport
// =============================================================================

/// Sends override sets to participants.
pub trait Transport {
    /// Sends every enabled entry of `overrides` to `participant` as one
    /// message. Returns the encoded size.
    ///
    /// # Errors
    ///
    /// Fails when the participant is gone, the message is too large or it
    /// cannot be encoded.
    fn send_overrides(
        &mut self,
        participant: ParticipantId,
        overrides: &OverrideMap,
    ) -> Result<usize, TransportError>;

    /// Applies the configured per-message limit. Transports whose limit is
    /// fixed by the host keep it.
    fn set_max_message_bytes(&mut self, _limit: usize) {}
}

/// Wire form of one override message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideMessage {
    /// Enabled overrides only.
    pub overrides: OverrideMap,
}

impl OverrideMessage {
    /// Builds a message from the enabled entries of `overrides`.
    #[must_use]
    pub fn from_overrides(overrides: &OverrideMap) -> Self {
        let overrides = overrides
            .iter()
            .filter_map(|(target, members)| {
                let enabled: BTreeMap<_, _> = members
                    .iter()
                    .filter(|(_, e)| e.enabled)
                    .map(|(m, e)| (m.clone(), *e))
                    .collect();
                (!enabled.is_empty()).then(|| (target.clone(), enabled))
            })
            .collect();
        Self { overrides }
    }

    /// JSON encoding, as measured against the size limit.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// One message accepted by a [`LoopbackTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Recipient.
    pub participant: ParticipantId,
    /// Encoded size.
    pub bytes: usize,
    /// Decoded contents.
    pub message: OverrideMessage,
}

impl Delivery {
    /// Targets carried by this message.
    pub fn targets(&self) -> impl Iterator<Item = &TargetKey> {
        self.message.overrides.keys()
    }
}

/// In-process transport that enforces the size limit and records what it
/// delivered.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    max_message_bytes: usize,
    deliveries: Vec<Delivery>,
    disconnected: BTreeSet<ParticipantId>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_BYTES)
    }
}

impl LoopbackTransport {
    /// Creates a transport with the given message limit.
    #[must_use]
    pub fn new(max_message_bytes: usize) -> Self {
        Self {
            max_message_bytes,
            deliveries: Vec::new(),
            disconnected: BTreeSet::new(),
        }
    }

    /// The message limit.
    #[must_use]
    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    /// Makes every later send to `participant` fail.
    pub fn disconnect(&mut self, participant: ParticipantId) {
        self.disconnected.insert(participant);
    }

    /// Messages delivered so far.
    #[must_use]
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Messages delivered to one participant.
    pub fn deliveries_to(&self, participant: ParticipantId) -> impl Iterator<Item = &Delivery> {
        self.deliveries
            .iter()
            .filter(move |d| d.participant == participant)
    }

    /// Forgets recorded deliveries.
    pub fn clear(&mut self) {
        self.deliveries.clear();
    }
}

impl Transport for LoopbackTransport {
    fn send_overrides(
        &mut self,
        participant: ParticipantId,
        overrides: &OverrideMap,
    ) -> Result<usize, TransportError> {
        if self.disconnected.contains(&participant) {
            return Err(TransportError::Disconnected(participant));
        }
        let message = OverrideMessage::from_overrides(overrides);
        let size = message.encode()?.len();
        if size > self.max_message_bytes {
            return Err(TransportError::MessageTooLarge {
                size,
                limit: self.max_message_bytes,
            });
        }
        self.deliveries.push(Delivery {
            participant,
            bytes: size,
            message,
        });
        Ok(size)
    }

    fn set_max_message_bytes(&mut self, limit: usize) {
        self.max_message_bytes = limit;
    }
}

// =============================================================================
// Chunker
// =============================================================================

/// Outcome of one chunked send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkReport {
    /// Targets delivered.
    pub sent: usize,
    /// Active targets in the store.
    pub total: usize,
    /// Targets whose send failed.
    pub failed: Vec<TargetKey>,
}

impl ChunkReport {
    /// Whether every active target was delivered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sent == self.total
    }
}

/// Restores the full override set when dropped.
struct RestoreGuard<'s, 'c> {
    store: &'s mut dyn SyncStore,
    full: Option<OverrideMap>,
    in_flight: &'c Cell<bool>,
}

impl Drop for RestoreGuard<'_, '_> {
    fn drop(&mut self) {
        if let Some(full) = self.full.take() {
            self.store.replace_overrides(full);
        }
        self.in_flight.set(false);
    }
}

/// Splits a broadcast into one message per target.
#[derive(Debug, Default)]
pub struct SyncChunker {
    in_flight: Cell<bool>,
}

impl SyncChunker {
    /// Creates a chunker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a chunked send is running.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// Sends the store's contents to `participant`, one target per message.
    ///
    /// While a chunked send is already in flight the call is passed straight
    /// to the transport instead. Per-target failures are logged and counted;
    /// they do not stop the remaining targets.
    pub fn send_chunked(
        &self,
        store: &mut dyn SyncStore,
        transport: &mut dyn Transport,
        participant: ParticipantId,
    ) -> ChunkReport {
        if self.in_flight.get() {
            debug!(participant = %participant, "chunked send in flight, passing through");
            return match transport.send_overrides(participant, store.overrides()) {
                Ok(_) => ChunkReport {
                    sent: 1,
                    total: 1,
                    failed: Vec::new(),
                },
                Err(err) => {
                    warn!(participant = %participant, error = %err, "pass-through send failed");
                    ChunkReport {
                        sent: 0,
                        total: 1,
                        failed: Vec::new(),
                    }
                }
            };
        }

        let targets = active_targets(store.overrides());
        let total = targets.len();
        if total == 0 {
            debug!(participant = %participant, "nothing to sync");
            return ChunkReport::default();
        }

        self.in_flight.set(true);
        let full = store.replace_overrides(OverrideMap::new());
        let mut guard = RestoreGuard {
            store,
            full: Some(full),
            in_flight: &self.in_flight,
        };

        let mut report = ChunkReport {
            total,
            ..ChunkReport::default()
        };
        for target in targets {
            let Some(members) = guard.full.as_ref().and_then(|f| f.get(&target)) else {
                continue;
            };
            let single = OverrideMap::from([(target.clone(), members.clone())]);
            guard.store.replace_overrides(single);
            match transport.send_overrides(participant, guard.store.overrides()) {
                Ok(bytes) => {
                    report.sent += 1;
                    debug!(participant = %participant, target = %target, bytes, "target synced");
                }
                Err(err) => {
                    warn!(participant = %participant, target = %target, error = %err, "target sync failed");
                    report.failed.push(target);
                }
            }
        }
        drop(guard);

        info!(participant = %participant, "Sent {}/{}", report.sent, report.total);
        report
    }
}
