//! Hand-off of holder state to multiplayer replication.
//!
//! Crafting never waits on replication. Successful crafts push a snapshot
//! into a bounded channel; the replication side drains it on its own
//! schedule, keeps only the newest snapshot per holder and releases at most
//! one per holder per interval.

use ahash::AHashMap;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use ember_common::{EmberError, EmberResult, EntityId, MagicBytes, SchemaVersion};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::holder::{ResourceHolder, ResourceStack};

/// Holder state as published to replication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderSnapshot {
    /// Owner of the resources
    pub holder: EntityId,
    /// Publish order; higher wins
    pub sequence: u64,
    /// Authoritative full-state push rather than an incremental update
    pub full: bool,
    /// Non-empty stacks sorted by kind
    pub resources: Vec<ResourceStack>,
}

#[derive(Serialize)]
struct FrameRef<'a> {
    version: SchemaVersion,
    snapshot: &'a HolderSnapshot,
}

#[derive(Deserialize)]
struct Frame {
    version: SchemaVersion,
    snapshot: HolderSnapshot,
}

impl HolderSnapshot {
    /// Captures the current state of `holder`.
    #[must_use]
    pub fn capture<H: ResourceHolder + ?Sized>(holder_id: EntityId, holder: &H, full: bool) -> Self {
        Self {
            holder: holder_id,
            sequence: 0,
            full,
            resources: holder.snapshot(),
        }
    }

    /// Serializes to the wire format.
    pub fn to_bytes(&self) -> EmberResult<Vec<u8>> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&MagicBytes::HOLDER_SNAPSHOT.0);

        let frame = FrameRef {
            version: SchemaVersion::HOLDER_SNAPSHOT,
            snapshot: self,
        };
        let data =
            bincode::serialize(&frame).map_err(|e| EmberError::Serialization(e.to_string()))?;
        buffer.extend(data);

        Ok(buffer)
    }

    /// Deserializes from the wire format.
    pub fn from_bytes(bytes: &[u8]) -> EmberResult<Self> {
        if !MagicBytes::HOLDER_SNAPSHOT.matches(bytes) {
            return Err(EmberError::InvalidFormat);
        }

        let frame: Frame = bincode::deserialize(&bytes[4..])
            .map_err(|e| EmberError::Serialization(e.to_string()))?;

        if !SchemaVersion::HOLDER_SNAPSHOT.can_read(&frame.version) {
            return Err(EmberError::VersionMismatch {
                expected: SchemaVersion::HOLDER_SNAPSHOT,
                actual: frame.version,
            });
        }
        if !frame.snapshot.holder.is_valid() {
            return Err(EmberError::InvalidFormat);
        }

        Ok(frame.snapshot)
    }
}

/// Creates a connected publisher/outbox pair.
#[must_use]
pub fn replication_channel(
    capacity: usize,
    min_interval: Duration,
) -> (ReplicationPublisher, ReplicationOutbox) {
    let (sender, receiver) = bounded(capacity);
    let publisher = ReplicationPublisher {
        sender,
        sequence: Arc::new(AtomicU64::new(1)),
    };
    let outbox = ReplicationOutbox {
        receiver,
        pending: AHashMap::new(),
        last_released: AHashMap::new(),
        min_interval,
        stats: OutboxStats::default(),
    };
    (publisher, outbox)
}

/// Crafting-side handle. Cheap to clone; never blocks.
#[derive(Debug, Clone)]
pub struct ReplicationPublisher {
    sender: Sender<HolderSnapshot>,
    sequence: Arc<AtomicU64>,
}

impl ReplicationPublisher {
    /// Publishes an incremental snapshot. Returns false if it was dropped.
    pub fn publish<H: ResourceHolder + ?Sized>(&self, holder_id: EntityId, holder: &H) -> bool {
        self.send(HolderSnapshot::capture(holder_id, holder, false))
    }

    /// Publishes an authoritative full snapshot. Returns false if it was dropped.
    pub fn publish_full<H: ResourceHolder + ?Sized>(&self, holder_id: EntityId, holder: &H) -> bool {
        self.send(HolderSnapshot::capture(holder_id, holder, true))
    }

    fn send(&self, mut snapshot: HolderSnapshot) -> bool {
        snapshot.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        match self.sender.try_send(snapshot) {
            Ok(()) => true,
            Err(TrySendError::Full(s)) => {
                debug!("Replication channel full, dropping snapshot #{}", s.sequence);
                false
            },
            Err(TrySendError::Disconnected(_)) => {
                trace!("Replication outbox gone, snapshot discarded");
                false
            },
        }
    }
}

/// Counters kept by the outbox.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxStats {
    /// Snapshots taken off the channel
    pub received: u64,
    /// Snapshots superseded before release
    pub coalesced: u64,
    /// Snapshots handed to the caller
    pub released: u64,
}

/// Replication-side receiver with per-holder rate limiting.
#[derive(Debug)]
pub struct ReplicationOutbox {
    receiver: Receiver<HolderSnapshot>,
    pending: AHashMap<EntityId, HolderSnapshot>,
    last_released: AHashMap<EntityId, Instant>,
    min_interval: Duration,
    stats: OutboxStats,
}

impl ReplicationOutbox {
    /// Drains the channel and returns the snapshots due at `now`,
    /// ordered by holder.
    pub fn poll(&mut self, now: Instant) -> Vec<HolderSnapshot> {
        while let Ok(snapshot) = self.receiver.try_recv() {
            self.stats.received += 1;
            self.stage(snapshot);
        }

        let mut due: Vec<EntityId> = self
            .pending
            .keys()
            .copied()
            .filter(|holder| {
                self.last_released
                    .get(holder)
                    .map_or(true, |last| now.saturating_duration_since(*last) >= self.min_interval)
            })
            .collect();
        due.sort_unstable();

        let mut released = Vec::with_capacity(due.len());
        for holder in due {
            if let Some(snapshot) = self.pending.remove(&holder) {
                self.last_released.insert(holder, now);
                released.push(snapshot);
            }
        }
        self.stats.released += released.len() as u64;

        // Holders past their interval are not rate limited any more
        let min_interval = self.min_interval;
        self.last_released
            .retain(|_, last| now.saturating_duration_since(*last) < min_interval);

        released
    }

    /// Last write wins per holder; a pending full push stays full.
    fn stage(&mut self, snapshot: HolderSnapshot) {
        match self.pending.get_mut(&snapshot.holder) {
            Some(pending) if pending.sequence > snapshot.sequence => {
                pending.full |= snapshot.full;
                self.stats.coalesced += 1;
            },
            Some(pending) => {
                let full = pending.full || snapshot.full;
                *pending = snapshot;
                pending.full = full;
                self.stats.coalesced += 1;
            },
            None => {
                self.pending.insert(snapshot.holder, snapshot);
            },
        }
    }

    /// Number of holders with a snapshot waiting.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Outbox counters.
    #[must_use]
    pub const fn stats(&self) -> OutboxStats {
        self.stats
    }
}
