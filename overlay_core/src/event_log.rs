use crate::events::{EventMetadata, OverlayEvent, OverlayUpdate};
use crate::overlay::{Holder, OverlayMasks};
use crate::resource::{Resource, ResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// A serializable summary of one overlay event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayRecord {
    pub event_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub change: ChangeKind,
    pub resource_id: Uuid,
    pub resource_kind: ResourceKind,
    pub holder: Holder,
    /// Carried over from the notification that caused the event
    #[serde(default)]
    pub correlation_id: Option<Uuid>,
    /// Masks before the change; absent for creations
    pub old: Option<OverlayMasks>,
    /// Masks after the change; absent for deletions
    pub new: Option<OverlayMasks>,
}

impl OverlayRecord {
    fn from_event<R: Resource>(
        change: ChangeKind,
        event: &OverlayEvent<R>,
        old: Option<OverlayMasks>,
        new: Option<OverlayMasks>,
    ) -> Self {
        let metadata: &EventMetadata = event.metadata();
        Self {
            event_id: metadata.event_id,
            timestamp: metadata.timestamp,
            change,
            resource_id: event.resource().id(),
            resource_kind: event.resource().kind(),
            holder: event.holder(),
            correlation_id: metadata.correlation_id,
            old,
            new,
        }
    }

    pub fn created<R: Resource>(event: &OverlayEvent<R>) -> Self {
        let masks = event.permission_overlay().masks();
        Self::from_event(ChangeKind::Created, event, None, Some(masks))
    }

    pub fn updated<R: Resource>(update: &OverlayUpdate<R>) -> Self {
        let masks = update.permission_overlay().masks();
        Self::from_event(
            ChangeKind::Updated,
            update.event(),
            Some(update.old_masks()),
            Some(masks),
        )
    }

    /// The overlay's last masks become the old state.
    pub fn deleted<R: Resource>(event: &OverlayEvent<R>) -> Self {
        let masks = event.permission_overlay().masks();
        Self::from_event(ChangeKind::Deleted, event, Some(masks), None)
    }
}

impl fmt::Display for OverlayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} overlay for {} on {} {}",
            self.timestamp, self.change, self.holder, self.resource_kind, self.resource_id
        )
    }
}

/// Thread-safe, optionally bounded record of overlay events.
///
/// When bounded, the oldest record is dropped to make room.
#[derive(Debug, Clone)]
pub struct EventLog {
    records: Arc<Mutex<VecDeque<OverlayRecord>>>,
    max_size: Option<usize>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::new())),
            max_size: None,
        }
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(max_size))),
            max_size: Some(max_size),
        }
    }

    /// Capacity of a bounded log
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    fn records(&self) -> MutexGuard<'_, VecDeque<OverlayRecord>> {
        // Records are pushed and popped whole, so a poisoned queue is still consistent.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, record: OverlayRecord) {
        let mut records = self.records();
        if let Some(max) = self.max_size {
            if max == 0 {
                return;
            }
            while records.len() >= max {
                records.pop_front();
            }
        }
        records.push_back(record);
    }

    /// All records, oldest first
    pub fn all(&self) -> Vec<OverlayRecord> {
        self.records().iter().cloned().collect()
    }

    pub fn for_resource(&self, resource_id: Uuid) -> Vec<OverlayRecord> {
        self.records()
            .iter()
            .filter(|r| r.resource_id == resource_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
