//! Applying overlay notifications and emitting change events.
//!
//! [`OverlayDispatcher`] owns the overlays it has seen and is their only
//! mutator. For an update it captures the previous masks and stores the new
//! ones in one step, then builds the [`OverlayUpdate`] from the result.

use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::event_log::{ChangeKind, EventLog, OverlayRecord};
use crate::events::{EventMetadata, OverlayEvent, OverlayUpdate};
use crate::overlay::{Holder, PermissionOverlay};
use crate::resource::{AnyResource, Resource};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of applying a notification.
#[derive(Debug, Clone)]
pub enum Notification<R> {
    Created(OverlayEvent<R>),
    Updated(OverlayUpdate<R>),
    Deleted(OverlayEvent<R>),
}

impl<R: Resource> Notification<R> {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Notification::Created(_) => ChangeKind::Created,
            Notification::Updated(_) => ChangeKind::Updated,
            Notification::Deleted(_) => ChangeKind::Deleted,
        }
    }

    /// The generic event view, whatever the change
    pub fn event(&self) -> &OverlayEvent<R> {
        match self {
            Notification::Created(event) | Notification::Deleted(event) => event,
            Notification::Updated(update) => update.event(),
        }
    }

    pub fn as_update(&self) -> Option<&OverlayUpdate<R>> {
        match self {
            Notification::Updated(update) => Some(update),
            _ => None,
        }
    }

    pub fn record(&self) -> OverlayRecord {
        match self {
            Notification::Created(event) => OverlayRecord::created(event),
            Notification::Updated(update) => OverlayRecord::updated(update),
            Notification::Deleted(event) => OverlayRecord::deleted(event),
        }
    }
}

/// A raw overlay change as delivered by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChangeNotification {
    Create {
        resource: AnyResource,
        holder: Holder,
        #[serde(default)]
        allow: u64,
        #[serde(default)]
        deny: u64,
        #[serde(default)]
        correlation_id: Option<Uuid>,
    },
    Update {
        resource: AnyResource,
        holder: Holder,
        #[serde(default)]
        allow: u64,
        #[serde(default)]
        deny: u64,
        #[serde(default)]
        correlation_id: Option<Uuid>,
    },
    Delete {
        resource: AnyResource,
        holder: Holder,
        #[serde(default)]
        correlation_id: Option<Uuid>,
    },
}

impl ChangeNotification {
    /// Sender-supplied id copied into the resulting event's metadata
    pub fn correlation_id(&self) -> Option<Uuid> {
        match self {
            ChangeNotification::Create { correlation_id, .. }
            | ChangeNotification::Update { correlation_id, .. }
            | ChangeNotification::Delete { correlation_id, .. } => *correlation_id,
        }
    }
}

type OverlayKey = (Uuid, Holder);
type OverlayMap = HashMap<OverlayKey, PermissionOverlay>;

/// Stores overlays and turns notifications into events.
///
/// Each notification is applied while holding the overlay map, so the
/// lookup, the mask swap and the log append for one change never interleave
/// with another change.
#[derive(Debug)]
pub struct OverlayDispatcher {
    overlays: Mutex<OverlayMap>,
    log: Option<EventLog>,
    config: OverlayConfig,
}

impl OverlayDispatcher {
    pub fn new() -> Self {
        Self::with_config(OverlayConfig::default())
    }

    pub fn with_config(config: OverlayConfig) -> Self {
        let log = if !config.record_events {
            None
        } else if config.unbounded_event_log {
            Some(EventLog::new())
        } else {
            Some(EventLog::with_max_size(config.event_log_capacity))
        };
        debug!(?config, "Creating overlay dispatcher");

        Self {
            overlays: Mutex::new(HashMap::new()),
            log,
            config,
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn event_log(&self) -> Option<&EventLog> {
        self.log.as_ref()
    }

    fn overlays(&self) -> MutexGuard<'_, OverlayMap> {
        // Entries are inserted and removed whole, so the map is consistent even after a panic.
        self.overlays.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, resource_id: Uuid, holder: Holder) -> Option<PermissionOverlay> {
        self.overlays().get(&(resource_id, holder)).cloned()
    }

    /// Overlays on one resource, ordered by holder
    pub fn overlays_for(&self, resource_id: Uuid) -> Vec<PermissionOverlay> {
        let mut found: Vec<_> = self
            .overlays()
            .iter()
            .filter(|((id, _), _)| *id == resource_id)
            .map(|(_, overlay)| overlay.clone())
            .collect();
        found.sort_by_key(|overlay| overlay.holder());
        found
    }

    pub fn len(&self) -> usize {
        self.overlays().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_masks(&self, resource_id: Uuid, holder: Holder, allow: u64, deny: u64) {
        let conflicting = allow & deny;
        if conflicting != 0 && self.config.warn_on_conflicting_masks {
            warn!(
                %resource_id,
                %holder,
                conflicting,
                "Overlay both allows and denies the same bits"
            );
        }
    }

    fn record(&self, record: OverlayRecord) {
        if let Some(log) = &self.log {
            log.append(record);
        }
    }

    /// An overlay appeared on `resource`.
    ///
    /// A create for an overlay that already exists is applied as an update.
    pub fn on_create<R: Resource>(
        &self,
        resource: R,
        holder: Holder,
        allow: u64,
        deny: u64,
    ) -> Notification<R> {
        self.create(resource, holder, allow, deny, EventMetadata::default())
    }

    /// An existing overlay changed.
    pub fn on_update<R: Resource>(
        &self,
        resource: R,
        holder: Holder,
        allow: u64,
        deny: u64,
    ) -> Result<OverlayUpdate<R>> {
        self.update(resource, holder, allow, deny, EventMetadata::default())
    }

    /// An overlay was removed from `resource`.
    pub fn on_delete<R: Resource>(&self, resource: R, holder: Holder) -> Result<OverlayEvent<R>> {
        self.delete(resource, holder, EventMetadata::default())
    }

    fn create<R: Resource>(
        &self,
        resource: R,
        holder: Holder,
        allow: u64,
        deny: u64,
        metadata: EventMetadata,
    ) -> Notification<R> {
        let resource_id = resource.id();
        self.check_masks(resource_id, holder, allow, deny);

        let mut overlays = self.overlays();
        match overlays.entry((resource_id, holder)) {
            Entry::Occupied(entry) => {
                let overlay = entry.get().clone();
                let metadata = metadata.with_note("requested", "create");
                Notification::Updated(self.apply_update(resource, overlay, allow, deny, metadata))
            }
            Entry::Vacant(entry) => {
                let overlay = PermissionOverlay::new(resource_id, holder, allow, deny);
                entry.insert(overlay.clone());
                debug!(%resource_id, %holder, allow, deny, "Overlay created");

                let event = OverlayEvent::with_metadata(resource, overlay, metadata);
                self.record(OverlayRecord::created(&event));
                Notification::Created(event)
            }
        }
    }

    fn update<R: Resource>(
        &self,
        resource: R,
        holder: Holder,
        allow: u64,
        deny: u64,
        metadata: EventMetadata,
    ) -> Result<OverlayUpdate<R>> {
        let resource_id = resource.id();
        self.check_masks(resource_id, holder, allow, deny);

        let overlays = self.overlays();
        let overlay = overlays
            .get(&(resource_id, holder))
            .cloned()
            .ok_or(OverlayError::OverlayNotFound {
                resource_id,
                holder,
            })?;
        Ok(self.apply_update(resource, overlay, allow, deny, metadata))
    }

    /// Swap the masks and emit the update. Callers hold the overlay map.
    fn apply_update<R: Resource>(
        &self,
        resource: R,
        overlay: PermissionOverlay,
        allow: u64,
        deny: u64,
        metadata: EventMetadata,
    ) -> OverlayUpdate<R> {
        let old = overlay.replace_masks(allow, deny);
        debug!(
            resource_id = %overlay.resource_id(),
            holder = %overlay.holder(),
            old_allow = old.allow,
            old_deny = old.deny,
            allow,
            deny,
            "Overlay updated"
        );

        let update = OverlayUpdate::with_metadata(resource, overlay, old.allow, old.deny, metadata);
        self.record(OverlayRecord::updated(&update));
        update
    }

    fn delete<R: Resource>(
        &self,
        resource: R,
        holder: Holder,
        metadata: EventMetadata,
    ) -> Result<OverlayEvent<R>> {
        let resource_id = resource.id();
        let mut overlays = self.overlays();
        let overlay = overlays
            .remove(&(resource_id, holder))
            .ok_or(OverlayError::OverlayNotFound {
                resource_id,
                holder,
            })?;

        debug!(%resource_id, %holder, "Overlay deleted");
        let event = OverlayEvent::with_metadata(resource, overlay, metadata);
        self.record(OverlayRecord::deleted(&event));
        Ok(event)
    }

    /// Drop every overlay of a deleted resource, returning how many were removed.
    ///
    /// No events are emitted; the resource deletion itself is the notification.
    pub fn on_resource_deleted(&self, resource_id: Uuid) -> usize {
        let mut overlays = self.overlays();
        let before = overlays.len();
        overlays.retain(|(id, _), _| *id != resource_id);
        let removed = before - overlays.len();
        info!(%resource_id, removed, "Resource deleted, dropped its overlays");
        removed
    }

    /// Apply a raw notification, carrying its correlation id into the event.
    pub fn dispatch(&self, notification: ChangeNotification) -> Result<Notification<AnyResource>> {
        let metadata = EventMetadata::new(notification.correlation_id());
        match notification {
            ChangeNotification::Create {
                resource,
                holder,
                allow,
                deny,
                ..
            } => Ok(self.create(resource, holder, allow, deny, metadata)),
            ChangeNotification::Update {
                resource,
                holder,
                allow,
                deny,
                ..
            } => self
                .update(resource, holder, allow, deny, metadata)
                .map(Notification::Updated),
            ChangeNotification::Delete {
                resource, holder, ..
            } => self
                .delete(resource, holder, metadata)
                .map(Notification::Deleted),
        }
    }
}

impl Default for OverlayDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
