use super::{EventMetadata, OverlayEvent};
use crate::diff::OverlayDiff;
use crate::holder::{HolderLookup, Member, PermissionHolder, Role};
use crate::overlay::{OverlayMasks, PermissionOverlay};
use crate::permission::PermissionSet;
use crate::resource::Resource;

/// An existing overlay changed its allow or deny mask.
///
/// The overlay carried by the event is live and already holds the new masks.
/// The previous masks are frozen here when the event is built, so the caller
/// must capture them before mutating the overlay and build the event after.
/// Getting that order wrong yields an event whose old and new state match.
#[derive(Debug, Clone)]
pub struct OverlayUpdate<R> {
    event: OverlayEvent<R>,
    old: OverlayMasks,
}

impl<R: Resource> OverlayUpdate<R> {
    pub fn new(resource: R, overlay: PermissionOverlay, old_allow: u64, old_deny: u64) -> Self {
        Self::with_metadata(resource, overlay, old_allow, old_deny, EventMetadata::default())
    }

    pub fn with_metadata(
        resource: R,
        overlay: PermissionOverlay,
        old_allow: u64,
        old_deny: u64,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            event: OverlayEvent::with_metadata(resource, overlay, metadata),
            old: OverlayMasks::new(old_allow, old_deny),
        }
    }

    /// The generic view shared with create and delete events
    pub fn event(&self) -> &OverlayEvent<R> {
        &self.event
    }

    pub fn into_event(self) -> OverlayEvent<R> {
        self.event
    }

    pub fn resource(&self) -> &R {
        self.event.resource()
    }

    /// The updated overlay, holding the new masks
    pub fn permission_overlay(&self) -> &PermissionOverlay {
        self.event.permission_overlay()
    }

    pub fn metadata(&self) -> &EventMetadata {
        self.event.metadata()
    }

    pub fn is_role_override(&self) -> bool {
        self.event.is_role_override()
    }

    pub fn is_member_override(&self) -> bool {
        self.event.is_member_override()
    }

    pub fn permission_holder<C>(&self, cache: &C) -> Option<Box<dyn PermissionHolder>>
    where
        C: HolderLookup + ?Sized,
    {
        self.event.permission_holder(cache)
    }

    pub fn member<C>(&self, cache: &C) -> Option<Member>
    where
        C: HolderLookup + ?Sized,
    {
        self.event.member(cache)
    }

    pub fn role<C>(&self, cache: &C) -> Option<Role>
    where
        C: HolderLookup + ?Sized,
    {
        self.event.role(cache)
    }

    /// The masks as they were before the update
    pub fn old_masks(&self) -> OverlayMasks {
        self.old
    }

    pub fn old_allow_raw(&self) -> u64 {
        self.old.allow_raw()
    }

    pub fn old_deny_raw(&self) -> u64 {
        self.old.deny_raw()
    }

    /// `!(old_allow | old_deny)` over all 64 bits, unregistered bits included
    pub fn old_inherited_raw(&self) -> u64 {
        self.old.inherited_raw()
    }

    pub fn old_allow(&self) -> PermissionSet {
        self.old.allow()
    }

    pub fn old_deny(&self) -> PermissionSet {
        self.old.deny()
    }

    pub fn old_inherited(&self) -> PermissionSet {
        self.old.inherited()
    }

    /// Compare the frozen old masks against the overlay's current masks.
    pub fn diff(&self) -> OverlayDiff {
        OverlayDiff::between(self.old, self.permission_overlay().masks())
    }
}
