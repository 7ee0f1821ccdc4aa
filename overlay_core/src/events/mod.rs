//! Events describing overlay changes on a resource.
//!
//! [`OverlayEvent`] is shared by every change kind. [`OverlayUpdate`] adds
//! the masks the overlay held before the update. Both are generic over the
//! resource kind; see [`variants`] for the typed aliases.

mod metadata;
mod update;
pub mod variants;

pub use metadata::EventMetadata;
pub use update::OverlayUpdate;
pub use variants::*;

use crate::holder::{
    resolve_member, resolve_permission_holder, resolve_role, HolderLookup, Member,
    PermissionHolder, Role,
};
use crate::overlay::{Holder, PermissionOverlay};
use crate::resource::Resource;

/// An overlay on `resource` was created, updated or deleted.
#[derive(Debug, Clone)]
pub struct OverlayEvent<R> {
    resource: R,
    overlay: PermissionOverlay,
    metadata: EventMetadata,
}

impl<R: Resource> OverlayEvent<R> {
    pub fn new(resource: R, overlay: PermissionOverlay) -> Self {
        Self::with_metadata(resource, overlay, EventMetadata::default())
    }

    pub fn with_metadata(resource: R, overlay: PermissionOverlay, metadata: EventMetadata) -> Self {
        Self {
            resource,
            overlay,
            metadata,
        }
    }

    /// The resource the overlay belongs to
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// The affected overlay. Reads reflect its current state.
    pub fn permission_overlay(&self) -> &PermissionOverlay {
        &self.overlay
    }

    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    pub fn holder(&self) -> Holder {
        self.overlay.holder()
    }

    pub fn is_role_override(&self) -> bool {
        self.overlay.is_role_override()
    }

    /// Whether the overlay targets a member.
    ///
    /// [`OverlayEvent::member`] can still be `None` when the member is not cached.
    pub fn is_member_override(&self) -> bool {
        self.overlay.is_member_override()
    }

    /// The cached member or role, whichever the overlay targets
    pub fn permission_holder<C>(&self, cache: &C) -> Option<Box<dyn PermissionHolder>>
    where
        C: HolderLookup + ?Sized,
    {
        resolve_permission_holder(&self.overlay, cache)
    }

    pub fn member<C>(&self, cache: &C) -> Option<Member>
    where
        C: HolderLookup + ?Sized,
    {
        resolve_member(&self.overlay, cache)
    }

    pub fn role<C>(&self, cache: &C) -> Option<Role>
    where
        C: HolderLookup + ?Sized,
    {
        resolve_role(&self.overlay, cache)
    }

    pub fn into_parts(self) -> (R, PermissionOverlay, EventMetadata) {
        (self.resource, self.overlay, self.metadata)
    }
}
