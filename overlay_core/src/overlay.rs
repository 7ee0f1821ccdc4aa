use crate::permission::{decode, PermissionSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Who a permission overlay applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Holder {
    /// A single member.
    Member(Uuid),
    /// Every member carrying the role.
    Role(Uuid),
}

impl Holder {
    pub fn id(&self) -> Uuid {
        match self {
            Holder::Member(id) | Holder::Role(id) => *id,
        }
    }

    pub fn is_member(&self) -> bool {
        matches!(self, Holder::Member(_))
    }

    pub fn is_role(&self) -> bool {
        matches!(self, Holder::Role(_))
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Holder::Member(id) => write!(f, "member {}", id),
            Holder::Role(id) => write!(f, "role {}", id),
        }
    }
}

/// An allow/deny pair as stored on an overlay.
///
/// Both masks are kept verbatim. A bit present in both is not rejected here;
/// consumers that evaluate permissions treat it as denied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayMasks {
    pub allow: u64,
    pub deny: u64,
}

impl OverlayMasks {
    pub fn new(allow: u64, deny: u64) -> Self {
        Self { allow, deny }
    }

    pub fn allow_raw(&self) -> u64 {
        self.allow
    }

    pub fn deny_raw(&self) -> u64 {
        self.deny
    }

    /// Bits with no explicit decision, over the whole 64-bit domain.
    ///
    /// Unregistered high bits are included; [`decode`] drops them.
    pub fn inherited_raw(&self) -> u64 {
        !(self.allow | self.deny)
    }

    /// Bits that are both allowed and denied.
    pub fn conflicting_raw(&self) -> u64 {
        self.allow & self.deny
    }

    pub fn allow(&self) -> PermissionSet {
        decode(self.allow)
    }

    pub fn deny(&self) -> PermissionSet {
        decode(self.deny)
    }

    pub fn inherited(&self) -> PermissionSet {
        decode(self.inherited_raw())
    }
}

#[derive(Debug)]
struct OverlayInner {
    resource_id: Uuid,
    holder: Holder,
    masks: RwLock<OverlayMasks>,
}

/// A permission overlay for one holder on one resource.
///
/// Cloning yields another handle to the same overlay, so every clone sees
/// the current masks. Handles are read-only outside this crate; the
/// [`OverlayDispatcher`](crate::dispatch::OverlayDispatcher) holding the
/// overlay is the only writer.
///
/// ```compile_fail
/// use overlay_core::{Holder, PermissionOverlay};
/// use uuid::Uuid;
///
/// let overlay = PermissionOverlay::new(Uuid::nil(), Holder::Role(Uuid::nil()), 0, 0);
/// overlay.replace_masks(1, 0);
/// ```
#[derive(Clone)]
pub struct PermissionOverlay {
    inner: Arc<OverlayInner>,
}

impl PermissionOverlay {
    pub fn new(resource_id: Uuid, holder: Holder, allow: u64, deny: u64) -> Self {
        Self {
            inner: Arc::new(OverlayInner {
                resource_id,
                holder,
                masks: RwLock::new(OverlayMasks::new(allow, deny)),
            }),
        }
    }

    pub fn resource_id(&self) -> Uuid {
        self.inner.resource_id
    }

    pub fn holder(&self) -> Holder {
        self.inner.holder
    }

    pub fn holder_id(&self) -> Uuid {
        self.inner.holder.id()
    }

    pub fn is_role_override(&self) -> bool {
        self.inner.holder.is_role()
    }

    pub fn is_member_override(&self) -> bool {
        self.inner.holder.is_member()
    }

    /// Snapshot of the current allow/deny pair.
    pub fn masks(&self) -> OverlayMasks {
        // The masks are plain values, so a poisoned lock still holds a valid pair.
        *self
            .inner
            .masks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn allow_raw(&self) -> u64 {
        self.masks().allow_raw()
    }

    pub fn deny_raw(&self) -> u64 {
        self.masks().deny_raw()
    }

    pub fn inherited_raw(&self) -> u64 {
        self.masks().inherited_raw()
    }

    pub fn allow(&self) -> PermissionSet {
        self.masks().allow()
    }

    pub fn deny(&self) -> PermissionSet {
        self.masks().deny()
    }

    pub fn inherited(&self) -> PermissionSet {
        self.masks().inherited()
    }

    /// Store new masks and return the pair they replaced.
    ///
    /// The swap happens under one write lock, so the returned pair is
    /// exactly the state just before the new one became visible.
    pub(crate) fn replace_masks(&self, allow: u64, deny: u64) -> OverlayMasks {
        let mut masks = self
            .inner
            .masks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *masks, OverlayMasks::new(allow, deny))
    }

    /// Whether both handles point at the same overlay.
    pub fn ptr_eq(&self, other: &PermissionOverlay) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for PermissionOverlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masks = self.masks();
        f.debug_struct("PermissionOverlay")
            .field("resource_id", &self.inner.resource_id)
            .field("holder", &self.inner.holder)
            .field("allow", &format_args!("{:#x}", masks.allow))
            .field("deny", &format_args!("{:#x}", masks.deny))
            .finish()
    }
}
