use crate::overlay::OverlayMasks;
use crate::permission::{decode, PermissionSet};
use serde::{Deserialize, Serialize};

/// Difference between two states of the same overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayDiff {
    pub old: OverlayMasks,
    pub new: OverlayMasks,
}

impl OverlayDiff {
    pub fn between(old: OverlayMasks, new: OverlayMasks) -> Self {
        Self { old, new }
    }

    /// Bits whose allow or deny state changed, registered or not.
    pub fn changed_raw(&self) -> u64 {
        (self.old.allow ^ self.new.allow) | (self.old.deny ^ self.new.deny)
    }

    /// True when the raw masks are identical.
    pub fn is_empty(&self) -> bool {
        self.changed_raw() == 0
    }

    pub fn newly_allowed(&self) -> PermissionSet {
        decode(self.new.allow & !self.old.allow)
    }

    pub fn no_longer_allowed(&self) -> PermissionSet {
        decode(self.old.allow & !self.new.allow)
    }

    pub fn newly_denied(&self) -> PermissionSet {
        decode(self.new.deny & !self.old.deny)
    }

    pub fn no_longer_denied(&self) -> PermissionSet {
        decode(self.old.deny & !self.new.deny)
    }

    /// Permissions that had an explicit decision before and now fall through.
    pub fn newly_inherited(&self) -> PermissionSet {
        decode(self.new.inherited_raw() & !self.old.inherited_raw())
    }
}
