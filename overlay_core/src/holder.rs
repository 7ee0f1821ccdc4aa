//! Resolving the holder of an overlay to a cached member or role.
//!
//! Lookups go through [`HolderLookup`], which the owning cache implements.
//! A missing entry is an ordinary outcome: the entity may not be cached yet,
//! or the overlay may point at something deleted upstream.

use crate::overlay::{Holder, PermissionOverlay};
use crate::permission::{decode, Permission, PermissionSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Anything that carries a guild-level permission mask.
pub trait PermissionHolder: fmt::Debug + Send + Sync {
    fn id(&self) -> Uuid;

    fn permissions_raw(&self) -> u64;

    fn permissions(&self) -> PermissionSet {
        decode(self.permissions_raw())
    }

    fn has_permission(&self, permission: Permission) -> bool {
        permission.is_set_in(self.permissions_raw())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub permissions: u64,
}

impl Member {
    pub fn new(id: Uuid, name: impl Into<String>, permissions: u64) -> Self {
        Self {
            id,
            name: name.into(),
            permissions,
        }
    }
}

impl PermissionHolder for Member {
    fn id(&self) -> Uuid {
        self.id
    }

    fn permissions_raw(&self) -> u64 {
        self.permissions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub permissions: u64,
    #[serde(default)]
    pub position: i32,
}

impl Role {
    pub fn new(id: Uuid, name: impl Into<String>, permissions: u64) -> Self {
        Self {
            id,
            name: name.into(),
            permissions,
            position: 0,
        }
    }
}

impl PermissionHolder for Role {
    fn id(&self) -> Uuid {
        self.id
    }

    fn permissions_raw(&self) -> u64 {
        self.permissions
    }
}

/// A holder found in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedHolder {
    Member(Member),
    Role(Role),
}

impl ResolvedHolder {
    pub fn name(&self) -> &str {
        match self {
            ResolvedHolder::Member(member) => &member.name,
            ResolvedHolder::Role(role) => &role.name,
        }
    }

    pub fn as_member(&self) -> Option<&Member> {
        match self {
            ResolvedHolder::Member(member) => Some(member),
            ResolvedHolder::Role(_) => None,
        }
    }

    pub fn as_role(&self) -> Option<&Role> {
        match self {
            ResolvedHolder::Role(role) => Some(role),
            ResolvedHolder::Member(_) => None,
        }
    }

    pub fn into_permission_holder(self) -> Box<dyn PermissionHolder> {
        match self {
            ResolvedHolder::Member(member) => Box::new(member),
            ResolvedHolder::Role(role) => Box::new(role),
        }
    }
}

impl PermissionHolder for ResolvedHolder {
    fn id(&self) -> Uuid {
        match self {
            ResolvedHolder::Member(member) => member.id,
            ResolvedHolder::Role(role) => role.id,
        }
    }

    fn permissions_raw(&self) -> u64 {
        match self {
            ResolvedHolder::Member(member) => member.permissions,
            ResolvedHolder::Role(role) => role.permissions,
        }
    }
}

/// Read access to cached members and roles.
pub trait HolderLookup {
    fn member(&self, id: Uuid) -> Option<Member>;

    fn role(&self, id: Uuid) -> Option<Role>;
}

impl<T: HolderLookup + ?Sized> HolderLookup for &T {
    fn member(&self, id: Uuid) -> Option<Member> {
        (**self).member(id)
    }

    fn role(&self, id: Uuid) -> Option<Role> {
        (**self).role(id)
    }
}

/// Look up the member or role an overlay applies to.
pub fn resolve_holder<C>(overlay: &PermissionOverlay, cache: &C) -> Option<ResolvedHolder>
where
    C: HolderLookup + ?Sized,
{
    match overlay.holder() {
        Holder::Member(id) => cache.member(id).map(ResolvedHolder::Member),
        Holder::Role(id) => cache.role(id).map(ResolvedHolder::Role),
    }
}

/// Same as [`resolve_holder`], erased to [`PermissionHolder`].
pub fn resolve_permission_holder<C>(
    overlay: &PermissionOverlay,
    cache: &C,
) -> Option<Box<dyn PermissionHolder>>
where
    C: HolderLookup + ?Sized,
{
    resolve_holder(overlay, cache).map(ResolvedHolder::into_permission_holder)
}

/// The member of a member overlay. `None` for role overlays.
pub fn resolve_member<C>(overlay: &PermissionOverlay, cache: &C) -> Option<Member>
where
    C: HolderLookup + ?Sized,
{
    match overlay.holder() {
        Holder::Member(id) => cache.member(id),
        Holder::Role(_) => None,
    }
}

/// The role of a role overlay. `None` for member overlays.
pub fn resolve_role<C>(overlay: &PermissionOverlay, cache: &C) -> Option<Role>
where
    C: HolderLookup + ?Sized,
{
    match overlay.holder() {
        Holder::Role(id) => cache.role(id),
        Holder::Member(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeCache {
        members: HashMap<Uuid, Member>,
        roles: HashMap<Uuid, Role>,
    }

    impl HolderLookup for FakeCache {
        fn member(&self, id: Uuid) -> Option<Member> {
            self.members.get(&id).cloned()
        }

        fn role(&self, id: Uuid) -> Option<Role> {
            self.roles.get(&id).cloned()
        }
    }

    fn cache_with(member: &Member, role: &Role) -> FakeCache {
        let mut cache = FakeCache::default();
        cache.members.insert(member.id, member.clone());
        cache.roles.insert(role.id, role.clone());
        cache
    }

    #[test]
    fn test_resolve_member_overlay() {
        let member = Member::new(Uuid::new_v4(), "alice", Permission::Speak.raw());
        let role = Role::new(Uuid::new_v4(), "mods", 0);
        let cache = cache_with(&member, &role);
        let overlay = PermissionOverlay::new(Uuid::new_v4(), Holder::Member(member.id), 0, 0);

        let resolved = resolve_holder(&overlay, &cache).unwrap();
        assert_eq!(resolved.as_member(), Some(&member));
        assert_eq!(resolve_member(&overlay, &cache), Some(member.clone()));
        assert_eq!(resolve_role(&overlay, &cache), None);

        let holder = resolve_permission_holder(&overlay, &cache).unwrap();
        assert_eq!(holder.id(), member.id);
        assert!(holder.has_permission(Permission::Speak));
    }

    #[test]
    fn test_resolve_role_overlay() {
        let member = Member::new(Uuid::new_v4(), "alice", 0);
        let role = Role::new(Uuid::new_v4(), "mods", Permission::KickMembers.raw());
        let cache = cache_with(&member, &role);
        let overlay = PermissionOverlay::new(Uuid::new_v4(), Holder::Role(role.id), 0, 0);

        let resolved = resolve_holder(&overlay, &cache).unwrap();
        assert_eq!(resolved.name(), "mods");
        assert_eq!(resolve_role(&overlay, &cache), Some(role));
        assert_eq!(resolve_member(&overlay, &cache), None);
    }

    #[test]
    fn test_missing_holder_is_none() {
        let cache = FakeCache::default();
        let id = Uuid::new_v4();
        for holder in [Holder::Member(id), Holder::Role(id), Holder::Role(Uuid::nil())] {
            let overlay = PermissionOverlay::new(Uuid::new_v4(), holder, 0, 0);
            assert!(resolve_holder(&overlay, &cache).is_none());
            assert!(resolve_permission_holder(&overlay, &cache).is_none());
        }
    }

    #[test]
    fn test_member_id_does_not_resolve_as_role() {
        let member = Member::new(Uuid::new_v4(), "alice", 0);
        let mut cache = FakeCache::default();
        cache.members.insert(member.id, member.clone());

        let overlay = PermissionOverlay::new(Uuid::new_v4(), Holder::Role(member.id), 0, 0);
        assert!(resolve_holder(&overlay, &cache).is_none());
    }

    #[test]
    fn test_lookup_through_trait_object() {
        let role = Role::new(Uuid::new_v4(), "everyone", 0);
        let mut cache = FakeCache::default();
        cache.roles.insert(role.id, role.clone());
        let lookup: &dyn HolderLookup = &cache;

        let overlay = PermissionOverlay::new(Uuid::new_v4(), Holder::Role(role.id), 0, 0);
        assert_eq!(resolve_role(&overlay, lookup), Some(role));
    }
}
