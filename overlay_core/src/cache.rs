use crate::holder::{HolderLookup, Member, Role};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// A thread-safe member and role cache.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    members: Arc<Mutex<HashMap<Uuid, Member>>>,
    roles: Arc<Mutex<HashMap<Uuid, Role>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are inserted and removed whole, so a poisoned map is still consistent.
    fn members(&self) -> MutexGuard<'_, HashMap<Uuid, Member>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn roles(&self) -> MutexGuard<'_, HashMap<Uuid, Role>> {
        self.roles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a member, returning its id
    pub fn insert_member(&self, member: Member) -> Uuid {
        let id = member.id;
        self.members().insert(id, member);
        id
    }

    /// Insert or replace a role, returning its id
    pub fn insert_role(&self, role: Role) -> Uuid {
        let id = role.id;
        self.roles().insert(id, role);
        id
    }

    pub fn remove_member(&self, id: &Uuid) -> Option<Member> {
        self.members().remove(id)
    }

    pub fn remove_role(&self, id: &Uuid) -> Option<Role> {
        self.roles().remove(id)
    }

    pub fn member_count(&self) -> usize {
        self.members().len()
    }

    pub fn role_count(&self) -> usize {
        self.roles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_count() == 0 && self.role_count() == 0
    }
}

impl HolderLookup for InMemoryCache {
    fn member(&self, id: Uuid) -> Option<Member> {
        self.members().get(&id).cloned()
    }

    fn role(&self, id: Uuid) -> Option<Role> {
        self.roles().get(&id).cloned()
    }
}
