#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Leadership succession for batches of entities spawned together.
//!
//! Each group keeps its members in spawn order. The first surviving member
//! leads; when the leader is returned the next member in line takes over, and
//! the group disbands once its last member is gone.

use std::collections::HashMap;

use spawn_director_core::{EntityHandle, GroupId};

/// Members of one group, leader first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupState {
    members: Vec<EntityHandle>,
}

impl GroupState {
    /// Current leader, if any member remains.
    #[must_use]
    pub fn leader(&self) -> Option<EntityHandle> {
        self.members.first().copied()
    }

    /// Surviving members in succession order.
    #[must_use]
    pub fn members(&self) -> &[EntityHandle] {
        &self.members
    }
}

/// Effect of removing a member from its group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Succession {
    /// A follower left; the leader is unchanged.
    Unchanged,
    /// The leader left and the provided member took over.
    Promoted(EntityHandle),
    /// The last member left and the group was removed.
    Disbanded,
    /// The group or member was not registered.
    Unknown,
}

/// Registry of live groups keyed by [`GroupId`].
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<GroupId, GroupState>,
    next_id: u64,
}

impl GroupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a group whose first member leads.
    pub fn create_group(&mut self, members: Vec<EntityHandle>) -> GroupId {
        let id = GroupId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let _ = self.groups.insert(id, GroupState { members });
        id
    }

    /// Drops a group regardless of its remaining members.
    pub fn remove_group(&mut self, id: GroupId) -> Option<GroupState> {
        self.groups.remove(&id)
    }

    /// Looks up a group.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&GroupState> {
        self.groups.get(&id)
    }

    /// Current leader of a group.
    #[must_use]
    pub fn leader(&self, id: GroupId) -> Option<EntityHandle> {
        self.groups.get(&id).and_then(GroupState::leader)
    }

    /// Number of live groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Reports whether no group is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Removes a returned member and passes leadership on when needed.
    pub fn member_returned(&mut self, id: GroupId, handle: EntityHandle) -> Succession {
        let Some(group) = self.groups.get_mut(&id) else {
            return Succession::Unknown;
        };
        let Some(position) = group.members.iter().position(|member| *member == handle) else {
            return Succession::Unknown;
        };

        let _ = group.members.remove(position);
        if group.members.is_empty() {
            let _ = self.groups.remove(&id);
            log::debug!("group {} disbanded", id.get());
            return Succession::Disbanded;
        }

        if position == 0 {
            let leader = group.members[0];
            log::debug!(
                "group {} leadership passed to entity {}",
                id.get(),
                leader.get()
            );
            Succession::Promoted(leader)
        } else {
            Succession::Unchanged
        }
    }

    /// Drops every group.
    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
