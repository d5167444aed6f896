use std::sync::Arc;

use crate::database::manager::DatabaseError;
use crate::database::models::{Group, User};
use crate::database::repository::GroupRepository;

/// Answers who belongs to which group
#[derive(Clone)]
pub struct MembershipResolver {
    groups: Arc<dyn GroupRepository>,
}

impl MembershipResolver {
    pub fn new(groups: Arc<dyn GroupRepository>) -> Self {
        Self { groups }
    }

    pub async fn is_member(&self, user: &User, group: &Group) -> Result<bool, DatabaseError> {
        self.groups.is_member(user, group).await
    }

    pub async fn members_of(&self, group: &Group) -> Result<Vec<User>, DatabaseError> {
        self.groups.members_of(group).await
    }

    pub async fn groups_of(&self, user: &User) -> Result<Vec<Group>, DatabaseError> {
        self.groups.groups_of(user).await
    }

    /// Idempotent
    pub async fn add_member(&self, user: &User, group: &Group) -> Result<(), DatabaseError> {
        self.groups.add_member(user, group).await
    }

    /// Public groups are open to every principal, private ones to members only
    pub async fn can_view(&self, user: &User, group: &Group) -> Result<bool, DatabaseError> {
        if group.public {
            return Ok(true);
        }
        self.is_member(user, group).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_user, MemoryGroups};

    #[tokio::test]
    async fn private_group_is_visible_to_members_only() {
        let groups = Arc::new(MemoryGroups::default());
        let alice = sample_user(1, "alice");
        let bob = sample_user(2, "bob");
        let group = groups.create("family", &alice, false);
        let membership = MembershipResolver::new(groups);

        assert!(membership.can_view(&alice, &group).await.unwrap());
        assert!(!membership.can_view(&bob, &group).await.unwrap());

        membership.add_member(&bob, &group).await.unwrap();
        assert!(membership.can_view(&bob, &group).await.unwrap());
    }

    #[tokio::test]
    async fn adding_twice_keeps_one_membership() {
        let groups = Arc::new(MemoryGroups::default());
        let alice = sample_user(1, "alice");
        let bob = sample_user(2, "bob");
        let group = groups.create("club", &alice, true);
        let membership = MembershipResolver::new(groups);

        membership.add_member(&bob, &group).await.unwrap();
        membership.add_member(&bob, &group).await.unwrap();

        let members = membership.members_of(&group).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(membership.groups_of(&bob).await.unwrap(), vec![group]);
    }
}
