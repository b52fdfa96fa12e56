use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type GroupId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A set of users sharing expenses. Members are kept in insertion order,
/// which is also the default order of an equal split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: Option<String>,
    pub created_by: UserId,
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Create a group; the creator is always its first member.
    pub fn new(name: impl Into<String>, created_by: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            created_by,
            members: vec![created_by],
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    /// Returns false if the user was already a member.
    pub fn add_member(&mut self, user_id: UserId) -> bool {
        if self.is_member(user_id) {
            return false;
        }
        self.members.push(user_id);
        true
    }

    /// Returns false if the user was not a member.
    pub fn remove_member(&mut self, user_id: UserId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != user_id);
        self.members.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creator_is_first_member() {
        let alice = User::new("alice");
        let group = Group::new("Trip", alice.id);

        assert_eq!(group.members, vec![alice.id]);
        assert!(group.is_member(alice.id));
    }

    #[test]
    fn test_add_member_is_idempotent() {
        let alice = User::new("alice");
        let bob = User::new("bob");
        let mut group = Group::new("Flat", alice.id);

        assert!(group.add_member(bob.id));
        assert!(!group.add_member(bob.id));
        assert_eq!(group.members, vec![alice.id, bob.id]);
    }

    #[test]
    fn test_remove_member() {
        let alice = User::new("alice");
        let bob = User::new("bob").with_email("bob@example.com");
        let mut group = Group::new("Flat", alice.id).with_description("Rent and bills");
        group.add_member(bob.id);

        assert!(group.remove_member(bob.id));
        assert!(!group.remove_member(bob.id));
        assert!(!group.is_member(bob.id));
        assert_eq!(bob.email.as_deref(), Some("bob@example.com"));
    }
}
