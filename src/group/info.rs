//! Group metadata

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Metadata for a single group
///
/// Created only through the auto-create path of a join; deleting the last
/// member deletes this record with it, so stale metadata can never outlive
/// its group.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    /// Group identity
    pub group_id: String,

    /// Display name
    pub group_name: Option<String>,

    /// User that triggered creation
    pub creator: String,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Declared member cap (not enforced here)
    pub max_members: Option<usize>,

    /// Users with kick/disband/promote rights; always contains the creator
    pub administrators: HashSet<String>,

    /// Free-form group attributes
    pub metadata: HashMap<String, Value>,
}

impl GroupInfo {
    /// Create metadata for a fresh group with the creator as sole admin
    pub fn new(group_id: impl Into<String>, creator: impl Into<String>) -> Self {
        let creator = creator.into();
        let mut administrators = HashSet::new();
        administrators.insert(creator.clone());

        Self {
            group_id: group_id.into(),
            group_name: None,
            creator,
            created_at: Utc::now(),
            max_members: None,
            administrators,
            metadata: HashMap::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.group_name = Some(name.into());
        self
    }

    /// Whether a user holds administrator rights
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.administrators.contains(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creator_is_sole_admin() {
        let info = GroupInfo::new("g1", "alice");

        assert_eq!(info.creator, "alice");
        assert!(info.is_admin("alice"));
        assert_eq!(info.administrators.len(), 1);
        assert!(!info.is_admin("bob"));
    }

    #[test]
    fn test_with_name() {
        let info = GroupInfo::new("g1", "alice").with_name("ops");

        assert_eq!(info.group_name.as_deref(), Some("ops"));
    }
}
