//! Group membership store implementation
//!
//! Membership is stored bidirectionally: group to members for fan-out
//! resolution, client to groups for teardown. Mutations on one group
//! serialize on that group's entry lock; distinct groups only contend on
//! the brief outer-map guards, so a busy group never stalls the rest.
//!
//! Deleting a group marks its entry defunct under the same lock that
//! removed the last member, so a join racing the deletion always falls
//! through to the auto-create path and gets fresh metadata. A defunct
//! entry still sitting in the map is invisible to every read path.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::stats::GroupStatistics;

use super::info::GroupInfo;

/// Per-group state: metadata plus the member set
struct GroupEntry {
    info: GroupInfo,
    members: HashSet<String>,
    /// Set when the group is deleted; entries are never resurrected
    defunct: bool,
}

impl GroupEntry {
    fn new(info: GroupInfo) -> Self {
        Self {
            info,
            members: HashSet::new(),
            defunct: false,
        }
    }
}

/// Bidirectional group membership store
pub struct GroupStore {
    /// Map of group id to group entry
    groups: RwLock<HashMap<String, Arc<Mutex<GroupEntry>>>>,

    /// Client id to the groups it belongs to
    by_client: RwLock<HashMap<String, HashSet<String>>>,
}

impl GroupStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
            by_client: RwLock::new(HashMap::new()),
        }
    }

    /// Join a group, creating it if absent
    ///
    /// Auto-creation installs `user_id` as creator and sole administrator.
    /// Returns `false` only when the client was already a member.
    pub async fn join(&self, client_id: &str, user_id: &str, group_id: &str) -> bool {
        loop {
            let existing = {
                let groups = self.groups.read().await;
                groups.get(group_id).cloned()
            };

            if let Some(entry_arc) = existing {
                let mut entry = entry_arc.lock().await;
                if !entry.defunct {
                    if !entry.members.insert(client_id.to_string()) {
                        return false;
                    }
                    self.index_join(client_id, group_id).await;
                    tracing::info!(
                        client_id = %client_id,
                        user_id = %user_id,
                        group = %group_id,
                        members = entry.members.len(),
                        "Joined group"
                    );
                    return true;
                }
                // Deleted underneath us; fall through to the create path.
            }

            let mut groups = self.groups.write().await;
            let live = groups
                .get(group_id)
                .map(|arc| Arc::clone(arc));
            if let Some(arc) = live {
                // A concurrent join may have (re)created the group. Retry
                // the member-insert path unless it is the defunct husk.
                if !arc.lock().await.defunct {
                    continue;
                }
            }

            let mut entry = GroupEntry::new(GroupInfo::new(group_id, user_id));
            entry.members.insert(client_id.to_string());
            groups.insert(group_id.to_string(), Arc::new(Mutex::new(entry)));
            drop(groups);

            self.index_join(client_id, group_id).await;
            tracing::info!(
                client_id = %client_id,
                user_id = %user_id,
                group = %group_id,
                "Group created on first join"
            );
            return true;
        }
    }

    /// Leave a group
    ///
    /// Removing the last member deletes the group and its metadata in the
    /// same critical section; a later join recreates it from scratch.
    pub async fn leave(&self, client_id: &str, group_id: &str) -> bool {
        let entry_arc = {
            let groups = self.groups.read().await;
            match groups.get(group_id) {
                Some(arc) => Arc::clone(arc),
                None => return false,
            }
        };

        let became_empty = {
            let mut entry = entry_arc.lock().await;
            if entry.defunct || !entry.members.remove(client_id) {
                return false;
            }
            let empty = entry.members.is_empty();
            if empty {
                entry.defunct = true;
            }
            self.index_leave(client_id, group_id).await;
            tracing::info!(
                client_id = %client_id,
                group = %group_id,
                members = entry.members.len(),
                "Left group"
            );
            empty
        };

        if became_empty {
            let mut groups = self.groups.write().await;
            if let Some(current) = groups.get(group_id) {
                if Arc::ptr_eq(current, &entry_arc) {
                    groups.remove(group_id);
                }
            }
            tracing::info!(group = %group_id, "Empty group deleted");
        }

        true
    }

    /// Kick a member; `operator` must be a group administrator
    pub async fn kick(&self, client_id: &str, group_id: &str, operator: &str) -> bool {
        let entry_arc = {
            let groups = self.groups.read().await;
            match groups.get(group_id) {
                Some(arc) => Arc::clone(arc),
                None => return false,
            }
        };

        {
            let entry = entry_arc.lock().await;
            if entry.defunct {
                return false;
            }
            if !entry.info.is_admin(operator) {
                tracing::warn!(
                    operator = %operator,
                    group = %group_id,
                    "Kick denied: not an administrator"
                );
                return false;
            }
        }

        self.leave(client_id, group_id).await
    }

    /// Disband a group; `operator` must be the creator or an administrator
    ///
    /// Detaches every member, then deletes the group.
    pub async fn disband(&self, group_id: &str, operator: &str) -> bool {
        let entry_arc = {
            let groups = self.groups.read().await;
            match groups.get(group_id) {
                Some(arc) => Arc::clone(arc),
                None => return false,
            }
        };

        let members = {
            let mut entry = entry_arc.lock().await;
            if entry.defunct {
                return false;
            }
            if entry.info.creator != operator && !entry.info.is_admin(operator) {
                tracing::warn!(
                    operator = %operator,
                    group = %group_id,
                    "Disband denied: not creator or administrator"
                );
                return false;
            }
            entry.defunct = true;
            std::mem::take(&mut entry.members)
        };

        {
            let mut by_client = self.by_client.write().await;
            for member in &members {
                if let Some(groups) = by_client.get_mut(member) {
                    groups.remove(group_id);
                    if groups.is_empty() {
                        by_client.remove(member);
                    }
                }
            }
        }

        {
            let mut groups = self.groups.write().await;
            if let Some(current) = groups.get(group_id) {
                if Arc::ptr_eq(current, &entry_arc) {
                    groups.remove(group_id);
                }
            }
        }

        tracing::info!(
            group = %group_id,
            operator = %operator,
            members = members.len(),
            "Group disbanded"
        );
        true
    }

    /// Grant administrator rights; `operator` must already hold them
    pub async fn add_administrator(&self, group_id: &str, user_id: &str, operator: &str) -> bool {
        let entry_arc = {
            let groups = self.groups.read().await;
            match groups.get(group_id) {
                Some(arc) => Arc::clone(arc),
                None => return false,
            }
        };

        let mut entry = entry_arc.lock().await;
        if entry.defunct {
            return false;
        }
        if !entry.info.is_admin(operator) {
            tracing::warn!(
                operator = %operator,
                group = %group_id,
                "Promote denied: not an administrator"
            );
            return false;
        }

        entry.info.administrators.insert(user_id.to_string());
        true
    }

    /// Detach a client from every group it belongs to
    ///
    /// The second half of connection teardown. Returns the groups actually
    /// left; groups emptied in the process are deleted as usual.
    pub async fn detach_client(&self, client_id: &str) -> Vec<String> {
        let group_ids: Vec<String> = {
            let by_client = self.by_client.read().await;
            by_client
                .get(client_id)
                .map(|groups| groups.iter().cloned().collect())
                .unwrap_or_default()
        };

        let mut left = Vec::new();
        for group_id in group_ids {
            if self.leave(client_id, &group_id).await {
                left.push(group_id);
            }
        }
        left
    }

    /// Snapshot of a group's member set
    ///
    /// A copy, never a live alias: membership changes after the call
    /// returns are not visible through it.
    pub async fn members(&self, group_id: &str) -> HashSet<String> {
        let entry_arc = {
            let groups = self.groups.read().await;
            match groups.get(group_id) {
                Some(arc) => Arc::clone(arc),
                None => return HashSet::new(),
            }
        };

        let entry = entry_arc.lock().await;
        if entry.defunct {
            HashSet::new()
        } else {
            entry.members.clone()
        }
    }

    /// Snapshot of the groups a client belongs to
    pub async fn groups_of(&self, client_id: &str) -> HashSet<String> {
        let by_client = self.by_client.read().await;
        by_client.get(client_id).cloned().unwrap_or_default()
    }

    /// Whether a group exists
    pub async fn contains(&self, group_id: &str) -> bool {
        let entry_arc = {
            let groups = self.groups.read().await;
            match groups.get(group_id) {
                Some(arc) => Arc::clone(arc),
                None => return false,
            }
        };
        let alive = !entry_arc.lock().await.defunct;
        alive
    }

    /// Whether a client is a member of a group
    pub async fn is_member(&self, client_id: &str, group_id: &str) -> bool {
        self.members(group_id).await.contains(client_id)
    }

    /// Whether a user is an administrator of a group
    pub async fn is_admin(&self, group_id: &str, user_id: &str) -> bool {
        self.info(group_id)
            .await
            .map(|info| info.is_admin(user_id))
            .unwrap_or(false)
    }

    /// Number of members in a group
    pub async fn member_count(&self, group_id: &str) -> usize {
        self.members(group_id).await.len()
    }

    /// Ids of all live groups
    pub async fn group_ids(&self) -> Vec<String> {
        let entries: Vec<(String, Arc<Mutex<GroupEntry>>)> = {
            let groups = self.groups.read().await;
            groups
                .iter()
                .map(|(id, arc)| (id.clone(), Arc::clone(arc)))
                .collect()
        };

        let mut out = Vec::with_capacity(entries.len());
        for (id, arc) in entries {
            if !arc.lock().await.defunct {
                out.push(id);
            }
        }
        out
    }

    /// Copy of a group's metadata
    pub async fn info(&self, group_id: &str) -> Option<GroupInfo> {
        let entry_arc = {
            let groups = self.groups.read().await;
            groups.get(group_id).cloned()?
        };

        let entry = entry_arc.lock().await;
        if entry.defunct {
            None
        } else {
            Some(entry.info.clone())
        }
    }

    /// Aggregate membership statistics
    pub async fn statistics(&self) -> GroupStatistics {
        let entries: Vec<(String, Arc<Mutex<GroupEntry>>)> = {
            let groups = self.groups.read().await;
            groups
                .iter()
                .map(|(id, arc)| (id.clone(), Arc::clone(arc)))
                .collect()
        };

        let mut per_group_size = HashMap::new();
        let mut total_members = 0;
        for (id, arc) in entries {
            let entry = arc.lock().await;
            if !entry.defunct {
                total_members += entry.members.len();
                per_group_size.insert(id, entry.members.len());
            }
        }

        GroupStatistics {
            total_groups: per_group_size.len(),
            total_members,
            per_group_size,
        }
    }

    /// Number of live groups
    pub async fn len(&self) -> usize {
        self.group_ids().await.len()
    }

    /// Whether the store has no groups
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every group and edge; used at hub shutdown
    pub async fn clear(&self) {
        self.groups.write().await.clear();
        self.by_client.write().await.clear();
    }

    async fn index_join(&self, client_id: &str, group_id: &str) {
        let mut by_client = self.by_client.write().await;
        by_client
            .entry(client_id.to_string())
            .or_default()
            .insert(group_id.to_string());
    }

    async fn index_leave(&self, client_id: &str, group_id: &str) {
        let mut by_client = self.by_client.write().await;
        if let Some(groups) = by_client.get_mut(client_id) {
            groups.remove(group_id);
            if groups.is_empty() {
                by_client.remove(client_id);
            }
        }
    }
}

impl Default for GroupStore {
    fn default() -> Self {
        Self::new()
    }
}
