//! Persisted group state.
//!
//! Groups are written into a flat string property map, one entry per group:
//!
//! ```text
//! <prefix>.rowGroupHeaderLayer.<n> = {"name":"Person","members":[0,1,2,3],...}
//! ```
//!
//! Values are JSON so the map can live in any key/value store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::GroupError;
use crate::group::Group;
use crate::group_model::GroupModel;

/// Flat key/value store groups are persisted into.
pub type Properties = BTreeMap<String, String>;

pub const STATE_NAMESPACE: &str = "rowGroupHeaderLayer";

/// Everything persisted about one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupState {
    pub name: String,
    pub members: Vec<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_indexes: Vec<usize>,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default)]
    pub unbreakable: bool,
}

impl From<&Group> for GroupState {
    fn from(group: &Group) -> Self {
        Self {
            name: group.name().to_string(),
            members: group.members_sorted(),
            static_indexes: group.static_indexes().iter().copied().collect(),
            collapsed: group.is_collapsed(),
            unbreakable: group.is_unbreakable(),
        }
    }
}

/// `<prefix>.rowGroupHeaderLayer`
pub fn namespace(prefix: &str) -> String {
    format!("{prefix}.{STATE_NAMESPACE}")
}

fn group_key(prefix: &str, n: usize) -> String {
    format!("{}.{n}", namespace(prefix))
}

/// Ordinal of a group entry key under `prefix`, `None` for any other key
fn group_ordinal(prefix: &str, key: &str) -> Option<usize> {
    key.strip_prefix(&namespace(prefix))?
        .strip_prefix('.')?
        .parse()
        .ok()
}

impl GroupModel {
    /// Snapshot of every group, in model order
    pub fn group_states(&self) -> Vec<GroupState> {
        self.groups().iter().map(GroupState::from).collect()
    }

    /// Write all groups under `prefix`, replacing entries a previous save left
    pub fn save_state(&self, prefix: &str, properties: &mut Properties) -> Result<(), GroupError> {
        properties.retain(|key, _| group_ordinal(prefix, key).is_none());

        for (n, state) in self.group_states().iter().enumerate() {
            let key = group_key(prefix, n);
            let value = serde_json::to_string(state).map_err(|e| GroupError::InvalidState {
                key: key.clone(),
                message: e.to_string(),
            })?;
            properties.insert(key, value);
        }
        Ok(())
    }

    /// Replace all groups with the ones stored under `prefix`.
    ///
    /// Nothing changes when any entry fails to decode or the stored groups
    /// overlap.
    pub fn load_state(&mut self, prefix: &str, properties: &Properties) -> Result<(), GroupError> {
        let mut entries: Vec<(usize, &String, &String)> = properties
            .iter()
            .filter_map(|(key, value)| group_ordinal(prefix, key).map(|n| (n, key, value)))
            .collect();
        entries.sort_by_key(|(n, _, _)| *n);

        let mut states = Vec::with_capacity(entries.len());
        for (_, key, value) in entries {
            let state: GroupState =
                serde_json::from_str(value).map_err(|e| GroupError::InvalidState {
                    key: key.clone(),
                    message: e.to_string(),
                })?;
            if state.members.is_empty() {
                return Err(GroupError::InvalidState {
                    key: key.clone(),
                    message: "group has no members".to_string(),
                });
            }
            states.push(state);
        }

        self.restore_states(&states)
    }

    /// Replace all groups with `states`. All-or-nothing.
    pub fn restore_states(&mut self, states: &[GroupState]) -> Result<(), GroupError> {
        let mut restored = self.emptied();
        for state in states {
            let id = restored.add_group_with_members(state.name.clone(), &state.members)?;
            restored.add_static_indexes(id, &state.static_indexes)?;
            if state.collapsed {
                restored.collapse(id)?;
            }
            restored.set_group_unbreakable(id, state.unbreakable)?;
        }
        *self = restored;
        Ok(())
    }
}
