use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};
use crate::models::Milestone;
use crate::ops;
use crate::store::NodeStore;

/// One saved exploration: a person and the tree grown from their life.
///
/// Mutations go through [`crate::TimelineManager`], which keeps
/// `milestone_count`, `last_accessed` and `version` in step with the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    id: String,
    person: String,
    nodes: NodeStore,
    #[serde(default)]
    current_path: Vec<String>,
    created_at: DateTime<Utc>,
    last_accessed: DateTime<Utc>,
    milestone_count: usize,
    #[serde(default)]
    version: u64,
}

impl Timeline {
    pub(crate) fn new(person: String, milestones: Vec<Milestone>, now: DateTime<Utc>) -> Result<Self> {
        let nodes = NodeStore::create_root(milestones, now)?;
        let current_path = vec![nodes.root_id().to_string()];
        let milestone_count = nodes.len();

        Ok(Self {
            id: ops::generate_id(),
            person,
            nodes,
            current_path,
            created_at: now,
            last_accessed: now,
            milestone_count,
            version: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn person(&self) -> &str {
        &self.person
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    /// Ids from the root to the most recently selected node
    pub fn current_path(&self) -> &[String] {
        &self.current_path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    pub fn milestone_count(&self) -> usize {
        self.milestone_count
    }

    /// Bumped on every structural change
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Case-insensitive, whitespace-insensitive person match
    pub fn is_for(&self, person: &str) -> bool {
        normalize_person(&self.person) == normalize_person(person)
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
    }

    pub(crate) fn add_branch(
        &mut self,
        parent_id: &str,
        milestones: Vec<Milestone>,
        scenario: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let new_ids = self.nodes.add_branch(parent_id, milestones, scenario, now)?;
        self.milestone_count = self.nodes.len();
        self.last_accessed = now;
        self.version += 1;
        Ok(new_ids)
    }

    pub(crate) fn delete_subtree(&mut self, node_id: &str) -> Result<Vec<String>> {
        let removed = self.nodes.delete_subtree(node_id)?;
        if let Some(cut) = self.current_path.iter().position(|id| removed.contains(id)) {
            self.current_path.truncate(cut);
        }
        self.milestone_count = self.nodes.len();
        self.version += 1;
        Ok(removed)
    }

    pub(crate) fn select(&mut self, node_id: &str) -> bool {
        if !self.nodes.select(node_id) {
            return false;
        }
        self.current_path = ops::path_to_root(&self.nodes, node_id)
            .into_iter()
            .map(|node| node.id.clone())
            .collect();
        true
    }

    pub(crate) fn set_expanded(&mut self, node_id: &str, expanded: bool) -> bool {
        self.nodes.set_expanded(node_id, expanded)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.nodes.validate()?;
        if self.milestone_count != self.nodes.len() {
            return Err(TreeError::Corrupt(format!(
                "timeline {} caches {} milestones but holds {}",
                self.id,
                self.milestone_count,
                self.nodes.len()
            )));
        }

        if let Some(last) = self.current_path.last() {
            let chain: Vec<&str> = ops::path_to_root(&self.nodes, last)
                .into_iter()
                .map(|node| node.id.as_str())
                .collect();
            if chain != self.current_path {
                return Err(TreeError::Corrupt(format!(
                    "timeline {} current path does not lead from the root to {}",
                    self.id, last
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn normalize_person(person: &str) -> String {
    person.trim().to_lowercase()
}
