use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{Result, TreeError};
use crate::models::{Milestone, NodeType, TimelineNode};
use crate::ops;

/// A node cannot receive children once it sits at this depth.
pub const MAX_BRANCH_DEPTH: usize = 10;

/// One timeline's tree, kept normalized: nodes by id, ids in creation order,
/// and the root id.
///
/// Every mutation checks its preconditions before touching anything, so a
/// failed call leaves the store exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStore {
    by_id: HashMap<String, TimelineNode>,
    all_ids: Vec<String>,
    root_id: String,
}

impl NodeStore {
    /// Build the original chain: milestone 0 is the root and every following
    /// milestone is the only child of the one before it.
    pub fn create_root(milestones: Vec<Milestone>, created_at: DateTime<Utc>) -> Result<Self> {
        if milestones.is_empty() {
            return Err(TreeError::EmptyMilestones);
        }

        let mut by_id: HashMap<String, TimelineNode> = HashMap::with_capacity(milestones.len());
        let mut all_ids: Vec<String> = Vec::with_capacity(milestones.len());

        for (depth, milestone) in milestones.into_iter().enumerate() {
            let id = ops::generate_id();
            let parent_id = all_ids.last().cloned();

            if let Some(parent) = parent_id.as_ref().and_then(|p| by_id.get_mut(p)) {
                parent.child_ids.push(id.clone());
            }

            let node = TimelineNode::from_milestone(
                id.clone(),
                parent_id,
                depth,
                milestone,
                NodeType::Original,
                created_at,
            );
            by_id.insert(id.clone(), node);
            all_ids.push(id);
        }

        let root_id = all_ids[0].clone();
        Ok(Self {
            by_id,
            all_ids,
            root_id,
        })
    }

    /// Hang a new alternate chain under `parent_id`.
    ///
    /// Returns the ids of the new nodes, first (the direct child of the
    /// parent) to last.
    pub fn add_branch(
        &mut self,
        parent_id: &str,
        milestones: Vec<Milestone>,
        scenario: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let parent_depth = self
            .by_id
            .get(parent_id)
            .map(|parent| parent.depth)
            .ok_or_else(|| TreeError::NodeNotFound(parent_id.to_string()))?;

        if parent_depth >= MAX_BRANCH_DEPTH {
            return Err(TreeError::DepthLimitExceeded {
                depth: parent_depth,
                max: MAX_BRANCH_DEPTH,
            });
        }
        if milestones.is_empty() {
            return Err(TreeError::EmptyMilestones);
        }

        let mut new_ids: Vec<String> = Vec::with_capacity(milestones.len());
        for (offset, milestone) in milestones.into_iter().enumerate() {
            let id = ops::generate_id();
            let node_parent = new_ids
                .last()
                .cloned()
                .unwrap_or_else(|| parent_id.to_string());

            let mut node = TimelineNode::from_milestone(
                id.clone(),
                Some(node_parent.clone()),
                parent_depth + offset + 1,
                milestone,
                NodeType::Alternate,
                created_at,
            );
            if offset == 0 {
                node.scenario = scenario.map(str::to_string);
            }

            if let Some(parent) = self.by_id.get_mut(&node_parent) {
                parent.child_ids.push(id.clone());
            }
            self.by_id.insert(id.clone(), node);
            self.all_ids.push(id.clone());
            new_ids.push(id);
        }

        Ok(new_ids)
    }

    /// Remove `node_id` and everything below it.
    ///
    /// Returns the removed ids in breadth-first order, starting with `node_id`.
    pub fn delete_subtree(&mut self, node_id: &str) -> Result<Vec<String>> {
        let parent_id = match self.by_id.get(node_id) {
            None => return Err(TreeError::NodeNotFound(node_id.to_string())),
            Some(node) => match &node.parent_id {
                None => return Err(TreeError::CannotDeleteRoot(node_id.to_string())),
                Some(parent_id) => parent_id.clone(),
            },
        };

        let removed = ops::subtree_ids(self, node_id);
        let doomed: HashSet<&str> = removed.iter().map(String::as_str).collect();

        if let Some(parent) = self.by_id.get_mut(&parent_id) {
            parent.child_ids.retain(|child| child != node_id);
        }
        for id in &removed {
            self.by_id.remove(id);
        }
        self.all_ids.retain(|id| !doomed.contains(id.as_str()));

        Ok(removed)
    }

    /// Make `node_id` the only selected node. Returns false if it is absent.
    pub fn select(&mut self, node_id: &str) -> bool {
        if !self.by_id.contains_key(node_id) {
            return false;
        }
        for node in self.by_id.values_mut() {
            node.selected = node.id == node_id;
        }
        true
    }

    /// Returns false if `node_id` is absent.
    pub fn set_expanded(&mut self, node_id: &str, expanded: bool) -> bool {
        match self.by_id.get_mut(node_id) {
            Some(node) => {
                node.expanded = expanded;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, node_id: &str) -> Option<&TimelineNode> {
        self.by_id.get(node_id)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.by_id.contains_key(node_id)
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> Option<&TimelineNode> {
        self.by_id.get(&self.root_id)
    }

    /// Node ids in creation order
    pub fn ids(&self) -> &[String] {
        &self.all_ids
    }

    /// Nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &TimelineNode> {
        self.all_ids.iter().filter_map(|id| self.by_id.get(id))
    }

    pub fn selected(&self) -> Option<&TimelineNode> {
        self.nodes().find(|node| node.selected)
    }

    pub fn len(&self) -> usize {
        self.all_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_ids.is_empty()
    }

    /// Check every structural invariant. Used on anything loaded from outside.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| Err(TreeError::Corrupt(msg));

        if self.all_ids.len() != self.by_id.len() {
            return corrupt(format!(
                "id list has {} entries but map has {}",
                self.all_ids.len(),
                self.by_id.len()
            ));
        }

        let mut seen = HashSet::with_capacity(self.all_ids.len());
        for id in &self.all_ids {
            if !seen.insert(id.as_str()) {
                return corrupt(format!("duplicate id {}", id));
            }
            if !self.by_id.contains_key(id) {
                return corrupt(format!("id {} listed but missing from map", id));
            }
        }

        let root = match self.by_id.get(&self.root_id) {
            Some(root) => root,
            None => return corrupt(format!("root {} missing", self.root_id)),
        };
        if !root.is_root() || root.depth != 0 {
            return corrupt(format!("root {} has a parent or nonzero depth", root.id));
        }

        for (key, node) in &self.by_id {
            if key != &node.id {
                return corrupt(format!("node {} stored under key {}", node.id, key));
            }

            match &node.parent_id {
                None if node.id != self.root_id => {
                    return corrupt(format!("second root {}", node.id));
                }
                None => {}
                Some(parent_id) => {
                    let parent = match self.by_id.get(parent_id) {
                        Some(parent) => parent,
                        None => return corrupt(format!("{} has dangling parent {}", node.id, parent_id)),
                    };
                    if node.depth != parent.depth + 1 {
                        return corrupt(format!("{} has depth {} under parent depth {}", node.id, node.depth, parent.depth));
                    }
                    if parent.child_ids.iter().filter(|c| *c == &node.id).count() != 1 {
                        return corrupt(format!("{} not listed exactly once by its parent", node.id));
                    }
                }
            }

            for child_id in &node.child_ids {
                match self.by_id.get(child_id) {
                    Some(child) if child.parent_id.as_deref() == Some(node.id.as_str()) => {}
                    _ => return corrupt(format!("{} lists {} which does not point back", node.id, child_id)),
                }
            }
        }

        let reachable = ops::subtree_ids(self, &self.root_id).len();
        if reachable != self.by_id.len() {
            return corrupt(format!("{} of {} nodes reachable from root", reachable, self.by_id.len()));
        }

        Ok(())
    }
}
