use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Milestone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Part of the chain created when the timeline was first generated
    Original,
    /// Created by branching from an existing node
    Alternate,
}

/// A milestone placed in a tree.
///
/// `parent_id`, `child_ids` and `depth` are owned by [`crate::NodeStore`];
/// `expanded` and `selected` are presentation state only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineNode {
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    pub depth: usize,

    pub title: String,
    pub date: String,
    pub description: String,
    pub impact: String,
    #[serde(default)]
    pub key_figures: Vec<String>,

    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub created_at: DateTime<Utc>,
    /// Scenario text that spawned this alternate chain (first node only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub selected: bool,
}

impl TimelineNode {
    pub(crate) fn from_milestone(
        id: String,
        parent_id: Option<String>,
        depth: usize,
        milestone: Milestone,
        node_type: NodeType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            parent_id,
            child_ids: Vec::new(),
            depth,
            title: milestone.title,
            date: milestone.date,
            description: milestone.description,
            impact: milestone.impact,
            key_figures: milestone.key_figures,
            node_type,
            created_at,
            scenario: None,
            expanded: true,
            selected: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.child_ids.is_empty()
    }

    pub fn headline(&self) -> String {
        format!("{}: {}", self.date, self.title)
    }
}
