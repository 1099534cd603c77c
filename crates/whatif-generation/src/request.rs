use serde::{Deserialize, Serialize};
use whatif_tree::{Milestone, TimelineNode};

/// Which kind of generation an operation is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    /// A whole new timeline for a person
    Timeline,
    /// One alternate branch from an existing node
    Branch,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeline => "timeline",
            Self::Branch => "branch",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRequest {
    pub person: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl TimelineRequest {
    pub fn new(person: impl Into<String>) -> Self {
        Self {
            person: person.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// The part of a path node that the branch prompt needs. Extra fields sent
/// by clients (full nodes) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathEntry {
    pub date: String,
    pub title: String,
}

impl PathEntry {
    pub fn headline(&self) -> String {
        format!("{}: {}", self.date, self.title)
    }
}

impl From<&TimelineNode> for PathEntry {
    fn from(node: &TimelineNode) -> Self {
        Self {
            date: node.date.clone(),
            title: node.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRequest {
    pub parent_node_id: String,
    /// Path from the root to the branch point, root first
    pub parent_timeline: Vec<PathEntry>,
    pub alternate_scenario: String,
    /// Depth of the branch point
    pub depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
}

impl BranchRequest {
    /// Build a request from a path as returned by `whatif_tree::path_to_root`
    pub fn from_path(path: &[&TimelineNode], scenario: impl Into<String>) -> Option<Self> {
        let branch_point = path.last()?;
        Some(Self {
            parent_node_id: branch_point.id.clone(),
            parent_timeline: path.iter().map(|node| PathEntry::from(*node)).collect(),
            alternate_scenario: scenario.into(),
            depth: branch_point.depth,
            person: None,
        })
    }

    pub fn with_person(mut self, person: impl Into<String>) -> Self {
        self.person = Some(person.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub person: String,
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchResponse {
    pub milestones: Vec<Milestone>,
}

/// A validated generation result and whether it came from the cache
#[derive(Debug, Clone, Serialize)]
pub struct Generated<T> {
    pub data: T,
    pub cached: bool,
}
