use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TreeError};
use crate::models::{Milestone, TimelineNode};
use crate::ops;
use crate::timeline::{normalize_person, Timeline};

/// Saving past this many timelines evicts the oldest one.
pub const MAX_TIMELINES: usize = 20;

/// Everything the manager persists: the saved timelines and which one is
/// current.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerState {
    pub timelines: Vec<Timeline>,
    pub current_timeline_id: Option<String>,
}

impl ManagerState {
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::with_capacity(self.timelines.len());
        let mut people = HashSet::with_capacity(self.timelines.len());
        for timeline in &self.timelines {
            if !ids.insert(timeline.id()) {
                return Err(TreeError::Corrupt(format!("duplicate timeline {}", timeline.id())));
            }
            if !people.insert(normalize_person(timeline.person())) {
                return Err(TreeError::Corrupt(format!(
                    "more than one timeline for {}",
                    timeline.person()
                )));
            }
            timeline.validate()?;
        }

        if let Some(current) = &self.current_timeline_id {
            if !ids.contains(current.as_str()) {
                return Err(TreeError::Corrupt(format!("current timeline {} missing", current)));
            }
        }
        Ok(())
    }
}

/// Owns the saved timelines and the "current" selector.
///
/// Every operation has a form scoped to the current timeline and an `_in`
/// form that names the timeline explicitly.
pub struct TimelineManager {
    state: ManagerState,
    clock: Arc<dyn Clock>,
    max_timelines: usize,
}

impl std::fmt::Debug for TimelineManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineManager")
            .field("state", &self.state)
            .field("max_timelines", &self.max_timelines)
            .finish_non_exhaustive()
    }
}

impl TimelineManager {
    pub fn new() -> Self {
        Self {
            state: ManagerState::default(),
            clock: Arc::new(SystemClock),
            max_timelines: MAX_TIMELINES,
        }
    }

    /// Restore from persisted state, rejecting anything that breaks a tree
    /// invariant.
    pub fn from_state(state: ManagerState) -> Result<Self> {
        state.validate()?;
        Ok(Self {
            state,
            ..Self::new()
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Restored state over the new limit is evicted oldest-first right away.
    pub fn with_max_timelines(mut self, max: usize) -> Self {
        self.max_timelines = max.max(1);
        self.evict_overflow();
        self
    }

    pub fn state(&self) -> &ManagerState {
        &self.state
    }

    pub fn into_state(self) -> ManagerState {
        self.state
    }

    // ============ MULTI-TIMELINE LIFECYCLE ============

    /// Save a freshly generated timeline and make it current.
    ///
    /// If a timeline for `person` already exists (case-insensitive) it is
    /// switched to instead and its content is left alone.
    pub fn save(&mut self, person: &str, milestones: Vec<Milestone>) -> Result<String> {
        let now = self.clock.now();

        if let Some(existing) = self.state.timelines.iter_mut().find(|t| t.is_for(person)) {
            existing.touch(now);
            let id = existing.id().to_string();
            tracing::info!(timeline_id = %id, person = %person, "Timeline already saved, switching");
            self.state.current_timeline_id = Some(id.clone());
            return Ok(id);
        }

        let timeline = Timeline::new(person.trim().to_string(), milestones, now)?;
        let id = timeline.id().to_string();
        tracing::info!(
            timeline_id = %id,
            person = %timeline.person(),
            milestones = timeline.milestone_count(),
            "Timeline saved"
        );

        self.state.timelines.push(timeline);
        self.state.current_timeline_id = Some(id.clone());
        self.evict_overflow();

        Ok(id)
    }

    /// Make `timeline_id` current and refresh its `last_accessed`.
    pub fn switch_to(&mut self, timeline_id: &str) -> Result<&Timeline> {
        let now = self.clock.now();
        let index = self.index_of(timeline_id)?;

        self.state.timelines[index].touch(now);
        self.state.current_timeline_id = Some(timeline_id.to_string());
        Ok(&self.state.timelines[index])
    }

    /// Delete a timeline. If it was current, the most recently accessed
    /// remaining timeline becomes current.
    pub fn remove(&mut self, timeline_id: &str) -> Result<Timeline> {
        let index = self.index_of(timeline_id)?;
        let removed = self.state.timelines.remove(index);

        if self.state.current_timeline_id.as_deref() == Some(timeline_id) {
            self.state.current_timeline_id = self.most_recently_accessed();
        }
        tracing::info!(timeline_id = %timeline_id, "Timeline removed");
        Ok(removed)
    }

    /// Saved timelines, most recently accessed first
    pub fn list(&self) -> Vec<&Timeline> {
        let mut timelines: Vec<&Timeline> = self.state.timelines.iter().collect();
        timelines.sort_by(|a, b| {
            b.last_accessed()
                .cmp(&a.last_accessed())
                .then_with(|| a.id().cmp(b.id()))
        });
        timelines
    }

    pub fn len(&self) -> usize {
        self.state.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.timelines.is_empty()
    }

    pub fn get(&self, timeline_id: &str) -> Option<&Timeline> {
        self.state.timelines.iter().find(|t| t.id() == timeline_id)
    }

    pub fn current_id(&self) -> Option<&str> {
        self.state.current_timeline_id.as_deref()
    }

    pub fn current(&self) -> Option<&Timeline> {
        self.current_id().and_then(|id| self.get(id))
    }

    pub fn current_person(&self) -> Option<&str> {
        self.current().map(Timeline::person)
    }

    // ============ TREE MUTATIONS ============

    /// Add a generated branch under `parent_id` in the current timeline.
    pub fn branch(
        &mut self,
        parent_id: &str,
        milestones: Vec<Milestone>,
        scenario: &str,
    ) -> Result<Vec<String>> {
        let timeline_id = self.require_current()?;
        self.branch_in(&timeline_id, parent_id, milestones, scenario)
    }

    pub fn branch_in(
        &mut self,
        timeline_id: &str,
        parent_id: &str,
        milestones: Vec<Milestone>,
        scenario: &str,
    ) -> Result<Vec<String>> {
        let now = self.clock.now();
        let timeline = self.timeline_mut(timeline_id)?;

        let new_ids = timeline
            .add_branch(parent_id, milestones, Some(scenario), now)
            .map_err(|e| log_rejection(timeline_id, e))?;

        tracing::info!(
            timeline_id = %timeline_id,
            parent_id = %parent_id,
            nodes = new_ids.len(),
            "Branch added"
        );
        Ok(new_ids)
    }

    /// Like [`Self::branch_in`], but refuses to apply the branch if the
    /// timeline changed since the caller read `expected_version`.
    pub fn branch_in_checked(
        &mut self,
        timeline_id: &str,
        expected_version: u64,
        parent_id: &str,
        milestones: Vec<Milestone>,
        scenario: &str,
    ) -> Result<Vec<String>> {
        let actual = self.timeline_mut(timeline_id)?.version();
        if actual != expected_version {
            tracing::warn!(timeline_id = %timeline_id, expected_version, actual, "Rejected stale branch");
            return Err(TreeError::StaleVersion {
                timeline_id: timeline_id.to_string(),
                expected: expected_version,
                actual,
            });
        }
        self.branch_in(timeline_id, parent_id, milestones, scenario)
    }

    /// Delete a node and its descendants from the current timeline
    pub fn delete_node(&mut self, node_id: &str) -> Result<Vec<String>> {
        let timeline_id = self.require_current()?;
        self.delete_node_in(&timeline_id, node_id)
    }

    pub fn delete_node_in(&mut self, timeline_id: &str, node_id: &str) -> Result<Vec<String>> {
        let timeline = self.timeline_mut(timeline_id)?;
        let removed = timeline
            .delete_subtree(node_id)
            .map_err(|e| log_rejection(timeline_id, e))?;

        tracing::info!(timeline_id = %timeline_id, node_id = %node_id, removed = removed.len(), "Subtree deleted");
        Ok(removed)
    }

    /// Returns false if there is no current timeline or no such node
    pub fn select_node(&mut self, node_id: &str) -> bool {
        match self.require_current() {
            Ok(timeline_id) => self.select_node_in(&timeline_id, node_id).is_ok(),
            Err(_) => false,
        }
    }

    pub fn select_node_in(&mut self, timeline_id: &str, node_id: &str) -> Result<()> {
        let timeline = self.timeline_mut(timeline_id)?;
        if timeline.select(node_id) {
            Ok(())
        } else {
            Err(log_rejection(timeline_id, TreeError::NodeNotFound(node_id.to_string())))
        }
    }

    pub fn expand_node(&mut self, node_id: &str) -> bool {
        self.set_expanded_current(node_id, true)
    }

    pub fn collapse_node(&mut self, node_id: &str) -> bool {
        self.set_expanded_current(node_id, false)
    }

    pub fn set_expanded_in(&mut self, timeline_id: &str, node_id: &str, expanded: bool) -> Result<()> {
        let timeline = self.timeline_mut(timeline_id)?;
        if timeline.set_expanded(node_id, expanded) {
            Ok(())
        } else {
            Err(log_rejection(timeline_id, TreeError::NodeNotFound(node_id.to_string())))
        }
    }

    // ============ CURRENT-TIMELINE QUERIES ============

    pub fn current_node_path(&self, node_id: &str) -> Vec<&TimelineNode> {
        self.current()
            .map(|t| ops::path_to_root(t.nodes(), node_id))
            .unwrap_or_default()
    }

    pub fn current_leaves(&self) -> Vec<&TimelineNode> {
        self.current().map(|t| ops::leaves(t.nodes())).unwrap_or_default()
    }

    pub fn current_depth(&self) -> usize {
        self.current().map(|t| ops::max_depth(t.nodes())).unwrap_or(0)
    }

    pub fn current_node_by_id(&self, node_id: &str) -> Option<&TimelineNode> {
        self.current().and_then(|t| t.nodes().get(node_id))
    }

    // ============ INTERNALS ============

    fn set_expanded_current(&mut self, node_id: &str, expanded: bool) -> bool {
        match self.require_current() {
            Ok(timeline_id) => self.set_expanded_in(&timeline_id, node_id, expanded).is_ok(),
            Err(_) => false,
        }
    }

    fn require_current(&self) -> Result<String> {
        match self.current() {
            Some(timeline) => Ok(timeline.id().to_string()),
            None => {
                tracing::warn!("No current timeline");
                Err(TreeError::NoActiveTimeline)
            }
        }
    }

    fn index_of(&self, timeline_id: &str) -> Result<usize> {
        self.state
            .timelines
            .iter()
            .position(|t| t.id() == timeline_id)
            .ok_or_else(|| {
                tracing::warn!(timeline_id = %timeline_id, "Timeline not found");
                TreeError::TimelineNotFound(timeline_id.to_string())
            })
    }

    fn timeline_mut(&mut self, timeline_id: &str) -> Result<&mut Timeline> {
        let index = self.index_of(timeline_id)?;
        Ok(&mut self.state.timelines[index])
    }

    fn most_recently_accessed(&self) -> Option<String> {
        self.list().first().map(|t| t.id().to_string())
    }

    fn evict_overflow(&mut self) {
        while self.state.timelines.len() > self.max_timelines {
            let oldest = self
                .state
                .timelines
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.created_at()
                        .cmp(&b.created_at())
                        .then_with(|| a.id().cmp(b.id()))
                })
                .map(|(index, _)| index);

            let Some(index) = oldest else { break };
            let evicted = self.state.timelines.remove(index);
            tracing::info!(timeline_id = %evicted.id(), person = %evicted.person(), "Evicted oldest timeline");

            if self.state.current_timeline_id.as_deref() == Some(evicted.id()) {
                self.state.current_timeline_id = self.most_recently_accessed();
            }
        }
    }
}

impl Default for TimelineManager {
    fn default() -> Self {
        Self::new()
    }
}

fn log_rejection(timeline_id: &str, error: TreeError) -> TreeError {
    if error.is_not_found() {
        tracing::warn!(timeline_id = %timeline_id, %error, "Operation skipped");
    } else {
        tracing::info!(timeline_id = %timeline_id, %error, "Operation rejected");
    }
    error
}
