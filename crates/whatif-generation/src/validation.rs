//! Decoding and checking raw generation output.
//!
//! Two distinct failure kinds come out of here: [`GenerationError::Parse`]
//! when the text is not JSON, and [`GenerationError::Validation`] when it is
//! JSON but breaks the milestone contract.

use serde::de::DeserializeOwned;
use std::ops::RangeInclusive;
use whatif_tree::{Milestone, MAX_BRANCH_DEPTH};

use crate::error::{GenerationError, Result};
use crate::request::{BranchRequest, BranchResponse, TimelineRequest, TimelineResponse};

pub const TIMELINE_MILESTONES: usize = 10;
pub const BRANCH_MILESTONES: RangeInclusive<usize> = 5..=7;

const TITLE_LEN: RangeInclusive<usize> = 1..=200;
const DESCRIPTION_LEN: RangeInclusive<usize> = 1..=1000;
const IMPACT_LEN: RangeInclusive<usize> = 1..=500;
const PERSON_LEN: RangeInclusive<usize> = 2..=100;
const SCENARIO_LEN: RangeInclusive<usize> = 5..=500;

/// Remove a surrounding ``` fence (with or without a language tag)
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // drop the language tag line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

pub fn parse_timeline_response(raw: &str) -> Result<TimelineResponse> {
    let response: TimelineResponse = decode(raw)?;

    let mut problems = Vec::new();
    if response.milestones.len() != TIMELINE_MILESTONES {
        problems.push(format!(
            "expected exactly {} milestones, got {}",
            TIMELINE_MILESTONES,
            response.milestones.len()
        ));
    }
    check_milestones(&response.milestones, &mut problems);
    finish(response, problems)
}

pub fn parse_branch_response(raw: &str) -> Result<BranchResponse> {
    let response: BranchResponse = decode(raw)?;

    let mut problems = Vec::new();
    if !BRANCH_MILESTONES.contains(&response.milestones.len()) {
        problems.push(format!(
            "expected {}-{} milestones, got {}",
            BRANCH_MILESTONES.start(),
            BRANCH_MILESTONES.end(),
            response.milestones.len()
        ));
    }
    check_milestones(&response.milestones, &mut problems);
    finish(response, problems)
}

pub fn validate_timeline_request(request: &TimelineRequest) -> Result<()> {
    let mut problems = Vec::new();
    check_len("person", request.person.trim(), PERSON_LEN, &mut problems);
    finish((), problems)
}

/// Depths beyond the limit are malformed; a depth exactly at the limit is a
/// well-formed request that cannot be honoured.
pub fn validate_branch_request(request: &BranchRequest) -> Result<()> {
    let mut problems = Vec::new();
    if request.parent_node_id.trim().is_empty() {
        problems.push("parentNodeId must not be empty".to_string());
    }
    if request.parent_timeline.is_empty() {
        problems.push("parentTimeline must contain the branch point".to_string());
    }
    check_len("alternateScenario", request.alternate_scenario.trim(), SCENARIO_LEN, &mut problems);
    if request.depth > MAX_BRANCH_DEPTH {
        problems.push(format!("depth must be at most {}", MAX_BRANCH_DEPTH));
    }
    finish((), problems)?;

    if request.depth >= MAX_BRANCH_DEPTH {
        return Err(GenerationError::DepthLimit(MAX_BRANCH_DEPTH));
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let value: serde_json::Value =
        serde_json::from_str(strip_code_fence(raw)).map_err(|e| GenerationError::Parse(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| GenerationError::Validation(e.to_string()))
}

fn check_milestones(milestones: &[Milestone], problems: &mut Vec<String>) {
    for (index, milestone) in milestones.iter().enumerate() {
        if milestone.date.trim().is_empty() {
            problems.push(format!("milestones[{}].date must not be empty", index));
        }
        check_len(&format!("milestones[{}].title", index), &milestone.title, TITLE_LEN, problems);
        check_len(&format!("milestones[{}].description", index), &milestone.description, DESCRIPTION_LEN, problems);
        check_len(&format!("milestones[{}].impact", index), &milestone.impact, IMPACT_LEN, problems);
    }
}

fn check_len(field: &str, value: &str, allowed: RangeInclusive<usize>, problems: &mut Vec<String>) {
    let len = value.chars().count();
    if !allowed.contains(&len) {
        problems.push(format!(
            "{} must be {}-{} characters, got {}",
            field,
            allowed.start(),
            allowed.end(),
            len
        ));
    }
}

fn finish<T>(value: T, problems: Vec<String>) -> Result<T> {
    if problems.is_empty() {
        Ok(value)
    } else {
        Err(GenerationError::Validation(problems.join(", ")))
    }
}
