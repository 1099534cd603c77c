//! System prompts and user-message builders for the two generation kinds.

use whatif_tree::{context_window, BRANCH_CONTEXT_LEN};

use crate::request::{BranchRequest, PathEntry};

/// Used when a branch request does not name the person
pub const UNKNOWN_PERSON: &str = "this person";

pub const TIMELINE_SYSTEM_PROMPT: &str = r#"You are a careful historian. Produce exactly 10 defining milestones from the life of the named person.

Respond with raw JSON only, no markdown fences and no commentary, shaped like this:
{
  "person": "Full Name",
  "milestones": [
    {
      "date": "YYYY-MM-DD or YYYY",
      "title": "Short event title, at most 100 characters",
      "description": "Two or three sentences describing what happened",
      "impact": "One or two sentences on why it mattered",
      "keyFigures": ["Name", "Name"]
    }
  ]
}

Rules:
- Exactly 10 milestones spanning the whole life or career
- Earliest first
- Prefer full dates (YYYY-MM-DD); fall back to the year (YYYY)
- Only historically accurate events
- Output the JSON object and nothing else"#;

pub const BRANCH_SYSTEM_PROMPT: &str = r#"You write plausible alternate histories. You are given part of a person's real timeline, the milestone where history diverges, and the alternate scenario. Produce 5 to 7 milestones describing how their life unfolds from there.

Respond with raw JSON only, no markdown fences and no commentary, shaped like this:
{
  "milestones": [
    {
      "date": "YYYY-MM-DD or YYYY",
      "title": "Short event title, at most 100 characters",
      "description": "Two or three sentences",
      "impact": "One or two sentences on significance",
      "keyFigures": ["Name", "Name"]
    }
  ]
}

Rules:
- Between 5 and 7 milestones
- Earliest first
- Every event follows from the alternate scenario and its consequences
- Inventive but believable
- Output the JSON object and nothing else"#;

/// Everything a provider needs to ask for one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPrompt {
    pub person: String,
    /// Up to the last five path entries, oldest first, one per line
    pub context: String,
    pub branch_point: String,
    pub scenario: String,
}

impl BranchPrompt {
    /// `None` when the request carries no path
    pub fn from_request(request: &BranchRequest) -> Option<Self> {
        let branch_point = request.parent_timeline.last()?;
        let person = request
            .person
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(UNKNOWN_PERSON);

        Some(Self {
            person: person.to_string(),
            context: context_window(&request.parent_timeline, BRANCH_CONTEXT_LEN)
                .iter()
                .map(PathEntry::headline)
                .collect::<Vec<_>>()
                .join("\n"),
            branch_point: branch_point.headline(),
            scenario: request.alternate_scenario.trim().to_string(),
        })
    }

    pub fn user_message(&self) -> String {
        format!(
            "Person: {person}\n\n\
             Original timeline context (leading up to branch point):\n{context}\n\n\
             Branch point: {branch_point}\n\n\
             Alternate scenario: {scenario}\n\n\
             Generate 5-7 milestones showing how {person}'s life could have unfolded differently after this alternate scenario.",
            person = self.person,
            context = self.context,
            branch_point = self.branch_point,
            scenario = self.scenario,
        )
    }
}

pub fn timeline_user_message(person: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("Generate a timeline for: {}\n\nAdditional context: {}", person, context),
        None => format!("Generate a timeline for: {}", person),
    }
}
