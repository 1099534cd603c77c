use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// One generated life event, before it is placed in a tree.
///
/// Milestones only ever come out of the generation gateway after schema
/// validation, so the store can trust the field lengths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// Either a 4-digit year or an ISO date
    pub date: String,
    pub title: String,
    pub description: String,
    pub impact: String,
    #[serde(default)]
    pub key_figures: Vec<String>,
}

impl Milestone {
    pub fn new(
        date: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        impact: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            title: title.into(),
            description: description.into(),
            impact: impact.into(),
            key_figures: Vec::new(),
        }
    }

    pub fn with_key_figures(mut self, figures: Vec<String>) -> Self {
        self.key_figures = figures;
        self
    }

    /// `"date: title"`, the form used when summarizing a path for generation
    pub fn headline(&self) -> String {
        format!("{}: {}", self.date, self.title)
    }
}

/// Render a milestone date for display.
///
/// Year-only dates pass through, ISO dates become `"March 14, 1879"`, and
/// anything unparseable is returned as-is.
pub fn format_date(date: &str) -> String {
    let trimmed = date.trim();
    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return day.format("%B %-d, %Y").to_string();
    }

    if let Ok(moment) = DateTime::parse_from_rfc3339(trimmed) {
        return moment.date_naive().format("%B %-d, %Y").to_string();
    }

    date.to_string()
}
