//! Application form fields: labels, placeholders, validation and resume pre-fill.

use std::collections::HashSet;

use serde::Serialize;

use crate::models::job::{FieldValues, JobPosting};
use crate::models::resume::ResumeProfile;

pub const COVER_LETTER: &str = "cover_letter";
pub const PORTFOLIO_LINK: &str = "portfolio_link";
pub const SALARY_EXPECTATION: &str = "salary_expectation";
pub const AVAILABILITY: &str = "availability";

const DEFAULT_AVAILABILITY: &str = "Available in 30 days";

/// Human label for a field id. Unknown ids are shown as-is.
pub fn field_label(field: &str) -> &str {
    match field {
        COVER_LETTER => "Cover Letter",
        PORTFOLIO_LINK => "Portfolio Link",
        SALARY_EXPECTATION => "Salary Expectation",
        AVAILABILITY => "Availability / Notice Period",
        other => other,
    }
}

pub fn field_placeholder(field: &str) -> &'static str {
    match field {
        COVER_LETTER => "Paste or draft a short cover letter...",
        PORTFOLIO_LINK => "https://portfolio.example.com",
        SALARY_EXPECTATION => "e.g., ₹18 LPA",
        AVAILABILITY => "e.g., 30 days notice",
        _ => "",
    }
}

/// A single input the apply form should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPrompt {
    pub id: String,
    pub label: String,
    pub placeholder: String,
    pub value: Option<String>,
}

pub fn field_prompts(required: &[String], values: &FieldValues) -> Vec<FieldPrompt> {
    required
        .iter()
        .map(|id| FieldPrompt {
            id: id.clone(),
            label: field_label(id).to_string(),
            placeholder: field_placeholder(id).to_string(),
            value: values.get(id).cloned(),
        })
        .collect()
}

/// Required fields with no non-blank value, in declaration order, without repeats.
pub fn missing_fields(required: &[String], provided: &FieldValues) -> Vec<String> {
    let mut seen = HashSet::new();
    required
        .iter()
        .filter(|field| seen.insert(field.as_str()))
        .filter(|field| {
            provided
                .get(field.as_str())
                .map_or(true, |value| value.trim().is_empty())
        })
        .cloned()
        .collect()
}

/// Union of every job's required fields, in first-seen order.
pub fn union_required(jobs: &[JobPosting]) -> Vec<String> {
    let mut seen = HashSet::new();
    jobs.iter()
        .flat_map(|job| job.required_fields.iter())
        .filter(|field| seen.insert(field.as_str()))
        .cloned()
        .collect()
}

/// Pre-fill for a single-job form.
pub fn prefill_single(required: &[String], profile: Option<&ResumeProfile>) -> FieldValues {
    let mut values = FieldValues::new();
    let Some(profile) = profile else {
        return values;
    };
    for field in required {
        match field.as_str() {
            PORTFOLIO_LINK => {
                if let Some(url) = non_blank(profile.portfolio_url.as_deref()) {
                    values.insert(field.clone(), url.to_string());
                }
            }
            AVAILABILITY if non_blank(profile.summary.as_deref()).is_some() => {
                values.insert(field.clone(), DEFAULT_AVAILABILITY.to_string());
            }
            _ => {}
        }
    }
    values
}

/// Pre-fill for the shared apply-all form. Only the portfolio link is carried over.
pub fn prefill_batch(required: &[String], profile: Option<&ResumeProfile>) -> FieldValues {
    let mut values = FieldValues::new();
    let portfolio = profile.and_then(|p| non_blank(p.portfolio_url.as_deref()));
    if let Some(url) = portfolio {
        if required.iter().any(|f| f == PORTFOLIO_LINK) {
            values.insert(PORTFOLIO_LINK.to_string(), url.to_string());
        }
    }
    values
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
