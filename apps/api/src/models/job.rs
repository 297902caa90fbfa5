use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DISTANCE_KM: u32 = 50;
pub const MIN_DISTANCE_KM: u32 = 5;
pub const MAX_DISTANCE_KM: u32 = 100;

/// Values a candidate typed into an apply form, keyed by field id.
pub type FieldValues = BTreeMap<String, String>;

/// A job posting as returned by the search collaborator.
///
/// `id` is the only key used for bookmark / applied / dismissed membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub url: String,
    #[serde(default = "default_source")]
    pub source: String,
    pub posted_at: Option<String>,
    /// 0.0 – 1.0, higher is a better match against the resume.
    pub similarity_score: Option<f64>,
    #[serde(default)]
    pub required_fields: Vec<String>,
}

fn default_source() -> String {
    "Adzuna".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmploymentType {
    #[default]
    Any,
    Fulltime,
    Parttime,
    Contract,
    #[serde(alias = "internship")]
    Intern,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFilters {
    pub keywords: Option<String>,
    pub location: Option<String>,
    pub distance_km: u32,
    pub employment_type: EmploymentType,
}

impl Default for JobFilters {
    fn default() -> Self {
        Self {
            keywords: None,
            location: None,
            distance_km: DEFAULT_DISTANCE_KM,
            employment_type: EmploymentType::Any,
        }
    }
}

/// A partial filter update. `None` means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFiltersPatch {
    pub keywords: Option<String>,
    pub location: Option<String>,
    pub distance_km: Option<u32>,
    pub employment_type: Option<EmploymentType>,
}

impl JobFilters {
    /// Shallow merge. Distance is clamped into the supported radius.
    pub fn merged(&self, patch: &JobFiltersPatch) -> JobFilters {
        JobFilters {
            keywords: patch.keywords.clone().or_else(|| self.keywords.clone()),
            location: patch.location.clone().or_else(|| self.location.clone()),
            distance_km: patch
                .distance_km
                .unwrap_or(self.distance_km)
                .clamp(MIN_DISTANCE_KM, MAX_DISTANCE_KM),
            employment_type: patch.employment_type.unwrap_or(self.employment_type),
        }
    }
}
