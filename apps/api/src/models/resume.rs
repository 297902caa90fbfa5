use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Structured resume fields produced by the upstream resume parser.
/// Only the fields used to pre-fill application forms are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeProfile {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub location: Option<String>,
    pub portfolio_url: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResumeContext {
    pub raw_text: String,
    pub profile: ResumeProfile,
}

/// Session-scoped holder for the current resume. Read-only for the search and
/// apply workflows; replaced wholesale when the user uploads a new resume.
#[derive(Debug, Default)]
pub struct ResumeSlot {
    current: RwLock<Option<Arc<ResumeContext>>>,
}

impl ResumeSlot {
    pub fn set(&self, context: ResumeContext) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(context));
    }

    pub fn current(&self) -> Option<Arc<ResumeContext>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resume text, if one has been supplied and is not blank.
    pub fn text(&self) -> Option<String> {
        self.current()
            .map(|c| c.raw_text.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn profile(&self) -> Option<ResumeProfile> {
        self.current().map(|c| c.profile.clone())
    }
}
