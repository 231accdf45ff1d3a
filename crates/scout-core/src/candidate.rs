//! Candidate records as held by the candidate store.
//!
//! A [`CandidateRecord`] is a [`CandidateProfile`] (display text and
//! filterable attributes) plus the dense embedding produced at onboarding.
//! Records are replaced whole, never patched: the profile text and the
//! embedding derived from it always travel together.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display and filterable attributes of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    /// Stable unique identifier.
    pub id: Uuid,

    /// Full display name.
    pub full_name: String,

    /// Current or target job title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_title: Option<String>,

    /// Generated profile summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Location used for equality filtering.
    #[serde(default)]
    pub location: String,

    /// Total years of professional experience.
    #[serde(default)]
    pub years_experience: u32,

    /// Skill set.
    #[serde(default)]
    pub skills: BTreeSet<String>,

    /// Spoken languages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,

    /// Education summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
}

impl CandidateProfile {
    /// Create a profile with the required identity fields.
    pub fn new(id: Uuid, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            professional_title: None,
            summary: None,
            location: String::new(),
            years_experience: 0,
            skills: BTreeSet::new(),
            languages: Vec::new(),
            education: None,
        }
    }

    /// Set the professional title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.professional_title = Some(title.into());
        self
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set years of experience.
    pub fn with_experience(mut self, years: u32) -> Self {
        self.years_experience = years;
        self
    }

    /// Add a skill.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    /// Add a spoken language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.languages.push(language.into());
        self
    }

    /// Set the education summary.
    pub fn with_education(mut self, education: impl Into<String>) -> Self {
        self.education = Some(education.into());
        self
    }
}

/// A stored candidate: profile plus embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Display and filterable attributes.
    #[serde(flatten)]
    pub profile: CandidateProfile,

    /// Dense embedding; `None` until the ingestion workflow has produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CandidateRecord {
    /// Create a record with an embedding.
    pub fn new(profile: CandidateProfile, embedding: Vec<f32>) -> Self {
        Self {
            profile,
            embedding: Some(embedding),
        }
    }

    /// Create a record whose embedding has not been generated yet.
    pub fn pending(profile: CandidateProfile) -> Self {
        Self {
            profile,
            embedding: None,
        }
    }

    /// The record identifier.
    pub fn id(&self) -> Uuid {
        self.profile.id
    }

    /// Whether the record can take part in vector retrieval at `dimension`.
    pub fn is_retrievable(&self, dimension: usize) -> bool {
        self.embedding
            .as_ref()
            .is_some_and(|e| e.len() == dimension && e.iter().all(|v| v.is_finite()))
    }
}
