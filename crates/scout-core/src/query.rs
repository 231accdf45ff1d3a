//! Search queries, filters and their normalized form.
//!
//! The normalized form is what the cache key is derived from, so the rules
//! here decide which requests share a cache entry:
//!
//! - text is trimmed, internal whitespace runs collapse to one space, and the
//!   result is lower-cased;
//! - `location` gets the same treatment as text;
//! - `skills` are trimmed, lower-cased, de-duplicated and sorted;
//! - `top_k` is clamped into `1..=max_top_k`.
//!
//! Filters are a typed struct with a fixed field order, so the order in which
//! a client listed them never reaches the fingerprint.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::candidate::CandidateProfile;
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;

/// Filter keys accepted in an untyped filter map.
pub const FILTER_KEYS: [&str; 3] = ["location", "min_experience", "skills"];

/// Collapse whitespace and lower-case a free-text value.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ============================================================================
// Filters
// ============================================================================

/// Structured filters applied exactly during stage-1 retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Location equality (case- and whitespace-insensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Minimum years of experience (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_experience: Option<u32>,

    /// Skills the candidate must all have.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub skills: BTreeSet<String>,
}

impl SearchFilters {
    /// Create an empty filter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Require a minimum experience.
    pub fn with_min_experience(mut self, years: u32) -> Self {
        self.min_experience = Some(years);
        self
    }

    /// Require a skill.
    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.skills.insert(skill.into());
        self
    }

    /// Whether no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.min_experience.is_none() && self.skills.is_empty()
    }

    /// Parse filters from an untyped JSON object.
    ///
    /// `null` values count as absent. Unknown keys and mistyped values are
    /// rejected with [`Error::InvalidFilter`].
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self> {
        let mut filters = Self::default();
        for (key, value) in map {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "location" => {
                    let location = value.as_str().ok_or_else(|| {
                        Error::invalid_filter(format!("'location' must be a string, got {value}"))
                    })?;
                    filters.location = Some(location.to_string());
                }
                "min_experience" => {
                    filters.min_experience = Some(parse_experience(value)?);
                }
                "skills" => match value {
                    Value::String(skill) => {
                        filters.skills.insert(skill.clone());
                    }
                    Value::Array(items) => {
                        for item in items {
                            let skill = item.as_str().ok_or_else(|| {
                                Error::invalid_filter(format!(
                                    "'skills' entries must be strings, got {item}"
                                ))
                            })?;
                            filters.skills.insert(skill.to_string());
                        }
                    }
                    other => {
                        return Err(Error::invalid_filter(format!(
                            "'skills' must be a string or array of strings, got {other}"
                        )));
                    }
                },
                other => {
                    return Err(Error::invalid_filter(format!(
                        "unknown filter '{other}' (expected one of: {})",
                        FILTER_KEYS.join(", ")
                    )));
                }
            }
        }
        Ok(filters)
    }

    /// Merge another filter set into this one.
    ///
    /// Fails when both sides set the same scalar predicate to different
    /// values. Skills are unioned.
    pub fn merge(mut self, other: SearchFilters) -> Result<Self> {
        if let Some(location) = other.location {
            match &self.location {
                Some(existing) if normalize_text(existing) != normalize_text(&location) => {
                    return Err(Error::invalid_filter(format!(
                        "conflicting location filters '{existing}' and '{location}'"
                    )));
                }
                _ => self.location = Some(location),
            }
        }
        if let Some(years) = other.min_experience {
            match self.min_experience {
                Some(existing) if existing != years => {
                    return Err(Error::invalid_filter(format!(
                        "conflicting min_experience filters {existing} and {years}"
                    )));
                }
                _ => self.min_experience = Some(years),
            }
        }
        self.skills.extend(other.skills);
        Ok(self)
    }

    /// Return the canonical form of these filters.
    pub fn normalized(&self) -> Result<Self> {
        let location = match &self.location {
            Some(raw) => {
                let location = normalize_text(raw);
                if location.is_empty() {
                    return Err(Error::invalid_filter("'location' must not be empty"));
                }
                Some(location)
            }
            None => None,
        };

        let mut skills = BTreeSet::new();
        for raw in &self.skills {
            let skill = normalize_text(raw);
            if skill.is_empty() {
                return Err(Error::invalid_filter("'skills' entries must not be empty"));
            }
            skills.insert(skill);
        }

        Ok(Self {
            location,
            min_experience: self.min_experience,
            skills,
        })
    }

    /// Whether a candidate satisfies every predicate.
    ///
    /// Expects `self` to be normalized.
    pub fn matches(&self, profile: &CandidateProfile) -> bool {
        if let Some(location) = &self.location {
            if normalize_text(&profile.location) != *location {
                return false;
            }
        }
        if let Some(min) = self.min_experience {
            if profile.years_experience < min {
                return false;
            }
        }
        if !self.skills.is_empty() {
            let have: BTreeSet<String> = profile.skills.iter().map(|s| normalize_text(s)).collect();
            if !self.skills.iter().all(|s| have.contains(s)) {
                return false;
            }
        }
        true
    }
}

fn parse_experience(value: &Value) -> Result<u32> {
    let invalid = || {
        Error::invalid_filter(format!(
            "'min_experience' must be a non-negative integer, got {value}"
        ))
    };
    let years = value.as_u64().ok_or_else(invalid)?;
    u32::try_from(years).map_err(|_| invalid())
}

// ============================================================================
// Limits
// ============================================================================

/// Bounds applied to the requested result count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLimits {
    /// Result count used when the caller does not ask for one.
    pub default_top_k: usize,

    /// Largest result count a caller may receive.
    pub max_top_k: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 50,
        }
    }
}

impl QueryLimits {
    /// Clamp a requested top_k into `1..=max_top_k`.
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        let max = self.max_top_k.max(1);
        requested.unwrap_or(self.default_top_k).clamp(1, max)
    }
}

// ============================================================================
// Normalized query
// ============================================================================

/// A validated, canonical search query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedQuery {
    /// Canonical query text.
    pub text: String,

    /// Canonical filters.
    pub filters: SearchFilters,

    /// Clamped result count.
    pub top_k: usize,
}

impl NormalizedQuery {
    /// Validate and normalize a raw query.
    pub fn new(
        raw_text: &str,
        filters: &SearchFilters,
        top_k: Option<usize>,
        limits: &QueryLimits,
    ) -> Result<Self> {
        let text = normalize_text(raw_text);
        if text.is_empty() {
            return Err(Error::invalid_query("query text must not be empty"));
        }
        Ok(Self {
            text,
            filters: filters.normalized()?,
            top_k: limits.clamp(top_k),
        })
    }

    /// The cache fingerprint of this query.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use uuid::Uuid;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    // ------------------------------------------------------------------------
    // Text normalization
    // ------------------------------------------------------------------------

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Senior   Backend\tEngineer \n"), "senior backend engineer");
        assert_eq!(normalize_text("ÜBER Dev"), "über dev");
        assert_eq!(normalize_text("   "), "");
    }

    // ------------------------------------------------------------------------
    // Filter parsing
    // ------------------------------------------------------------------------

    #[test]
    fn test_from_json_map() {
        let filters = SearchFilters::from_json_map(&map(json!({
            "location": "Berlin",
            "min_experience": 5,
            "skills": ["Rust", "Postgres"]
        })))
        .unwrap();

        assert_eq!(filters.location.as_deref(), Some("Berlin"));
        assert_eq!(filters.min_experience, Some(5));
        assert_eq!(filters.skills.len(), 2);
    }

    #[test]
    fn test_from_json_map_null_is_absent() {
        let filters =
            SearchFilters::from_json_map(&map(json!({"location": null, "min_experience": null})))
                .unwrap();
        assert!(filters.is_empty());
    }

    #[test]
    fn test_from_json_map_single_skill_string() {
        let filters = SearchFilters::from_json_map(&map(json!({"skills": "go"}))).unwrap();
        assert!(filters.skills.contains("go"));
    }

    #[test]
    fn test_from_json_map_rejects_unknown_key() {
        let err = SearchFilters::from_json_map(&map(json!({"salary": 100}))).unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
        assert!(err.to_string().contains("salary"));
    }

    #[test]
    fn test_from_json_map_rejects_bad_types() {
        for bad in [
            json!({"location": 42}),
            json!({"min_experience": -1}),
            json!({"min_experience": 2.5}),
            json!({"min_experience": "5"}),
            json!({"skills": [1, 2]}),
            json!({"skills": {"a": 1}}),
        ] {
            let err = SearchFilters::from_json_map(&map(bad.clone())).unwrap_err();
            assert!(matches!(err, Error::InvalidFilter(_)), "accepted {bad}");
        }
    }

    #[test]
    fn test_merge_conflicts() {
        let a = SearchFilters::new().with_location("Berlin");
        let b = SearchFilters::new().with_location(" berlin ");
        assert!(a.clone().merge(b).is_ok());

        let c = SearchFilters::new().with_location("Paris");
        assert!(matches!(a.merge(c), Err(Error::InvalidFilter(_))));

        let d = SearchFilters::new().with_min_experience(3);
        let e = SearchFilters::new().with_min_experience(4);
        assert!(d.merge(e).is_err());
    }

    // ------------------------------------------------------------------------
    // Normalization and matching
    // ------------------------------------------------------------------------

    #[test]
    fn test_normalized_filters() {
        let filters = SearchFilters::new()
            .with_location("  New   York ")
            .with_skill(" Rust ")
            .with_skill("rust")
            .with_skill("SQL")
            .normalized()
            .unwrap();

        assert_eq!(filters.location.as_deref(), Some("new york"));
        assert_eq!(filters.skills.iter().collect::<Vec<_>>(), vec!["rust", "sql"]);
    }

    #[test]
    fn test_normalized_rejects_empty_location() {
        let err = SearchFilters::new().with_location("   ").normalized().unwrap_err();
        assert!(matches!(err, Error::InvalidFilter(_)));
    }

    #[test]
    fn test_matches() {
        let profile = CandidateProfile::new(Uuid::nil(), "A")
            .with_location("Berlin")
            .with_experience(6)
            .with_skill("Rust")
            .with_skill("Kafka");

        let ok = SearchFilters::new()
            .with_location("BERLIN")
            .with_min_experience(5)
            .with_skill("rust")
            .normalized()
            .unwrap();
        assert!(ok.matches(&profile));

        let too_senior = SearchFilters::new().with_min_experience(7);
        assert!(!too_senior.matches(&profile));

        let elsewhere = SearchFilters::new().with_location("paris");
        assert!(!elsewhere.matches(&profile));

        let missing_skill = SearchFilters::new().with_skill("go");
        assert!(!missing_skill.matches(&profile));

        assert!(SearchFilters::new().matches(&profile));
    }

    // ------------------------------------------------------------------------
    // Limits and queries
    // ------------------------------------------------------------------------

    #[test]
    fn test_limits_clamp() {
        let limits = QueryLimits {
            default_top_k: 5,
            max_top_k: 20,
        };
        assert_eq!(limits.clamp(None), 5);
        assert_eq!(limits.clamp(Some(0)), 1);
        assert_eq!(limits.clamp(Some(7)), 7);
        assert_eq!(limits.clamp(Some(500)), 20);
    }

    #[test]
    fn test_normalized_query_rejects_blank() {
        let err = NormalizedQuery::new(" \t ", &SearchFilters::new(), None, &QueryLimits::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)));
    }

    #[test]
    fn test_normalized_query_whitespace_and_case() {
        let limits = QueryLimits::default();
        let filters = SearchFilters::new();
        let a =
            NormalizedQuery::new("Senior backend engineer", &filters, Some(5), &limits).unwrap();
        let b = NormalizedQuery::new("  senior  BACKEND engineer ", &filters, Some(5), &limits)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_filter_key_order_does_not_matter() {
        let limits = QueryLimits::default();
        let first: Map<String, Value> =
            serde_json::from_str(r#"{"location": "Berlin", "min_experience": 5}"#).unwrap();
        let second: Map<String, Value> =
            serde_json::from_str(r#"{"min_experience": 5, "location": "Berlin"}"#).unwrap();

        let a = NormalizedQuery::new(
            "query",
            &SearchFilters::from_json_map(&first).unwrap(),
            None,
            &limits,
        )
        .unwrap();
        let b = NormalizedQuery::new(
            "query",
            &SearchFilters::from_json_map(&second).unwrap(),
            None,
            &limits,
        )
        .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    proptest! {
        #[test]
        fn prop_whitespace_padding_is_ignored(
            words in proptest::collection::vec("[a-zA-Z]{1,8}", 1..6),
            pad in "[ \t\n]{0,4}",
        ) {
            let limits = QueryLimits::default();
            let plain = words.join(" ");
            let padded = format!("{pad}{}{pad}", words.join(&format!(" {pad}")));
            let a = NormalizedQuery::new(&plain, &SearchFilters::new(), None, &limits).unwrap();
            let b = NormalizedQuery::new(&padded, &SearchFilters::new(), None, &limits).unwrap();
            prop_assert_eq!(a.fingerprint(), b.fingerprint());
        }

        #[test]
        fn prop_normalize_text_is_idempotent(raw in "[a-zA-Z0-9 \t\n]{0,40}") {
            let once = normalize_text(&raw);
            prop_assert_eq!(normalize_text(&once), once);
        }
    }
}
