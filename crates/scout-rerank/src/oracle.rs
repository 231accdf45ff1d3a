//! Reranking oracle abstraction and candidate text composition.

use async_trait::async_trait;
use scout_core::{CandidateProfile, Dependency, Error, Result};

/// Precision scorer for a small candidate pool.
///
/// Given a query and N candidate texts, an oracle returns exactly N scores in
/// input order. Scores are only comparable within one invocation.
#[async_trait]
pub trait RerankOracle: Send + Sync {
    /// Score every candidate text against the query.
    async fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>>;

    /// The oracle name for diagnostics.
    fn name(&self) -> &str;
}

/// Check an oracle response against the request it answers.
///
/// A response of the wrong length or with a non-finite score is treated as a
/// failed dependency.
pub fn validate_scores(scores: Vec<f32>, expected: usize) -> Result<Vec<f32>> {
    if scores.len() != expected {
        return Err(Error::dependency(
            Dependency::Reranker,
            format!("returned {} scores for {expected} candidates", scores.len()),
        ));
    }
    if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
        return Err(Error::dependency(
            Dependency::Reranker,
            format!("non-finite score at position {pos}"),
        ));
    }
    Ok(scores)
}

/// Compose the text the reranker reads for one candidate.
///
/// Title, experience and location are always present; the remaining parts
/// are dropped when empty. Parts are joined with `". "`.
pub fn candidate_text(profile: &CandidateProfile) -> String {
    let title = profile
        .professional_title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("Unknown");
    let location = if profile.location.trim().is_empty() {
        "Unknown"
    } else {
        profile.location.as_str()
    };

    let mut parts = vec![
        format!("Title: {title}"),
        format!("Experience: {} years", profile.years_experience),
        format!("Location: {location}"),
    ];

    let mut optional = |label: &str, value: String| {
        if !value.trim().is_empty() {
            parts.push(format!("{label}: {value}"));
        }
    };
    optional("Languages", profile.languages.join(", "));
    optional("Education", profile.education.clone().unwrap_or_default());
    optional(
        "Skills",
        profile.skills.iter().cloned().collect::<Vec<_>>().join(", "),
    );
    optional("Summary", profile.summary.clone().unwrap_or_default());

    parts.join(". ")
}
