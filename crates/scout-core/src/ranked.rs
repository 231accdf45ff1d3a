//! Ranked result sets produced by the two-stage pipeline.
//!
//! Ordering is a total order: stage-2 score descending, then stage-1 score
//! descending, then candidate id ascending. Scores are compared with
//! `f32::total_cmp`, and only finite scores are admitted.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::candidate::CandidateProfile;

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// Display profile of the candidate.
    pub profile: CandidateProfile,

    /// Vector similarity from stage-1 retrieval.
    pub stage1_score: f32,

    /// Relevance from the reranking oracle.
    pub stage2_score: f32,
}

impl RankedCandidate {
    /// Create a ranked candidate.
    pub fn new(profile: CandidateProfile, stage1_score: f32, stage2_score: f32) -> Self {
        Self {
            profile,
            stage1_score,
            stage2_score,
        }
    }

    /// The candidate identifier.
    pub fn id(&self) -> Uuid {
        self.profile.id
    }
}

/// Total order used for every ranked result set.
pub fn rank_order(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.stage2_score
        .total_cmp(&a.stage2_score)
        .then_with(|| b.stage1_score.total_cmp(&a.stage1_score))
        .then_with(|| a.profile.id.cmp(&b.profile.id))
}

/// An ordered list of at most `top_k` candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedResultSet {
    /// Items in rank order.
    pub items: Vec<RankedCandidate>,
}

impl RankedResultSet {
    /// An empty result set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sort scored candidates into rank order and keep the first `top_k`.
    pub fn from_scored(mut items: Vec<RankedCandidate>, top_k: usize) -> Self {
        items.sort_by(rank_order);
        items.truncate(top_k);
        Self { items }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Identifiers in rank order.
    pub fn ids(&self) -> Vec<Uuid> {
        self.items.iter().map(RankedCandidate::id).collect()
    }

    /// Whether the items respect [`rank_order`] and hold finite scores.
    pub fn is_well_ordered(&self) -> bool {
        self.items
            .iter()
            .all(|c| c.stage1_score.is_finite() && c.stage2_score.is_finite())
            && self
                .items
                .windows(2)
                .all(|w| rank_order(&w[0], &w[1]) != Ordering::Greater)
    }
}
