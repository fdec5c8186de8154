//! Consensus selection — adaptive threshold and best-group scoring.
//!
//! The acceptance bar for consensus adapts to how similar the responses
//! are overall: when agents already largely agree the bar tightens toward
//! the observed agreement, when they diverge it relaxes toward the base
//! threshold. Selection degrades gracefully — a weak best group is
//! reported with its score rather than raised as an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FusionError, FusionResult};
use crate::group::GroupedResponses;
use crate::similarity::{Embedding, SimilarityProvider};

/// Sentinel text returned when no responses were available to fuse.
pub const NO_CONSENSUS: &str = "No consensus could be determined.";

/// Outcome of a consensus selection.
///
/// `similarity_score` is always in [0, 1]; `group_size == 0` iff the
/// sentinel path was taken (empty response set — a valid, degenerate
/// query outcome, not an error).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    /// Text of the winning group's representative.
    pub best_text: String,
    /// Internal agreement score of the winning group.
    pub similarity_score: f64,
    /// Number of responses in the winning group.
    pub group_size: usize,
}

impl ConsensusResult {
    fn sentinel() -> Self {
        Self {
            best_text: NO_CONSENSUS.to_string(),
            similarity_score: 0.0,
            group_size: 0,
        }
    }
}

/// Adapt the consensus acceptance bar to overall response agreement.
///
/// Computes `base_threshold + adjustment_factor * (global_similarity -
/// base_threshold)`, clamped to [0, 1]. Factors above 1.0 extrapolate
/// past the observed agreement and are accepted; the clamp bounds the
/// result either way.
///
/// `global_similarity` and `base_threshold` must lie in [0, 1] and
/// `adjustment_factor` must be ≥ 0, otherwise the call fails with
/// `InvalidArgument`.
pub fn dynamic_threshold(
    global_similarity: f64,
    base_threshold: f64,
    adjustment_factor: f64,
) -> FusionResult<f64> {
    if !(0.0..=1.0).contains(&global_similarity) {
        return Err(FusionError::InvalidArgument(format!(
            "global_similarity must be in [0, 1], got {global_similarity}"
        )));
    }
    if !(0.0..=1.0).contains(&base_threshold) {
        return Err(FusionError::InvalidArgument(format!(
            "base_threshold must be in [0, 1], got {base_threshold}"
        )));
    }
    if adjustment_factor < 0.0 {
        return Err(FusionError::InvalidArgument(format!(
            "adjustment_factor must be >= 0, got {adjustment_factor}"
        )));
    }

    let adjusted = base_threshold + adjustment_factor * (global_similarity - base_threshold);
    Ok(adjusted.clamp(0.0, 1.0))
}

/// Mean pairwise similarity across all response embeddings.
///
/// Fewer than two responses score 1.0: with nothing to disagree, the
/// adaptive bar interpolates toward its ceiling.
pub fn global_similarity(embeddings: &[Embedding], provider: &dyn SimilarityProvider) -> f64 {
    if embeddings.len() < 2 {
        return 1.0;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..embeddings.len() {
        for j in (i + 1)..embeddings.len() {
            total += provider.similarity(&embeddings[i], &embeddings[j]);
            pairs += 1;
        }
    }
    total / pairs as f64
}

/// Picks the best paraphrase group and reports agreement and size.
pub struct ConsensusSelector<'a> {
    provider: &'a dyn SimilarityProvider,
}

impl<'a> ConsensusSelector<'a> {
    pub fn new(provider: &'a dyn SimilarityProvider) -> Self {
        Self { provider }
    }

    /// Internal agreement of one group: mean pairwise similarity among
    /// its members. A singleton group scores 0.0 — a lone response
    /// carries no independent corroboration.
    fn agreement_score(&self, grouped: &GroupedResponses, group_idx: usize) -> f64 {
        let indices = &grouped.groups[group_idx].indices;
        if indices.len() < 2 {
            return 0.0;
        }

        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..indices.len() {
            for j in (i + 1)..indices.len() {
                total += self.provider.similarity(
                    &grouped.embeddings[indices[i]],
                    &grouped.embeddings[indices[j]],
                );
                pairs += 1;
            }
        }
        total / pairs as f64
    }

    /// Select the best group by the lexicographic `(group_size,
    /// agreement_score)` key — a larger independent agreement is
    /// stronger evidence than a tighter but smaller cluster.
    ///
    /// A best group scoring below `threshold` is still returned; the
    /// caller reads the score and decides how much to trust it.
    pub fn select(&self, grouped: &GroupedResponses, threshold: f64) -> ConsensusResult {
        if grouped.groups.is_empty() {
            return ConsensusResult::sentinel();
        }

        let mut best_idx = 0;
        let mut best_key = (grouped.groups[0].size(), self.agreement_score(grouped, 0));

        for idx in 1..grouped.groups.len() {
            let key = (grouped.groups[idx].size(), self.agreement_score(grouped, idx));
            // Strict comparison keeps the earliest group on exact ties.
            if key.0 > best_key.0 || (key.0 == best_key.0 && key.1 > best_key.1) {
                best_idx = idx;
                best_key = key;
            }
        }

        let (group_size, similarity_score) = best_key;
        let winner = &grouped.groups[best_idx];

        if similarity_score < threshold {
            warn!(
                similarity_score,
                threshold,
                group_size,
                "weak consensus: best group scored below the adaptive bar"
            );
        } else {
            debug!(similarity_score, threshold, group_size, "consensus selected");
        }

        ConsensusResult {
            best_text: winner.representative().text.clone(),
            similarity_score,
            group_size,
        }
    }
}
