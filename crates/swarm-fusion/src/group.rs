//! Paraphrase grouping.
//!
//! Partitions a response set into groups of near-duplicate responses
//! using greedy single-linkage clustering over a similarity threshold.
//! Grouping is deterministic given identical embeddings and ordering.

use tracing::debug;

use crate::agent::Response;
use crate::similarity::{Embedding, SimilarityProvider};

/// A cluster of responses judged semantically equivalent under the
/// grouping threshold.
///
/// Invariant: every member's similarity to the group representative is
/// ≥ the threshold used to form the group; groups partition the full
/// response set.
#[derive(Debug, Clone)]
pub struct ParaphraseGroup {
    /// Member responses in arrival order. The first member seeded the
    /// group and serves as its representative.
    pub members: Vec<Response>,
    /// Positions of the members in the original response sequence.
    pub indices: Vec<usize>,
}

impl ParaphraseGroup {
    fn seed(response: Response, index: usize) -> Self {
        Self {
            members: vec![response],
            indices: vec![index],
        }
    }

    /// The response that seeded this group.
    pub fn representative(&self) -> &Response {
        &self.members[0]
    }

    /// Number of member responses.
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Output of one grouping pass: the partition plus the per-response
/// embeddings (arrival order) so downstream scoring reuses them instead
/// of re-embedding.
#[derive(Debug, Clone)]
pub struct GroupedResponses {
    pub groups: Vec<ParaphraseGroup>,
    pub embeddings: Vec<Embedding>,
}

impl GroupedResponses {
    /// Total number of responses across all groups.
    pub fn response_count(&self) -> usize {
        self.groups.iter().map(ParaphraseGroup::size).sum()
    }
}

/// Greedy single-linkage grouper.
///
/// Iterates responses in arrival order and assigns each to the first
/// existing group whose representative scores ≥ the threshold, else
/// starts a new group. O(n·m) in responses × groups, which is fine at
/// agent-count scale.
pub struct ParaphraseGrouper<'a> {
    provider: &'a dyn SimilarityProvider,
    threshold: f64,
}

impl<'a> ParaphraseGrouper<'a> {
    /// Create a grouper over the given provider and grouping threshold.
    pub fn new(provider: &'a dyn SimilarityProvider, threshold: f64) -> Self {
        Self {
            provider,
            threshold,
        }
    }

    /// Partition responses into paraphrase groups.
    ///
    /// Empty input yields an empty partition.
    pub fn group(&self, responses: &[Response]) -> GroupedResponses {
        let embeddings: Vec<Embedding> = responses
            .iter()
            .map(|r| self.provider.embed(&r.text))
            .collect();

        let mut groups: Vec<ParaphraseGroup> = Vec::new();

        for (idx, response) in responses.iter().enumerate() {
            let assigned = groups.iter_mut().find(|group| {
                let rep_idx = group.indices[0];
                self.provider
                    .similarity(&embeddings[rep_idx], &embeddings[idx])
                    >= self.threshold
            });

            match assigned {
                Some(group) => {
                    debug!(
                        agent_id = %response.agent_id,
                        representative = %group.representative().agent_id,
                        "joined paraphrase group"
                    );
                    group.members.push(response.clone());
                    group.indices.push(idx);
                }
                None => {
                    debug!(agent_id = %response.agent_id, "seeded new paraphrase group");
                    groups.push(ParaphraseGroup::seed(response.clone(), idx));
                }
            }
        }

        GroupedResponses { groups, embeddings }
    }
}
