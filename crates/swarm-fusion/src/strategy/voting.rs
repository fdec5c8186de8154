//! Voting strategy — near-duplicate tally with stable tie-breaking.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::agent::Response;
use crate::group::ParaphraseGrouper;
use crate::similarity::SimilarityProvider;

/// Outcome of a voting round.
///
/// Carries the full response list so callers can audit how the tally was
/// formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotingResult {
    /// Representative text of the winning group.
    pub winner_text: String,
    /// Number of responses in the winning group.
    pub vote_count: usize,
    /// Every collected response, in agent order.
    pub all_responses: Vec<Response>,
}

/// Tally identical or near-duplicate responses; the group with the most
/// members wins.
///
/// Tie-break: the first group reaching the maximum size in arrival order
/// — stable and deterministic irrespective of completion timing.
pub struct VotingStrategy<'a> {
    grouper: ParaphraseGrouper<'a>,
}

impl<'a> VotingStrategy<'a> {
    pub fn new(provider: &'a dyn SimilarityProvider, grouping_threshold: f64) -> Self {
        Self {
            grouper: ParaphraseGrouper::new(provider, grouping_threshold),
        }
    }

    /// Run the tally. An empty response set yields an empty winner with
    /// zero votes rather than an error — the floor check belongs to the
    /// dispatch layer.
    pub fn vote(&self, responses: &[Response]) -> VotingResult {
        if responses.is_empty() {
            warn!("voting over an empty response set");
            return VotingResult {
                winner_text: String::new(),
                vote_count: 0,
                all_responses: Vec::new(),
            };
        }

        let grouped = self.grouper.group(responses);

        let mut winner_idx = 0;
        let mut max_size = grouped.groups[0].size();
        for (idx, group) in grouped.groups.iter().enumerate().skip(1) {
            // Strict comparison keeps the earliest group on ties.
            if group.size() > max_size {
                winner_idx = idx;
                max_size = group.size();
            }
        }

        let winner = &grouped.groups[winner_idx];
        debug!(
            vote_count = winner.size(),
            candidates = grouped.groups.len(),
            "vote tallied"
        );

        VotingResult {
            winner_text: winner.representative().text.clone(),
            vote_count: winner.size(),
            all_responses: responses.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::HashedBagOfWords;

    fn responses(texts: &[&str]) -> Vec<Response> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Response::new(format!("agent-{i}"), *t))
            .collect()
    }

    #[test]
    fn test_majority_of_identical_responses_wins() {
        let provider = HashedBagOfWords::new();
        let strategy = VotingStrategy::new(&provider, 0.99);
        let result = strategy.vote(&responses(&[
            "use a binary heap",
            "use a binary heap",
            "sort the list",
            "use a binary heap",
            "hash everything",
        ]));

        assert_eq!(result.winner_text, "use a binary heap");
        assert_eq!(result.vote_count, 3);
        assert_eq!(result.all_responses.len(), 5);
    }

    #[test]
    fn test_tie_goes_to_first_group_in_arrival_order() {
        let provider = HashedBagOfWords::new();
        let strategy = VotingStrategy::new(&provider, 0.99);
        let result = strategy.vote(&responses(&["red", "blue", "red", "blue"]));

        assert_eq!(result.winner_text, "red");
        assert_eq!(result.vote_count, 2);
    }

    #[test]
    fn test_empty_input_yields_empty_winner() {
        let provider = HashedBagOfWords::new();
        let strategy = VotingStrategy::new(&provider, 0.8);
        let result = strategy.vote(&[]);

        assert!(result.winner_text.is_empty());
        assert_eq!(result.vote_count, 0);
        assert!(result.all_responses.is_empty());
    }

    #[test]
    fn test_all_responses_preserve_agent_order() {
        let provider = HashedBagOfWords::new();
        let strategy = VotingStrategy::new(&provider, 0.99);
        let input = responses(&["one", "two", "three"]);
        let result = strategy.vote(&input);

        assert_eq!(result.all_responses, input);
    }
}
