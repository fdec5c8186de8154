//! Aggregation strategy — delegate the merge to a designated agent.
//!
//! The engine's responsibility is solely to build a deterministic,
//! complete concatenation of all responses as aggregator input and to
//! return the aggregator's output unchanged. Aggregator failure is
//! terminal — there is no local synthesis fallback.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::{AgentPort, Response};
use crate::error::{FusionError, FusionResult};

/// Output of one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    /// The aggregator's merged answer, verbatim.
    pub merged_text: String,
}

/// Build the synthesis prompt embedding every response, non-truncated,
/// in agent order.
pub fn synthesis_prompt(query: &str, responses: &[Response]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are merging candidate answers from independent agents into a single response.\n\n",
    );
    prompt.push_str("Original query:\n");
    prompt.push_str(query);
    prompt.push_str("\n\nCandidate responses:\n");

    for (idx, response) in responses.iter().enumerate() {
        prompt.push_str(&format!(
            "\n--- response {} (agent: {}) ---\n{}\n",
            idx + 1,
            response.agent_id,
            response.text
        ));
    }

    prompt.push_str(
        "\nMerge the candidate responses into one complete answer. Preserve every \
         distinct point and resolve contradictions explicitly.\n",
    );
    prompt
}

/// Query the aggregator once with the full synthesis prompt and return
/// its output unchanged.
pub async fn aggregate(
    query: &str,
    responses: &[Response],
    aggregator: &dyn AgentPort,
) -> FusionResult<AggregationResult> {
    let prompt = synthesis_prompt(query, responses);
    debug!(
        responses = responses.len(),
        prompt_bytes = prompt.len(),
        "querying aggregator"
    );

    let merged_text = aggregator
        .ask(&prompt)
        .await
        .map_err(|e| FusionError::AggregatorFailure(e.to_string()))?;

    Ok(AggregationResult { merged_text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EchoAggregator;

    #[async_trait]
    impl AgentPort for EchoAggregator {
        async fn ask(&self, query: &str) -> anyhow::Result<String> {
            Ok(format!("merged:{}", query.len()))
        }
    }

    struct BrokenAggregator;

    #[async_trait]
    impl AgentPort for BrokenAggregator {
        async fn ask(&self, _query: &str) -> anyhow::Result<String> {
            anyhow::bail!("provider unavailable")
        }
    }

    fn responses() -> Vec<Response> {
        vec![
            Response::new("a", "answer one"),
            Response::new("b", "answer two"),
        ]
    }

    #[test]
    fn test_prompt_embeds_every_response_completely() {
        let prompt = synthesis_prompt("what is the answer?", &responses());

        assert!(prompt.contains("what is the answer?"));
        assert!(prompt.contains("answer one"));
        assert!(prompt.contains("answer two"));
        assert!(prompt.contains("--- response 1 (agent: a) ---"));
        assert!(prompt.contains("--- response 2 (agent: b) ---"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = synthesis_prompt("q", &responses());
        let b = synthesis_prompt("q", &responses());
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_aggregate_returns_output_unchanged() {
        let result = aggregate("q", &responses(), &EchoAggregator).await.unwrap();
        assert!(result.merged_text.starts_with("merged:"));
    }

    #[tokio::test]
    async fn test_aggregator_failure_is_terminal() {
        let err = aggregate("q", &responses(), &BrokenAggregator)
            .await
            .unwrap_err();
        assert!(matches!(err, FusionError::AggregatorFailure(_)));
        assert!(err.to_string().contains("provider unavailable"));
    }
}
