//! Routing strategy — pick exactly one agent, query only it.
//!
//! The decision comes either from a direct policy (a fixed target id) or
//! from a main bot queried with a routing-decision prompt. A decision
//! naming an unknown id fails with `RoutingTargetNotFound` — surfacing
//! the inconsistency is preferable to silently guessing, so no fallback
//! bot is ever queried.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agent::{AgentId, AgentPort};
use crate::error::{FusionError, FusionResult};

/// Agent id used when reporting a failure of the routing decision-maker
/// itself, which is configured separately from the candidate bots.
const MAIN_BOT_ID: &str = "main_bot";

/// Longest reply prefix quoted back in a `RoutingTargetNotFound` when the
/// decision text matched no known id.
const UNMATCHED_REPLY_PREVIEW: usize = 120;

/// How the routing target is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// Route to a fixed agent id without consulting the main bot.
    Direct(AgentId),
    /// Query the main bot with a routing-decision prompt and parse its
    /// reply for one of the candidate ids.
    Delegated,
}

/// Outcome of one routing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Which agent was chosen.
    pub selected_agent_id: AgentId,
    /// The chosen agent's response, verbatim.
    pub response_text: String,
}

/// Build the routing-decision prompt listing every candidate id.
pub fn decision_prompt(query: &str, bots: &[(AgentId, Arc<dyn AgentPort>)]) -> String {
    let mut prompt = String::new();
    prompt.push_str("Choose exactly one agent to answer the query below.\n\nAvailable agents:\n");
    for (id, _) in bots {
        prompt.push_str("- ");
        prompt.push_str(id);
        prompt.push('\n');
    }
    prompt.push_str("\nQuery:\n");
    prompt.push_str(query);
    prompt.push_str("\n\nReply with the id of the single best agent, and nothing else.\n");
    prompt
}

/// Scan a decision reply for a known bot id.
///
/// Ids are matched as whole words (an id is never matched inside a longer
/// id-like token), longest id first so overlapping names resolve to the
/// most specific candidate.
fn select_target(reply: &str, bots: &[(AgentId, Arc<dyn AgentPort>)]) -> Option<AgentId> {
    let mut ids: Vec<&AgentId> = bots.iter().map(|(id, _)| id).collect();
    ids.sort_by_key(|id| std::cmp::Reverse(id.len()));

    for id in ids {
        let pattern = format!(r"(?i)(^|[^\w-]){}([^\w-]|$)", regex::escape(id));
        // Pattern is built from an escaped literal; compilation cannot fail.
        if Regex::new(&pattern).map(|re| re.is_match(reply)).unwrap_or(false) {
            return Some(id.clone());
        }
    }
    None
}

/// Resolve the routing target and query only it.
pub async fn route(
    query: &str,
    policy: &RoutingPolicy,
    bots: &[(AgentId, Arc<dyn AgentPort>)],
    main_bot: Option<&dyn AgentPort>,
) -> FusionResult<RoutingDecision> {
    let selected = match policy {
        RoutingPolicy::Direct(id) => id.clone(),
        RoutingPolicy::Delegated => {
            let main_bot = main_bot.ok_or_else(|| {
                FusionError::InvalidArgument(
                    "delegated routing requires a main bot".to_string(),
                )
            })?;

            let reply = main_bot
                .ask(&decision_prompt(query, bots))
                .await
                .map_err(|e| FusionError::AgentFailure {
                    agent_id: MAIN_BOT_ID.to_string(),
                    reason: e.to_string(),
                })?;
            debug!(reply = %reply.trim(), "routing decision received");

            match select_target(&reply, bots) {
                Some(id) => id,
                None => {
                    let preview: String = reply.trim().chars().take(UNMATCHED_REPLY_PREVIEW).collect();
                    return Err(FusionError::RoutingTargetNotFound(preview));
                }
            }
        }
    };

    let target = bots
        .iter()
        .find(|(id, _)| *id == selected)
        .map(|(_, port)| Arc::clone(port))
        .ok_or_else(|| FusionError::RoutingTargetNotFound(selected.clone()))?;

    info!(agent_id = %selected, "routing query to selected agent");

    let response_text = target
        .ask(query)
        .await
        .map_err(|e| FusionError::AgentFailure {
            agent_id: selected.clone(),
            reason: e.to_string(),
        })?;

    Ok(RoutingDecision {
        selected_agent_id: selected,
        response_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stub agent that counts how often it was asked.
    struct CountingAgent {
        reply: String,
        calls: AtomicUsize,
    }

    impl CountingAgent {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AgentPort for CountingAgent {
        async fn ask(&self, _query: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    fn bots(
        entries: &[(&str, &Arc<CountingAgent>)],
    ) -> Vec<(AgentId, Arc<dyn AgentPort>)> {
        entries
            .iter()
            .map(|(id, agent)| {
                (
                    id.to_string(),
                    Arc::clone(*agent) as Arc<dyn AgentPort>,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_direct_policy_queries_only_the_target() {
        let a = CountingAgent::new("from a");
        let b = CountingAgent::new("from b");
        let bots = bots(&[("bot-a", &a), ("bot-b", &b)]);

        let decision = route(
            "q",
            &RoutingPolicy::Direct("bot-b".to_string()),
            &bots,
            None,
        )
        .await
        .unwrap();

        assert_eq!(decision.selected_agent_id, "bot-b");
        assert_eq!(decision.response_text, "from b");
        assert_eq!(a.call_count(), 0);
        assert_eq!(b.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_direct_target_queries_nothing() {
        let a = CountingAgent::new("from a");
        let bots = bots(&[("bot-a", &a)]);

        let err = route(
            "q",
            &RoutingPolicy::Direct("bot-z".to_string()),
            &bots,
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, FusionError::RoutingTargetNotFound(id) if id == "bot-z"));
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delegated_routing_parses_verbose_reply() {
        let a = CountingAgent::new("from a");
        let b = CountingAgent::new("from b");
        let bots = bots(&[("bot-a", &a), ("bot-b", &b)]);
        let main = CountingAgent::new("I would pick bot-b for this query.");

        let decision = route("q", &RoutingPolicy::Delegated, &bots, Some(main.as_ref()))
            .await
            .unwrap();

        assert_eq!(decision.selected_agent_id, "bot-b");
        assert_eq!(a.call_count(), 0);
        assert_eq!(b.call_count(), 1);
        assert_eq!(main.call_count(), 1);
    }

    #[tokio::test]
    async fn test_delegated_unknown_id_queries_no_candidate() {
        let a = CountingAgent::new("from a");
        let bots = bots(&[("bot-a", &a)]);
        let main = CountingAgent::new("bot-z");

        let err = route("q", &RoutingPolicy::Delegated, &bots, Some(main.as_ref()))
            .await
            .unwrap_err();

        assert!(matches!(err, FusionError::RoutingTargetNotFound(_)));
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn test_delegated_without_main_bot_fails_fast() {
        let a = CountingAgent::new("from a");
        let bots = bots(&[("bot-a", &a)]);

        let err = route("q", &RoutingPolicy::Delegated, &bots, None)
            .await
            .unwrap_err();

        assert!(matches!(err, FusionError::InvalidArgument(_)));
        assert_eq!(a.call_count(), 0);
    }

    #[test]
    fn test_overlapping_ids_resolve_to_most_specific() {
        let short = CountingAgent::new("");
        let long = CountingAgent::new("");
        let bots = bots(&[("bot", &short), ("bot-advanced", &long)]);

        assert_eq!(
            select_target("use bot-advanced here", &bots),
            Some("bot-advanced".to_string())
        );
        assert_eq!(select_target("just bot please", &bots), Some("bot".to_string()));
        assert_eq!(select_target("nothing matches", &bots), None);
    }

    #[test]
    fn test_decision_prompt_lists_all_candidates() {
        let a = CountingAgent::new("");
        let b = CountingAgent::new("");
        let bots = bots(&[("bot-a", &a), ("bot-b", &b)]);

        let prompt = decision_prompt("which db?", &bots);
        assert!(prompt.contains("- bot-a"));
        assert!(prompt.contains("- bot-b"));
        assert!(prompt.contains("which db?"));
    }
}
