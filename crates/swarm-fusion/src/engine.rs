//! Fusion engine — dispatch and strategy orchestration.
//!
//! One engine instance serves exactly one fusion call: `run` (and
//! `fuse_collected`) consume the engine, so there is no implicit state
//! carry-over between queries. The lifecycle is
//! `Idle → Dispatching → Fusing → Done`, with `Failed` reachable from
//! the two working states.
//!
//! Dispatch queries every configured agent concurrently and reassembles
//! the collected responses in agent-configuration order, so strategy
//! results are deterministic irrespective of network timing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agent::{AgentFault, AgentId, AgentPort, Response};
use crate::config::FusionConfig;
use crate::consensus::{dynamic_threshold, global_similarity, ConsensusResult, ConsensusSelector};
use crate::error::{FusionError, FusionResult};
use crate::group::ParaphraseGrouper;
use crate::similarity::{HashedBagOfWords, SimilarityProvider};
use crate::strategy::aggregation::{self, AggregationResult};
use crate::strategy::branching;
use crate::strategy::routing::{self, RoutingDecision, RoutingPolicy};
use crate::strategy::{Strategy, VotingResult, VotingStrategy};

/// Engine lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Strategy and agent set configured, not yet invoked.
    Idle,
    /// Query in flight to every configured agent.
    Dispatching,
    /// Selected strategy consuming the collected response set.
    Fusing,
    /// Result returned — terminal.
    Done,
    /// Terminal failure from dispatching or fusing.
    Failed,
}

impl EngineState {
    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Dispatching => write!(f, "dispatching"),
            Self::Fusing => write!(f, "fusing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Legal transitions between engine states.
///
/// ```text
/// Idle → Dispatching | Fusing   (Fusing directly for pre-collected input)
/// Dispatching → Fusing | Failed
/// Fusing → Done | Failed
/// ```
fn is_legal_transition(from: EngineState, to: EngineState) -> bool {
    use EngineState::*;

    matches!(
        (from, to),
        (Idle, Dispatching)
            | (Idle, Fusing)
            | (Dispatching, Fusing)
            | (Dispatching, Failed)
            | (Fusing, Done)
            | (Fusing, Failed)
    )
}

/// Typed per-strategy fusion result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FusionValue {
    Consensus(ConsensusResult),
    Voting(VotingResult),
    Branching { responses: Vec<String> },
    Aggregation(AggregationResult),
    Routing(RoutingDecision),
}

/// Outcome of one fusion call.
///
/// Created once per call and returned immediately; never mutated after
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionOutcome {
    /// Unique id of this fusion invocation.
    pub id: Uuid,
    /// The strategy-specific fused result.
    pub value: FusionValue,
    /// Per-agent failures collected during dispatch (below the floor).
    pub failures: Vec<AgentFault>,
    /// When fusion completed.
    pub completed_at: DateTime<Utc>,
}

/// Orchestrator for one fusion call.
///
/// Built with `with_*` methods, consumed by [`FusionEngine::run`] or
/// [`FusionEngine::fuse_collected`].
pub struct FusionEngine {
    config: FusionConfig,
    agents: Vec<(AgentId, Arc<dyn AgentPort>)>,
    similarity: Arc<dyn SimilarityProvider>,
    aggregator: Option<Arc<dyn AgentPort>>,
    main_bot: Option<Arc<dyn AgentPort>>,
    routing_policy: RoutingPolicy,
    cancel: CancellationToken,
    state: EngineState,
}

impl FusionEngine {
    /// Create an engine with the given configuration and the built-in
    /// similarity provider.
    pub fn new(config: FusionConfig) -> Self {
        Self {
            config,
            agents: Vec::new(),
            similarity: Arc::new(HashedBagOfWords::new()),
            aggregator: None,
            main_bot: None,
            routing_policy: RoutingPolicy::Delegated,
            cancel: CancellationToken::new(),
            state: EngineState::Idle,
        }
    }

    /// Register an agent. Configuration order is the order responses are
    /// handed to strategies.
    pub fn with_agent(mut self, id: impl Into<AgentId>, port: Arc<dyn AgentPort>) -> Self {
        self.agents.push((id.into(), port));
        self
    }

    /// Inject a similarity provider (replaces the built-in default).
    pub fn with_similarity(mut self, provider: Arc<dyn SimilarityProvider>) -> Self {
        self.similarity = provider;
        self
    }

    /// Designate the aggregator agent (required for the aggregation
    /// strategy).
    pub fn with_aggregator(mut self, port: Arc<dyn AgentPort>) -> Self {
        self.aggregator = Some(port);
        self
    }

    /// Designate the main bot consulted for delegated routing decisions.
    pub fn with_main_bot(mut self, port: Arc<dyn AgentPort>) -> Self {
        self.main_bot = Some(port);
        self
    }

    /// Set the routing policy (defaults to delegated).
    pub fn with_routing_policy(mut self, policy: RoutingPolicy) -> Self {
        self.routing_policy = policy;
        self
    }

    /// Attach a cancellation token. Cancelling it abandons in-flight
    /// agent calls best-effort and fails the call with `Cancelled`.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    fn transition(&mut self, to: EngineState) {
        debug_assert!(
            is_legal_transition(self.state, to),
            "illegal engine transition: {} -> {}",
            self.state,
            to
        );
        debug!(from = %self.state, to = %to, "engine state transition");
        self.state = to;
    }

    fn fail(&mut self, err: FusionError) -> FusionError {
        self.transition(EngineState::Failed);
        err
    }

    /// Precondition checks that run while still `Idle` — violations fail
    /// fast with `InvalidArgument` before anything is dispatched.
    fn check_preconditions(&self, live_dispatch: bool) -> FusionResult<()> {
        self.config.validate()?;

        if self.config.strategy == Strategy::Aggregation && self.aggregator.is_none() {
            return Err(FusionError::InvalidArgument(
                "aggregation strategy requires an aggregator agent".to_string(),
            ));
        }

        if live_dispatch {
            if self.agents.is_empty() {
                return Err(FusionError::InvalidArgument(
                    "no agents configured".to_string(),
                ));
            }
            if let Some(need) = self.config.min_responses {
                if need > self.agents.len() {
                    return Err(FusionError::InvalidArgument(format!(
                        "min_responses ({need}) exceeds configured agent count ({})",
                        self.agents.len()
                    )));
                }
            }
        } else if self.config.strategy == Strategy::Routing {
            return Err(FusionError::InvalidArgument(
                "routing requires live dispatch".to_string(),
            ));
        }

        Ok(())
    }

    /// Dispatch the query and fuse the collected responses.
    ///
    /// Consumes the engine: a fresh instance is required per query.
    pub async fn run(mut self, query: &str) -> FusionResult<FusionOutcome> {
        self.check_preconditions(true)?;

        let invocation_id = Uuid::new_v4();
        info!(
            %invocation_id,
            strategy = %self.config.strategy,
            agents = self.agents.len(),
            "fusion started"
        );

        // Routing never broadcasts: the decision picks one candidate and
        // only that candidate is queried.
        if self.config.strategy == Strategy::Routing {
            self.transition(EngineState::Dispatching);
            if self.cancel.is_cancelled() {
                return Err(self.fail(FusionError::Cancelled));
            }

            let policy = self.routing_policy.clone();
            let decision =
                match routing::route(query, &policy, &self.agents, self.main_bot.as_deref()).await
                {
                    Ok(decision) => decision,
                    Err(e) => return Err(self.fail(e)),
                };

            self.transition(EngineState::Fusing);
            self.transition(EngineState::Done);
            return Ok(FusionOutcome {
                id: invocation_id,
                value: FusionValue::Routing(decision),
                failures: Vec::new(),
                completed_at: Utc::now(),
            });
        }

        let (responses, failures) = self.dispatch(query).await?;

        let value = match self.fuse(query, &responses).await {
            Ok(value) => value,
            Err(e) => return Err(self.fail(e)),
        };

        self.transition(EngineState::Done);
        info!(%invocation_id, "fusion completed");

        Ok(FusionOutcome {
            id: invocation_id,
            value,
            failures,
            completed_at: Utc::now(),
        })
    }

    /// Fuse an already-collected response set with no live dispatch.
    ///
    /// Deterministic for a fixed input: the same strategy over the same
    /// responses yields the same value. Routing is not available here —
    /// it has no collected-response form. The minimum-responses floor
    /// applies to live dispatch only; an empty set is a valid degenerate
    /// input (consensus returns its sentinel).
    pub async fn fuse_collected(
        mut self,
        query: &str,
        responses: Vec<Response>,
    ) -> FusionResult<FusionOutcome> {
        self.check_preconditions(false)?;

        let invocation_id = Uuid::new_v4();
        info!(
            %invocation_id,
            strategy = %self.config.strategy,
            responses = responses.len(),
            "fusing pre-collected responses"
        );

        let value = match self.fuse(query, &responses).await {
            Ok(value) => value,
            Err(e) => return Err(self.fail(e)),
        };

        self.transition(EngineState::Done);

        Ok(FusionOutcome {
            id: invocation_id,
            value,
            failures: Vec::new(),
            completed_at: Utc::now(),
        })
    }

    /// Query every agent concurrently and collect responses in
    /// agent-configuration order.
    async fn dispatch(&mut self, query: &str) -> FusionResult<(Vec<Response>, Vec<AgentFault>)> {
        self.transition(EngineState::Dispatching);

        if self.cancel.is_cancelled() {
            return Err(self.fail(FusionError::Cancelled));
        }

        let timeout = self.config.per_agent_timeout();
        let tasks = self.agents.iter().map(|(agent_id, port)| {
            let agent_id = agent_id.clone();
            let port = Arc::clone(port);
            let cancel = self.cancel.clone();
            let query = query.to_string();
            async move {
                let ask = async {
                    match timeout {
                        Some(limit) => match tokio::time::timeout(limit, port.ask(&query)).await {
                            Ok(reply) => reply.map_err(|e| e.to_string()),
                            Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
                        },
                        None => port.ask(&query).await.map_err(|e| e.to_string()),
                    }
                };
                tokio::select! {
                    _ = cancel.cancelled() => (agent_id, Err("cancelled".to_string())),
                    reply = ask => (agent_id, reply),
                }
            }
        });

        // join_all yields outputs in input order, so responses are
        // already in agent-configuration order here.
        let settled = join_all(tasks).await;

        if self.cancel.is_cancelled() {
            return Err(self.fail(FusionError::Cancelled));
        }

        let mut responses = Vec::new();
        let mut failures = Vec::new();
        for (agent_id, reply) in settled {
            match reply {
                Ok(text) => responses.push(Response { agent_id, text }),
                Err(reason) => {
                    warn!(agent_id = %agent_id, %reason, "agent call failed");
                    failures.push(AgentFault { agent_id, reason });
                }
            }
        }

        let need = self.config.min_responses.unwrap_or(self.agents.len());
        if responses.len() < need {
            return Err(self.fail(FusionError::InsufficientResponses {
                got: responses.len(),
                need,
            }));
        }

        debug!(
            collected = responses.len(),
            failed = failures.len(),
            "dispatch complete"
        );
        Ok((responses, failures))
    }

    /// Run the configured strategy over an immutable response snapshot.
    async fn fuse(&mut self, query: &str, responses: &[Response]) -> FusionResult<FusionValue> {
        self.transition(EngineState::Fusing);
        let provider = self.similarity.as_ref();

        let value = match self.config.strategy {
            Strategy::Consensus => {
                let grouper = ParaphraseGrouper::new(provider, self.config.grouping_threshold);
                let grouped = grouper.group(responses);
                let global = global_similarity(&grouped.embeddings, provider);
                let threshold = dynamic_threshold(
                    global,
                    self.config.base_threshold,
                    self.config.adjustment_factor,
                )?;
                debug!(global, threshold, groups = grouped.groups.len(), "consensus bar adapted");
                FusionValue::Consensus(ConsensusSelector::new(provider).select(&grouped, threshold))
            }
            Strategy::Voting => {
                let strategy = VotingStrategy::new(provider, self.config.grouping_threshold);
                FusionValue::Voting(strategy.vote(responses))
            }
            Strategy::Branching => FusionValue::Branching {
                responses: branching::branch(responses),
            },
            Strategy::Aggregation => {
                // Presence checked before dispatch.
                let aggregator = self.aggregator.as_ref().ok_or_else(|| {
                    FusionError::InvalidArgument(
                        "aggregation strategy requires an aggregator agent".to_string(),
                    )
                })?;
                FusionValue::Aggregation(
                    aggregation::aggregate(query, responses, aggregator.as_ref()).await?,
                )
            }
            Strategy::Routing => {
                return Err(FusionError::InvalidArgument(
                    "routing requires live dispatch".to_string(),
                ))
            }
        };

        Ok(value)
    }
}
