//! Agent capability boundary.
//!
//! The fusion engine never depends on a concrete model wrapper. Anything
//! that can answer a query with text implements [`AgentPort`]; adapters
//! for concrete backends live outside this crate and are injected at
//! configuration time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identifier for a configured agent
pub type AgentId = String;

/// Minimal capability every fusable response source implements.
///
/// Provider errors (network, rate limit, auth) surface through the
/// `anyhow::Error` and are recorded by the engine as per-agent faults —
/// a single agent's failure does not abort the others.
#[async_trait]
pub trait AgentPort: Send + Sync {
    /// Answer a query with text.
    async fn ask(&self, query: &str) -> anyhow::Result<String>;
}

/// A single captured agent response.
///
/// Immutable once captured; owned by the fusion invocation that created
/// it and never persisted beyond it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Which agent produced this response.
    pub agent_id: AgentId,
    /// The raw response text.
    pub text: String,
}

impl Response {
    /// Create a new response record.
    pub fn new(agent_id: impl Into<AgentId>, text: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            text: text.into(),
        }
    }
}

/// Diagnostic record of a failed per-agent call.
///
/// Collected on the fusion outcome for diagnostics; only pushes the call
/// into failure when the usable response count drops below the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFault {
    /// Which agent failed.
    pub agent_id: AgentId,
    /// Provider error or timeout description.
    pub reason: String,
}

impl AgentFault {
    pub fn new(agent_id: impl Into<AgentId>, reason: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            reason: reason.into(),
        }
    }
}
