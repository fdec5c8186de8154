//! Fusion error taxonomy.
//!
//! Every terminal failure of a fusion call surfaces as a typed
//! [`FusionError`] carrying its cause. Per-agent failures below the
//! minimum-responses floor are not errors: they are collected as
//! [`crate::agent::AgentFault`] records on the outcome instead.

use thiserror::Error;

use crate::agent::AgentId;

/// Error type for fusion operations
#[derive(Debug, Error)]
pub enum FusionError {
    /// Malformed configuration or out-of-range numeric input.
    /// Raised before dispatch; a precondition check, not a recoverable branch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An agent call failed in a context where the response is required
    /// (routing target, delegated routing decision).
    #[error("agent '{agent_id}' failed: {reason}")]
    AgentFailure { agent_id: AgentId, reason: String },

    /// Fewer usable responses than the configured floor.
    #[error("insufficient responses: got {got}, need {need}")]
    InsufficientResponses { got: usize, need: usize },

    /// A routing decision named an agent id that is not configured.
    /// No fallback bot is queried.
    #[error("routing target not found: '{0}'")]
    RoutingTargetNotFound(AgentId),

    /// The designated aggregation agent failed. There is no local merge
    /// fallback.
    #[error("aggregator failed: {0}")]
    AggregatorFailure(String),

    /// Caller-initiated abort. In-flight agent calls are abandoned and no
    /// partial result is returned.
    #[error("fusion cancelled")]
    Cancelled,
}

/// Result type for fusion operations
pub type FusionResult<T> = Result<T, FusionError>;
