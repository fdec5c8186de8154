//! Fusion strategies.
//!
//! Five peer algorithms over the same collected response set:
//!
//! - **consensus** — paraphrase grouping + adaptive-threshold selection
//!   (see [`crate::consensus`])
//! - **voting** — near-duplicate tally, first-to-max wins
//! - **branching** — no fusion, every response in agent order
//! - **aggregation** — a designated agent merges all responses
//! - **routing** — exactly one agent is chosen and queried

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FusionError;

pub mod aggregation;
pub mod branching;
pub mod routing;
pub mod voting;

pub use aggregation::AggregationResult;
pub use routing::{RoutingDecision, RoutingPolicy};
pub use voting::{VotingResult, VotingStrategy};

/// Which fusion algorithm a call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Paraphrase grouping with adaptive-threshold selection.
    Consensus,
    /// Near-duplicate tally; the largest group wins.
    Voting,
    /// No fusion — all responses returned in agent order.
    Branching,
    /// A designated aggregator agent merges all responses.
    Aggregation,
    /// One agent is picked and queried; only its answer is returned.
    Routing,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Consensus
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Consensus => write!(f, "consensus"),
            Self::Voting => write!(f, "voting"),
            Self::Branching => write!(f, "branching"),
            Self::Aggregation => write!(f, "aggregation"),
            Self::Routing => write!(f, "routing"),
        }
    }
}

impl FromStr for Strategy {
    type Err = FusionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "consensus" => Ok(Self::Consensus),
            "voting" => Ok(Self::Voting),
            "branching" => Ok(Self::Branching),
            "aggregation" => Ok(Self::Aggregation),
            "routing" => Ok(Self::Routing),
            other => Err(FusionError::InvalidArgument(format!(
                "unsupported strategy: '{other}'"
            ))),
        }
    }
}
