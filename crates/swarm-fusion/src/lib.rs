//! Swarm Fusion Library
//!
//! Dispatches a single query to multiple independent language-model
//! agents and fuses their responses into one decision.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      FusionEngine                          │
//! │  • Validates configuration                                 │
//! │  • Dispatches the query to every AgentPort concurrently    │
//! │  • Reassembles responses in agent order                    │
//! │  • Runs the selected strategy                              │
//! └─────────────────────────┬─────────────────────────────────┘
//!                           │
//!        ┌───────────┬──────┴─────┬───────────┬───────────┐
//!        ▼           ▼            ▼           ▼           ▼
//!  ┌──────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌─────────┐
//!  │Consensus │ │ Voting  │ │Branching │ │Aggrega- │ │ Routing │
//!  │(grouping │ │ (tally) │ │(no fuse) │ │tion     │ │(pick 1) │
//!  │+adaptive │ └─────────┘ └──────────┘ │(delegate│ └─────────┘
//!  │threshold)│                          │ merge)  │
//!  └──────────┘                          └─────────┘
//! ```
//!
//! # Components
//!
//! - **AgentPort**: the one-method capability every response source
//!   implements — `ask(query) -> text`
//! - **SimilarityProvider**: pluggable embeddings + similarity in [0, 1],
//!   with a deterministic built-in default
//! - **ParaphraseGrouper**: partitions responses into near-duplicate
//!   groups
//! - **ConsensusSelector**: adaptive-threshold best-group selection
//! - **FusionEngine**: one-shot orchestrator with concurrent dispatch,
//!   per-agent timeouts and cancellation
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use swarm_fusion::{FusionConfig, FusionEngine};
//!
//! let config = FusionConfig::from_toml_path("fusion.toml")?;
//! let outcome = FusionEngine::new(config)
//!     .with_agent("architect", architect)
//!     .with_agent("coder", coder)
//!     .with_agent("reviewer", reviewer)
//!     .run("How should we cache session state?")
//!     .await?;
//! println!("{:?}", outcome.value);
//! ```

pub mod agent;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod group;
pub mod similarity;
pub mod strategy;

// Re-export the capability boundary and core records
pub use agent::{AgentFault, AgentId, AgentPort, Response};

// Re-export configuration and errors
pub use config::FusionConfig;
pub use error::{FusionError, FusionResult};

// Re-export the engine surface
pub use engine::{EngineState, FusionEngine, FusionOutcome, FusionValue};

// Re-export consensus primitives
pub use consensus::{dynamic_threshold, ConsensusResult, ConsensusSelector, NO_CONSENSUS};
pub use group::{GroupedResponses, ParaphraseGroup, ParaphraseGrouper};
pub use similarity::{cosine_similarity, Embedding, HashedBagOfWords, SimilarityProvider};

// Re-export strategy types
pub use strategy::{
    AggregationResult, RoutingDecision, RoutingPolicy, Strategy, VotingResult, VotingStrategy,
};
