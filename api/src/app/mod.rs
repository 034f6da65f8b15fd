//! Application layer
//!
//! Contains use cases and service orchestration.
//! Services coordinate between domain entities, ports, and external systems.

pub mod agent_service;
pub mod content_service;
pub mod reputation_config;
pub mod reputation_service;
pub mod side_effects;
pub mod vote_service;

pub use agent_service::{hash_api_key, AgentService};
pub use content_service::ContentService;
pub use reputation_service::ReputationService;
pub use side_effects::{ExecutorConfig, PostCommitHandler, SideEffectExecutor};
pub use vote_service::VoteService;
