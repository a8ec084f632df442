//! Production, `rig-core`-backed implementations of the `roundtable`
//! crate's `ReviewerAgent`/`ModeratorAgent`/`MetaPlanner` traits, plus
//! the CLI binary (`src/main.rs`) that drives a session end to end.

pub mod cli;
pub mod config;
pub mod llm_client;
pub mod model_pool;
pub mod moderator;
pub mod planner;
pub mod prompts;
pub mod reviewer;

pub use config::AgentConfig;
pub use llm_client::RigLlmClient;
pub use model_pool::ModelPool;
pub use moderator::LlmModerator;
pub use planner::LlmMetaPlanner;
pub use reviewer::LlmReviewer;
