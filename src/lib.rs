pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod tools;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{Cli, Command};

pub use adapters::{build_language_model, norm_api::NormClient};
pub use config::AgentConfig;
pub use core::ReActAgent;
pub use tools::ToolRegistry;
pub use utils::error::{AgentError, Result};
