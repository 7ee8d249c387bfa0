//! # Node Container
//!
//! Every subsystem is constructed exactly once, here, and handed its
//! collaborators explicitly. Nothing in the node reaches for a global.

pub mod config;
pub mod subsystems;

pub use config::{ConfigError, NodeConfig, NodeSettings, RuntimeConfig};
pub use subsystems::NodeContainer;
