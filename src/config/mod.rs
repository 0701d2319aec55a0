//! Configuration module for the pooling and execution engine
//!
//! This module provides the `SwarmConfig` struct and its builder for
//! configuring pool caps, recycling thresholds, and admission control
//! with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::SwarmConfigBuilder;
pub use types::SwarmConfig;
