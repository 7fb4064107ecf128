//! Data models for phasegate

pub mod configuration;
pub mod workflow;

pub use configuration::*;
pub use workflow::*;
