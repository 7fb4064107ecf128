//! # Phasegate Core Library
//!
//! Gated phase workflow engine: a fixed registry of exploration phases, a
//! file-backed store for variant state and the audit trail, and an
//! orchestrator that only moves a variant forward on an explicit decision.

pub mod error;
pub mod models;
pub mod services;
pub mod strategy;
pub mod validation;
pub mod workflow;

pub use error::{Result, WorkflowError};
