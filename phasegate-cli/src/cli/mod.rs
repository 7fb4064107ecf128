//! CLI command handling

pub mod context;
pub mod handlers;
pub mod input;
