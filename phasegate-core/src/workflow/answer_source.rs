//! Answer sources: where a phase's content comes from
//!
//! The orchestrator treats the source as a black box that returns either
//! well-formed structured data or free text. An LLM caller, a human at a
//! terminal or a file written by another agent all fit behind this trait.

use crate::models::workflow::PhaseId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

/// Everything a source needs to produce an answer for one phase
#[derive(Debug, Clone)]
pub struct PhaseRequest {
    pub variant: String,
    pub phase: PhaseId,
    pub phase_name: &'static str,
    /// Rendered prompt including previous phase outputs
    pub prompt: String,
}

/// Trait for producing phase answers
#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Produce the answer text for a phase
    async fn answer(&self, request: &PhaseRequest) -> Result<String>;
}

/// Returns the same text for every request
#[derive(Debug, Clone)]
pub struct StaticAnswer {
    text: String,
}

impl StaticAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl AnswerSource for StaticAnswer {
    async fn answer(&self, _request: &PhaseRequest) -> Result<String> {
        Ok(self.text.clone())
    }
}

/// Reads the answer from a file, or from stdin when the path is `-`
#[derive(Debug, Clone)]
pub struct FileAnswer {
    path: PathBuf,
}

impl FileAnswer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }
}

#[async_trait]
impl AnswerSource for FileAnswer {
    async fn answer(&self, request: &PhaseRequest) -> Result<String> {
        if self.is_stdin() {
            return tokio::task::spawn_blocking(|| {
                let mut buffer = String::new();
                std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
                Ok::<String, std::io::Error>(buffer)
            })
            .await
            .context("Failed to read answer")?
            .context("Failed to read answer from stdin");
        }

        tokio::fs::read_to_string(&self.path).await.with_context(|| {
            format!(
                "Failed to read answer for phase {} from {}",
                request.phase,
                self.path.display()
            )
        })
    }
}
