//! Phase prompt templates
//!
//! Templates are plain markdown files named after the phase's template key
//! (`<prompts_dir>/<key>.md`) and rendered with handlebars. A missing file is
//! reported to the caller, which may fall back to the phase's built-in
//! instructions.

use crate::error::{Result, WorkflowError};
use crate::workflow::registry::PhaseDefinition;
use handlebars::Handlebars;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Template text loaded for a phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub key: &'static str,
    pub text: String,
    /// File the text came from, `None` for built-in instructions
    pub source: Option<PathBuf>,
}

/// A phase's template file could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTemplate {
    pub key: &'static str,
    /// Where the template was looked for, if a prompts directory is configured
    pub searched: Option<PathBuf>,
}

/// Built-in template wrapped around a phase's instructions
const DEFAULT_TEMPLATE: &str = "# Phase {{phase_id}}: {{phase_name}} ({{variant}})

{{instructions}}

Expected output: `{{output_file}}` ({{format}}).
{{#if context}}

## Context from previous phases
{{#each context}}

### {{this.phase_name}} ({{this.output_file}})
{{this.content}}
{{/each}}
{{/if}}";

/// Resolves and renders phase prompts
pub struct PromptLibrary {
    prompts_dir: Option<PathBuf>,
    handlebars: Handlebars<'static>,
}

impl PromptLibrary {
    pub fn new(prompts_dir: Option<PathBuf>) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // Prompts are plain text, not HTML
        handlebars.register_escape_fn(handlebars::no_escape);
        Self {
            prompts_dir,
            handlebars,
        }
    }

    pub fn prompts_dir(&self) -> Option<&Path> {
        self.prompts_dir.as_deref()
    }

    /// Load the template file for a phase
    pub fn load(
        &self,
        phase: &PhaseDefinition,
    ) -> std::result::Result<PromptTemplate, MissingTemplate> {
        let Some(dir) = &self.prompts_dir else {
            return Err(MissingTemplate {
                key: phase.prompt_template,
                searched: None,
            });
        };

        let path = dir.join(format!("{}.md", phase.prompt_template));
        match fs::read_to_string(&path) {
            Ok(text) => Ok(PromptTemplate {
                key: phase.prompt_template,
                text,
                source: Some(path),
            }),
            Err(_) => Err(MissingTemplate {
                key: phase.prompt_template,
                searched: Some(path),
            }),
        }
    }

    /// Load the template file, falling back to the built-in instructions
    pub fn load_or_default(&self, phase: &PhaseDefinition) -> PromptTemplate {
        self.load(phase).unwrap_or_else(|missing| {
            if let Some(searched) = &missing.searched {
                tracing::warn!(
                    template = missing.key,
                    path = %searched.display(),
                    "Prompt template not found, using built-in instructions"
                );
            }
            PromptTemplate {
                key: phase.prompt_template,
                text: DEFAULT_TEMPLATE.to_string(),
                source: None,
            }
        })
    }

    /// Build the interpolation context for a phase
    pub fn build_context(
        &self,
        variant: &str,
        phase: &PhaseDefinition,
        previous: &[(&'static PhaseDefinition, String)],
    ) -> Value {
        let context: Vec<Value> = previous
            .iter()
            .map(|(definition, content)| {
                json!({
                    "phase_id": definition.id.value(),
                    "phase_name": definition.name,
                    "output_file": definition.output_file,
                    "content": content.trim_end(),
                })
            })
            .collect();

        json!({
            "variant": variant,
            "phase_id": phase.id.value(),
            "phase_name": phase.name,
            "output_file": phase.output_file,
            "format": phase.format.as_str(),
            "instructions": phase.instructions,
            "context": context,
        })
    }

    /// Render a template with the given context
    pub fn render(&self, template: &PromptTemplate, context: &Value) -> Result<String> {
        self.handlebars
            .render_template(&template.text, context)
            .map_err(|e| WorkflowError::Render(format!("template '{}': {}", template.key, e)))
    }

    /// Resolve and render the prompt for a phase in one step
    pub fn render_phase(
        &self,
        variant: &str,
        phase: &PhaseDefinition,
        previous: &[(&'static PhaseDefinition, String)],
    ) -> Result<String> {
        let template = self.load_or_default(phase);
        let context = self.build_context(variant, phase, previous);
        self.render(&template, &context)
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new(None)
    }
}
