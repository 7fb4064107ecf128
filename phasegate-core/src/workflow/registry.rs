//! Phase registry: the fixed, ordered list of exploration phases

use crate::error::{Result, WorkflowError};
use crate::models::workflow::{OutputFormat, PhaseId, PHASE_COUNT};
use std::path::{Path, PathBuf};

/// Static definition of one phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseDefinition {
    /// Position in the workflow
    pub id: PhaseId,
    /// Human label
    pub name: &'static str,
    /// File name written under the variant directory
    pub output_file: &'static str,
    /// Syntax the output is checked against
    pub format: OutputFormat,
    /// Key of the prompt template (`<key>.md` in the prompts directory)
    pub prompt_template: &'static str,
    /// Built-in instructions used when no template file is available
    pub instructions: &'static str,
}

macro_rules! phase {
    ($id:expr, $name:expr, $file:expr, $format:ident, $template:expr, $instructions:expr) => {
        PhaseDefinition {
            id: PhaseId($id),
            name: $name,
            output_file: $file,
            format: OutputFormat::$format,
            prompt_template: $template,
            instructions: $instructions,
        }
    };
}

static PHASES: [PhaseDefinition; PHASE_COUNT] = [
    phase!(0, "Idea Intake", "idea_intake.json", Json, "idea_intake",
        "Describe the idea: problem, target customer, proposed solution and why now. Answer as a JSON object."),
    phase!(1, "Scope Definition", "scope.yaml", Yaml, "scope",
        "Define the exploration scope: market, geography, customer segment and explicit exclusions. Answer as YAML."),
    phase!(2, "Research Planning", "research_plan.md", Markdown, "research_plan",
        "Lay out the research plan: hypotheses to test, sources to consult and the evidence that would falsify each hypothesis."),
    phase!(3, "Evidence Collection", "evidence.json", Json, "evidence",
        "List the raw evidence gathered (quotes, posts, search trends) with source and date. Answer as a JSON array or object."),
    phase!(4, "Pain Extraction", "pains_raw.json", Json, "pains_raw",
        "Extract the distinct customer pains found in the evidence, one entry per pain with supporting references. Answer as JSON."),
    phase!(5, "Pain Tagging", "pains_tagged.json", Json, "pains_tagged",
        "Tag every pain with segment, frequency and severity labels. Answer as JSON."),
    phase!(6, "Pain Quantification", "pain_scores.json", Json, "pain_scores",
        "Score each tagged pain numerically and give an overall score for the variant. Answer as JSON."),
    phase!(7, "Market & Competition", "market_competition.md", Markdown, "market_competition",
        "Size the market and map the competitors, substitutes and their weaknesses."),
    phase!(8, "Unit Economics", "unit_economics.json", Json, "unit_economics",
        "Estimate price, acquisition cost, gross margin and payback period. Answer as JSON."),
    phase!(9, "Feasibility & Risk", "feasibility_risk.md", Markdown, "feasibility_risk",
        "Assess technical and operational feasibility and list the main risks with mitigations."),
    phase!(10, "Go-To-Market Options", "gtm_options.md", Markdown, "gtm_options",
        "Describe the candidate go-to-market channels and the first experiment for each."),
    phase!(11, "ADSR Report", "report_ADSR.md", Markdown, "report_adsr",
        "Write the attack/decay/sustain/release report summarising the findings of all previous phases."),
    phase!(12, "Decision Log", "decision_log.json", Json, "decision_log",
        "Record the go/no-go decision with its rationale and the open questions. Answer as JSON."),
    phase!(13, "Cross-Variant Comparison", "comparison.md", Markdown, "comparison",
        "Compare this variant against the other explored variants and state which one to pursue."),
];

/// All phases in workflow order
pub fn phases() -> &'static [PhaseDefinition] {
    &PHASES
}

/// Look up a phase by raw id
pub fn get_phase(id: u8) -> Result<&'static PhaseDefinition> {
    PhaseId::new(id)
        .map(phase)
        .ok_or(WorkflowError::PhaseNotFound(id))
}

/// Look up a phase by validated id
pub fn phase(id: PhaseId) -> &'static PhaseDefinition {
    &PHASES[id.index()]
}

/// The phase after `id`, or `None` when `id` is the last phase
pub fn next_phase(id: PhaseId) -> Option<&'static PhaseDefinition> {
    id.next().map(phase)
}

/// Path of a phase's output file inside a variant directory
pub fn output_path(variant_dir: &Path, id: PhaseId) -> PathBuf {
    variant_dir.join(phase(id).output_file)
}

/// Check that the table is contiguous, ordered and has unique output files
pub fn validate_registry() -> std::result::Result<(), Vec<String>> {
    let mut errors = Vec::new();

    for (index, definition) in PHASES.iter().enumerate() {
        if definition.id.index() != index {
            errors.push(format!(
                "phase '{}' has id {} but sits at position {}",
                definition.name, definition.id, index
            ));
        }
        if definition.output_file.is_empty() {
            errors.push(format!("phase {} has no output file", definition.id));
        }
        if PHASES[..index]
            .iter()
            .any(|earlier| earlier.output_file == definition.output_file)
        {
            errors.push(format!(
                "output file '{}' is used by more than one phase",
                definition.output_file
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_valid() {
        assert_eq!(validate_registry(), Ok(()));
        assert_eq!(phases().len(), 14);
    }

    #[test]
    fn test_get_phase_bounds() {
        assert_eq!(get_phase(0).unwrap().name, "Idea Intake");
        assert_eq!(get_phase(13).unwrap().name, "Cross-Variant Comparison");
        assert!(matches!(get_phase(14), Err(WorkflowError::PhaseNotFound(14))));
    }

    #[test]
    fn test_next_phase() {
        let six = PhaseId::new(6).unwrap();
        assert_eq!(next_phase(six).unwrap().name, "Market & Competition");
        assert!(next_phase(PhaseId::LAST).is_none());
    }

    #[test]
    fn test_output_path_joins_variant_dir() {
        let path = output_path(Path::new("/ws/v1"), PhaseId::new(6).unwrap());
        assert_eq!(path, PathBuf::from("/ws/v1/pain_scores.json"));
    }

    #[test]
    fn test_output_format_matches_extension() {
        for definition in phases() {
            let expected = match definition.format {
                OutputFormat::Json => ".json",
                OutputFormat::Yaml => ".yaml",
                OutputFormat::Markdown => ".md",
            };
            assert!(
                definition.output_file.ends_with(expected),
                "{} should end with {}",
                definition.output_file,
                expected
            );
        }
    }
}
