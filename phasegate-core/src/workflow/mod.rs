//! Workflow engine module

pub mod answer_source;
pub mod compare;
pub mod lock;
pub mod orchestrator;
pub mod persistence;
pub mod prompts;
pub mod registry;

pub use answer_source::*;
pub use compare::*;
pub use lock::*;
pub use orchestrator::*;
pub use persistence::*;
pub use prompts::*;
pub use registry::{get_phase, next_phase, output_path, phase, phases, validate_registry, PhaseDefinition};
