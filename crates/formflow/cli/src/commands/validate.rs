//! `formflow validate`: check a workflow definition file

use crate::error::CliResult;
use crate::output::{self, print_success, OutputFormat};
use crate::scenario::{self, DefinitionFile};
use formflow_engine::{validator, EngineConfig};
use formflow_types::TransitionRule;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

/// Table row for rule display
#[derive(Debug, Serialize, Tabled)]
struct RuleRow {
    from: String,
    to: String,
    roles: String,
    quorum: String,
}

impl From<&TransitionRule> for RuleRow {
    fn from(rule: &TransitionRule) -> Self {
        Self {
            from: rule.from_state.clone(),
            to: rule.to_state.clone(),
            roles: rule
                .allowed_roles
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
            quorum: rule.quorum_mode.to_string(),
        }
    }
}

/// Validate the definition at `path` and print its rules
pub fn execute(path: &Path, engine: &EngineConfig, format: OutputFormat) -> CliResult<()> {
    let file: DefinitionFile = scenario::load(path)?;
    let template = file.template_id();
    let definition = file.into_definition(template);

    validator::validate(&definition, &engine.validation_policy())?;

    if matches!(format, OutputFormat::Table) {
        print_success(&format!(
            "{}: {} states, {} transitions",
            path.display(),
            definition.states.len(),
            definition.transitions.len()
        ));
    }
    output::print_output(
        definition.transitions.iter().map(RuleRow::from).collect(),
        format,
    )
}
