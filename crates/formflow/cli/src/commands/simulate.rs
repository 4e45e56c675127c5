//! `formflow simulate`: replay a scenario against in-memory storage

use crate::error::CliResult;
use crate::output::{self, print_info, OutputFormat};
use crate::scenario::{self, Scenario};
use formflow_engine::{EngineConfig, FormflowService, InMemoryStorage};
use formflow_types::*;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tabled::Tabled;

/// Username the simulator uses for setup
const SETUP_USER: &str = "formflow-simulate";

/// Table row for one replayed attempt
#[derive(Debug, Serialize, Tabled)]
pub struct StepRow {
    pub step: usize,
    pub username: String,
    /// Targets the user could act on just before the attempt
    pub available: String,
    pub target: String,
    pub outcome: String,
    pub state: String,
}

/// A replayed scenario
#[derive(Debug, Serialize)]
pub struct Simulation {
    pub steps: Vec<StepRow>,
    /// Scenario users the instance is still waiting on after the last step
    pub waiting_on: Vec<String>,
}

impl Simulation {
    pub fn final_state(&self) -> Option<&str> {
        self.steps.last().map(|s| s.state.as_str())
    }
}

/// Run a scenario and return one row per attempt, plus who the instance
/// is left waiting on.
///
/// Setup failures (bad template, invalid workflow, missing fields) abort
/// the run. A rejected attempt is a row like any other.
pub async fn run(scenario: Scenario, engine: EngineConfig) -> CliResult<Simulation> {
    let setup = Identity::new(SETUP_USER, &engine.admin_roles);
    let service = FormflowService::new(Arc::new(InMemoryStorage::new()), engine);

    let template_id = service
        .create_template(&setup, scenario.template.into_template())
        .await?;
    service
        .create_definition(&setup, scenario.workflow.into_definition(template_id.clone()))
        .await?;

    let submitter = Identity::new(scenario.submitter, Vec::<String>::new());
    let (_, instance_id) = service
        .submit_form(&submitter, &template_id, scenario.data)
        .await?;
    tracing::debug!(instance_id = %instance_id, "Scenario instance created");

    let mut rows = Vec::with_capacity(scenario.attempts.len());
    for (index, attempt) in scenario.attempts.iter().enumerate() {
        let identity = attempt.identity();
        let available = service
            .available_transitions(&instance_id, &identity)
            .await?
            .into_iter()
            .map(|rule| rule.to_state)
            .collect::<Vec<_>>();

        let outcome = match service
            .attempt_transition(&instance_id, &attempt.target, &identity)
            .await
        {
            Ok(outcome) => outcome.to_string(),
            Err(err) if err.is_rejection() => format!("rejected: {}", err),
            Err(err) => return Err(err.into()),
        };
        let instance = service.get_instance(&instance_id).await?;
        rows.push(StepRow {
            step: index + 1,
            username: attempt.username.clone(),
            available: if available.is_empty() {
                "-".into()
            } else {
                available.join(", ")
            },
            target: attempt.target.clone(),
            outcome,
            state: instance.current_state,
        });
    }

    let mut waiting_on: Vec<String> = Vec::new();
    for attempt in &scenario.attempts {
        if waiting_on.contains(&attempt.username) {
            continue;
        }
        let pending = service.pending_for(&attempt.identity()).await?;
        if pending.iter().any(|i| i.id == instance_id) {
            waiting_on.push(attempt.username.clone());
        }
    }

    Ok(Simulation {
        steps: rows,
        waiting_on,
    })
}

/// Load the scenario at `path`, replay it and print the steps
pub async fn execute(path: &Path, engine: EngineConfig, format: OutputFormat) -> CliResult<()> {
    let scenario: Scenario = scenario::load(path)?;
    let simulation = run(scenario, engine).await?;

    let OutputFormat::Table = format else {
        return output::print_single(&simulation, format);
    };

    let final_state = simulation.final_state().map(str::to_owned);
    let waiting_on = simulation.waiting_on.join(", ");
    output::print_output(simulation.steps, format)?;
    if let Some(state) = final_state {
        print_info(&format!("Final state: {}", state));
    }
    if waiting_on.is_empty() {
        print_info("Waiting on: nobody");
    } else {
        print_info(&format!("Waiting on: {}", waiting_on));
    }
    Ok(())
}
