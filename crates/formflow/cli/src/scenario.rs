//! Definition and scenario files
//!
//! Files are YAML when the extension is `.yaml`/`.yml`, JSON otherwise.

use crate::error::CliResult;
use formflow_types::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// A workflow as written by hand: states and rules, without ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionFile {
    /// Template the workflow belongs to, if the file names one
    #[serde(default)]
    pub form_template: Option<String>,
    pub states: Vec<String>,
    #[serde(default)]
    pub transitions: Vec<TransitionRule>,
}

impl DefinitionFile {
    pub fn into_definition(self, template: FormTemplateId) -> WorkflowDefinition {
        let mut definition = WorkflowDefinition::new(template, self.states);
        for rule in self.transitions {
            definition.add_transition(rule);
        }
        definition
    }

    /// The template id named in the file, or a placeholder
    pub fn template_id(&self) -> FormTemplateId {
        FormTemplateId::new(self.form_template.as_deref().unwrap_or("unbound"))
    }
}

/// A form template as written by hand
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl TemplateFile {
    pub fn into_template(self) -> FormTemplate {
        self.fields
            .into_iter()
            .fold(FormTemplate::new(self.name), FormTemplate::with_field)
    }
}

/// One transition attempt in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub target: String,
}

impl Attempt {
    pub fn identity(&self) -> Identity {
        Identity::new(&self.username, &self.roles)
    }
}

/// A template, its workflow, one submission and the attempts to replay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub template: TemplateFile,
    pub workflow: DefinitionFile,
    #[serde(default = "default_submitter")]
    pub submitter: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
}

fn default_submitter() -> String {
    "submitter".to_string()
}

/// Read and parse a YAML or JSON file
pub fn load<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let contents = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}
