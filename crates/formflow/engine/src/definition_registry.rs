//! Definition registry: stores and retrieves workflow definitions
//!
//! Pure data: each form template has at most one workflow definition, and
//! the registry answers lookups by definition id or by template. Structural
//! validation happens before a definition gets here (see `validator`).

use formflow_types::{
    FormTemplateId, StorageError, StorageResult, WorkflowDefinition, WorkflowDefinitionId,
};
use std::collections::HashMap;

/// Registry of workflow definitions
#[derive(Clone, Debug, Default)]
pub struct DefinitionRegistry {
    /// All registered definitions, keyed by ID
    definitions: HashMap<WorkflowDefinitionId, WorkflowDefinition>,
    /// Index by form template
    by_template: HashMap<FormTemplateId, WorkflowDefinitionId>,
}

impl DefinitionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a workflow definition. Fails with a conflict if the id is
    /// taken or the template already has a definition.
    pub fn register(
        &mut self,
        definition: WorkflowDefinition,
    ) -> StorageResult<WorkflowDefinitionId> {
        if self.definitions.contains_key(&definition.id) {
            return Err(StorageError::Conflict(format!(
                "definition {} already exists",
                definition.id
            )));
        }
        if self.by_template.contains_key(&definition.form_template) {
            return Err(StorageError::Conflict(format!(
                "form template {} already has a workflow definition",
                definition.form_template
            )));
        }

        let id = definition.id.clone();
        self.by_template
            .insert(definition.form_template.clone(), id.clone());
        self.definitions.insert(id.clone(), definition);

        tracing::debug!(definition_id = %id, "Workflow definition registered");
        Ok(id)
    }

    /// Get a definition by ID
    pub fn get(&self, id: &WorkflowDefinitionId) -> Option<&WorkflowDefinition> {
        self.definitions.get(id)
    }

    /// Get the definition bound to a form template
    pub fn get_for_template(&self, template: &FormTemplateId) -> Option<&WorkflowDefinition> {
        self.by_template
            .get(template)
            .and_then(|id| self.definitions.get(id))
    }

    /// Overwrite a registered definition. The template binding cannot move.
    pub fn replace(&mut self, definition: WorkflowDefinition) -> StorageResult<()> {
        let slot = self
            .definitions
            .get_mut(&definition.id)
            .ok_or_else(|| StorageError::NotFound(format!("definition {}", definition.id)))?;
        if slot.form_template != definition.form_template {
            return Err(StorageError::Conflict(format!(
                "definition {} is bound to form template {}",
                definition.id, slot.form_template
            )));
        }

        tracing::debug!(definition_id = %definition.id, "Workflow definition replaced");
        *slot = definition;
        Ok(())
    }

    /// List all registered definitions, oldest first
    pub fn list(&self) -> Vec<&WorkflowDefinition> {
        let mut all: Vec<_> = self.definitions.values().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }
}
