//! Instance query service: read-only views for listing screens

use crate::evaluator::RuleEvaluator;
use formflow_types::{
    Identity, TransitionRule, WorkflowDefinition, WorkflowDefinitionId, WorkflowInstance,
};

/// Read-only queries over instances and definitions
#[derive(Clone, Debug, Default)]
pub struct InstanceQueryService {
    evaluator: RuleEvaluator,
}

impl InstanceQueryService {
    pub fn new() -> Self {
        Self {
            evaluator: RuleEvaluator::new(),
        }
    }

    /// Rules out of the instance's current state that `identity` may act
    /// on, in definition order
    pub fn available_transitions<'d>(
        &self,
        instance: &WorkflowInstance,
        definition: &'d WorkflowDefinition,
        identity: &Identity,
    ) -> Vec<&'d TransitionRule> {
        self.evaluator
            .authorized_from(definition, &instance.current_state, identity)
    }

    /// Instances whose current state has at least one outgoing rule
    /// `identity` may act on.
    ///
    /// This is a full scan. If instance volume grows, an index keyed by
    /// `(current_state, role)` is the place to add one. Instances whose
    /// definition cannot be resolved are skipped.
    pub fn pending_for<'i, 'd, I, F>(
        &self,
        identity: &Identity,
        instances: I,
        definition_of: F,
    ) -> Vec<&'i WorkflowInstance>
    where
        I: IntoIterator<Item = &'i WorkflowInstance>,
        F: Fn(&WorkflowDefinitionId) -> Option<&'d WorkflowDefinition>,
    {
        instances
            .into_iter()
            .filter(|instance| {
                definition_of(&instance.definition_id).is_some_and(|def| {
                    def.outgoing(&instance.current_state)
                        .any(|rule| self.evaluator.is_authorized(rule, identity))
                })
            })
            .collect()
    }
}
