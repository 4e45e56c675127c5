//! Validator: configuration-time checks on workflow definitions
//!
//! Runs when a definition is registered or replaced, never during a
//! transition attempt. Rule lookup at runtime stays first-match-wins; the
//! validator is what keeps duplicate rules from reaching it.

use formflow_types::{WorkflowDefinition, WorkflowError, WorkflowResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which optional checks the validator enforces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Reject definitions with more than one rule for a `(from, to)` pair.
    /// When off, duplicates are logged and the first one shadows the rest.
    pub reject_duplicate_rules: bool,
    /// Reject rules whose endpoints are not listed in `states`
    pub require_known_states: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            reject_duplicate_rules: true,
            require_known_states: true,
        }
    }
}

/// Validate a definition under `policy`
pub fn validate(definition: &WorkflowDefinition, policy: &ValidationPolicy) -> WorkflowResult<()> {
    validate_has_states(definition)?;
    validate_unique_states(definition)?;
    validate_rule_roles(definition)?;
    if policy.require_known_states {
        validate_rules_reference_known_states(definition)?;
    }
    validate_unique_rules(definition, policy.reject_duplicate_rules)?;
    Ok(())
}

fn validate_has_states(definition: &WorkflowDefinition) -> WorkflowResult<()> {
    if definition.states.is_empty() {
        return Err(WorkflowError::EmptyStates);
    }
    if let Some(blank) = definition.states.iter().find(|s| s.trim().is_empty()) {
        return Err(WorkflowError::ValidationError(format!(
            "State names must not be blank: {:?}",
            blank
        )));
    }
    Ok(())
}

fn validate_unique_states(definition: &WorkflowDefinition) -> WorkflowResult<()> {
    let mut seen = HashSet::new();
    for state in &definition.states {
        if !seen.insert(state) {
            return Err(WorkflowError::DuplicateState(state.clone()));
        }
    }
    Ok(())
}

fn validate_rule_roles(definition: &WorkflowDefinition) -> WorkflowResult<()> {
    for rule in &definition.transitions {
        if rule.allowed_roles.is_empty() {
            return Err(WorkflowError::ValidationError(format!(
                "Transition {} -> {} allows no roles",
                rule.from_state, rule.to_state
            )));
        }
    }
    Ok(())
}

fn validate_rules_reference_known_states(definition: &WorkflowDefinition) -> WorkflowResult<()> {
    for rule in &definition.transitions {
        for state in [&rule.from_state, &rule.to_state] {
            if !definition.has_state(state) {
                return Err(WorkflowError::UnknownState(state.clone()));
            }
        }
    }
    Ok(())
}

fn validate_unique_rules(definition: &WorkflowDefinition, reject: bool) -> WorkflowResult<()> {
    let mut seen = HashSet::new();
    for rule in &definition.transitions {
        if seen.insert((&rule.from_state, &rule.to_state)) {
            continue;
        }
        if reject {
            return Err(WorkflowError::DuplicateTransition {
                from: rule.from_state.clone(),
                to: rule.to_state.clone(),
            });
        }
        tracing::warn!(
            definition_id = %definition.id,
            from = %rule.from_state,
            to = %rule.to_state,
            "Duplicate transition rule is shadowed by an earlier one"
        );
    }
    Ok(())
}
