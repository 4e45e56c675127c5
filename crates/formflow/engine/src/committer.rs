//! Transition committer: the state machine
//!
//! The committer is the only component that changes an instance's
//! `current_state`. One call to [`TransitionCommitter::attempt_transition`]
//! resolves the rule, checks authorization, records the approval, evaluates
//! quorum and, when quorum is met, commits. It works on a `&mut` instance
//! and performs no I/O, so the caller decides what the atomic unit is (see
//! `FormflowService::attempt_transition`).
//!
//! Rejections leave the instance untouched, ledger included.

use crate::evaluator::RuleEvaluator;
use formflow_types::*;
use std::collections::BTreeSet;

/// Applies transition attempts to workflow instances
#[derive(Clone, Debug, Default)]
pub struct TransitionCommitter {
    evaluator: RuleEvaluator,
}

impl TransitionCommitter {
    pub fn new() -> Self {
        Self {
            evaluator: RuleEvaluator::new(),
        }
    }

    pub fn evaluator(&self) -> &RuleEvaluator {
        &self.evaluator
    }

    /// Attempt to move `instance` to `target` on behalf of `identity`.
    ///
    /// Returns `Committed`, `Pending` or `AlreadyApproved` on success;
    /// `InvalidTransition` when no rule leads from the current state to
    /// `target`, and `Forbidden` when the identity holds none of the
    /// rule's roles.
    pub fn attempt_transition(
        &self,
        instance: &mut WorkflowInstance,
        definition: &WorkflowDefinition,
        target: &str,
        identity: &Identity,
    ) -> WorkflowResult<TransitionOutcome> {
        let from = instance.current_state.clone();

        let rule = self
            .evaluator
            .find_rule(definition, &from, target)
            .ok_or_else(|| WorkflowError::InvalidTransition {
                from: from.clone(),
                to: target.to_owned(),
            })?;

        if !self.evaluator.is_authorized(rule, identity) {
            tracing::warn!(
                instance_id = %instance.id,
                from = %from,
                to = %target,
                username = %identity.username,
                "Transition forbidden"
            );
            return Err(WorkflowError::Forbidden {
                username: identity.username.clone(),
                from,
                to: target.to_owned(),
            });
        }

        // Approvals opened from a state the instance has left must not
        // count toward anything reachable from the current one.
        let stale = instance.pending_approvals.discard_stale(&from);
        if !stale.is_empty() {
            tracing::debug!(instance_id = %instance.id, ?stale, "Discarded stale approvals");
            instance.touch();
        }

        let roles = self.evaluator.contributing_roles(rule, identity);
        match instance
            .pending_approvals
            .record(&from, target, identity, roles)
        {
            RecordOutcome::AlreadyPresent => {
                tracing::debug!(
                    instance_id = %instance.id,
                    to = %target,
                    username = %identity.username,
                    "Approval already recorded"
                );
                return Ok(TransitionOutcome::AlreadyApproved);
            }
            RecordOutcome::Added => {}
        }

        let quorum_met = match rule.quorum_mode {
            QuorumMode::Any => true,
            QuorumMode::All => Self::all_roles_covered(
                &rule.allowed_roles,
                &instance.pending_approvals.roles_covered(target),
            ),
        };

        if quorum_met {
            self.commit(instance, target);
            tracing::info!(
                instance_id = %instance.id,
                from = %from,
                to = %target,
                username = %identity.username,
                quorum = %rule.quorum_mode,
                "Transition committed"
            );
            Ok(TransitionOutcome::Committed(target.to_owned()))
        } else {
            instance.touch();
            let approvers = instance.pending_approvals.approvers_of(target);
            tracing::debug!(
                instance_id = %instance.id,
                to = %target,
                approvals = approvers.len(),
                "Transition pending quorum"
            );
            Ok(TransitionOutcome::Pending(approvers))
        }
    }

    /// `ALL` quorum counts distinct roles, not distinct approvers: one
    /// identity holding two required roles covers both.
    fn all_roles_covered(required: &BTreeSet<String>, covered: &BTreeSet<String>) -> bool {
        required.is_subset(covered)
    }

    /// Move the instance and drop every ledger entry. All entries were
    /// opened from the state being left, so none of them can apply to the
    /// new one.
    fn commit(&self, instance: &mut WorkflowInstance, target: &str) {
        instance.current_state = target.to_owned();
        instance.pending_approvals.clear_all();
        instance.touch();
    }
}
