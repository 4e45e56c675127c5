//! Rule evaluator: finds the rule for a move and checks who may act on it
//!
//! Pure lookup over a definition. No side effects.

use formflow_types::{Identity, TransitionRule, WorkflowDefinition};
use std::collections::BTreeSet;

/// Matches transition requests against a definition's rules
#[derive(Clone, Debug, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Find the rule for `from -> to`.
    ///
    /// If a definition carries more than one rule for the same pair, the
    /// first in definition order wins and the rest are shadowed. The
    /// validator rejects such definitions by default.
    pub fn find_rule<'d>(
        &self,
        definition: &'d WorkflowDefinition,
        from: &str,
        to: &str,
    ) -> Option<&'d TransitionRule> {
        definition.transitions.iter().find(|r| r.connects(from, to))
    }

    /// True iff the identity holds at least one of the rule's allowed roles.
    /// Quorum mode plays no part here.
    pub fn is_authorized(&self, rule: &TransitionRule, identity: &Identity) -> bool {
        identity.has_any_role(&rule.allowed_roles)
    }

    /// The rule's roles this identity holds; these are what its approval
    /// contributes toward an `ALL` quorum
    pub fn contributing_roles(&self, rule: &TransitionRule, identity: &Identity) -> BTreeSet<String> {
        identity.roles_within(&rule.allowed_roles)
    }

    /// Rules leaving `state` that `identity` may act on, in definition order
    pub fn authorized_from<'d>(
        &self,
        definition: &'d WorkflowDefinition,
        state: &str,
        identity: &Identity,
    ) -> Vec<&'d TransitionRule> {
        definition
            .outgoing(state)
            .filter(|rule| self.is_authorized(rule, identity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_types::{FormTemplateId, QuorumMode};

    fn definition() -> WorkflowDefinition {
        WorkflowDefinition::new(FormTemplateId::new("t"), ["Draft", "Review", "Approved", "Rejected"])
            .with_transition(TransitionRule::any_of("Draft", "Review", ["Employee"]))
            .with_transition(TransitionRule::all_of(
                "Review",
                "Approved",
                ["Manager", "Finance"],
            ))
            .with_transition(TransitionRule::any_of("Review", "Rejected", ["Manager"]))
    }

    #[test]
    fn test_find_rule_matches_pair() {
        let def = definition();
        let ev = RuleEvaluator::new();

        let rule = ev.find_rule(&def, "Review", "Approved").unwrap();
        assert_eq!(rule.quorum_mode, QuorumMode::All);
        assert!(ev.find_rule(&def, "Draft", "Approved").is_none());
        assert!(ev.find_rule(&def, "Approved", "Draft").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let def = definition().with_transition(TransitionRule::any_of(
            "Draft",
            "Review",
            ["Admin"],
        ));
        let rule = RuleEvaluator::new().find_rule(&def, "Draft", "Review").unwrap();
        assert!(rule.allowed_roles.contains("Employee"));
        assert!(!rule.allowed_roles.contains("Admin"));
    }

    #[test]
    fn test_authorization_is_role_intersection() {
        let def = definition();
        let ev = RuleEvaluator::new();
        let rule = ev.find_rule(&def, "Review", "Approved").unwrap();

        assert!(ev.is_authorized(rule, &Identity::new("m", ["Manager"])));
        assert!(ev.is_authorized(rule, &Identity::new("f", ["Finance", "Employee"])));
        assert!(!ev.is_authorized(rule, &Identity::new("e", ["Employee"])));
        assert!(!ev.is_authorized(rule, &Identity::new("nobody", Vec::<String>::new())));
    }

    #[test]
    fn test_contributing_roles() {
        let def = definition();
        let ev = RuleEvaluator::new();
        let rule = ev.find_rule(&def, "Review", "Approved").unwrap();
        let roles = ev.contributing_roles(rule, &Identity::new("x", ["Manager", "Employee"]));
        assert_eq!(roles.into_iter().collect::<Vec<_>>(), vec!["Manager".to_string()]);
    }

    #[test]
    fn test_authorized_from_filters_and_orders() {
        let def = definition();
        let ev = RuleEvaluator::new();

        let manager = Identity::new("m", ["Manager"]);
        let targets: Vec<_> = ev
            .authorized_from(&def, "Review", &manager)
            .iter()
            .map(|r| r.to_state.as_str())
            .collect();
        assert_eq!(targets, vec!["Approved", "Rejected"]);

        let finance = Identity::new("f", ["Finance"]);
        assert_eq!(ev.authorized_from(&def, "Review", &finance).len(), 1);
        assert!(ev.authorized_from(&def, "Approved", &manager).is_empty());
    }
}
