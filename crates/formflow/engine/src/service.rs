//! Formflow service: the entry point callers talk to
//!
//! The service wires the storage backend, the committer and the query
//! service together. It resolves identities against the configured admin
//! roles, keeps every definition it stores valid, and makes each
//! transition attempt atomic per instance.

use crate::committer::TransitionCommitter;
use crate::config::EngineConfig;
use crate::locks::InstanceLocks;
use crate::query::InstanceQueryService;
use crate::storage::Storage;
use crate::validator;
use formflow_types::*;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Async facade over a [`Storage`] backend
pub struct FormflowService<S: Storage> {
    storage: Arc<S>,
    config: EngineConfig,
    committer: TransitionCommitter,
    queries: InstanceQueryService,
    locks: InstanceLocks,
}

impl<S: Storage> FormflowService<S> {
    pub fn new(storage: Arc<S>, config: EngineConfig) -> Self {
        Self {
            storage,
            config,
            committer: TransitionCommitter::new(),
            queries: InstanceQueryService::new(),
            locks: InstanceLocks::new(),
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn require_admin(&self, actor: &Identity) -> WorkflowResult<()> {
        if actor.has_any_role(&self.config.admin_roles) {
            Ok(())
        } else {
            tracing::warn!(username = %actor.username, "Admin operation refused");
            Err(WorkflowError::Unauthorized(format!(
                "'{}' holds none of the admin roles",
                actor.username
            )))
        }
    }

    // ── Templates ────────────────────────────────────────────────────

    /// Store a new form template. Template names are unique.
    pub async fn create_template(
        &self,
        actor: &Identity,
        template: FormTemplate,
    ) -> WorkflowResult<FormTemplateId> {
        self.require_admin(actor)?;

        let id = template.id.clone();
        let name = template.name.clone();
        match self.storage.insert_template(template).await {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => {
                return Err(WorkflowError::DuplicateTemplateName(name));
            }
            Err(err) => return Err(err.into()),
        }
        tracing::info!(template_id = %id, name = %name, "Form template created");
        Ok(id)
    }

    /// Replace an existing template's name and schema
    pub async fn update_template(
        &self,
        actor: &Identity,
        template: FormTemplate,
    ) -> WorkflowResult<FormTemplate> {
        self.require_admin(actor)?;

        let existing = self
            .storage
            .get_template(&template.id)
            .await?
            .ok_or_else(|| WorkflowError::TemplateNotFound(template.id.clone()))?;

        let updated = FormTemplate {
            created_at: existing.created_at,
            ..template
        };
        match self.storage.replace_template(updated.clone()).await {
            Ok(()) => {}
            Err(StorageError::Conflict(_)) => {
                return Err(WorkflowError::DuplicateTemplateName(updated.name));
            }
            Err(StorageError::NotFound(_)) => {
                return Err(WorkflowError::TemplateNotFound(updated.id));
            }
            Err(err) => return Err(err.into()),
        }
        tracing::info!(template_id = %updated.id, "Form template updated");
        Ok(updated)
    }

    pub async fn list_templates(&self) -> WorkflowResult<Vec<FormTemplate>> {
        Ok(self.storage.list_templates().await?)
    }

    // ── Definitions ──────────────────────────────────────────────────

    /// Validate and store a definition for a template that has none yet
    pub async fn create_definition(
        &self,
        actor: &Identity,
        definition: WorkflowDefinition,
    ) -> WorkflowResult<WorkflowDefinitionId> {
        self.require_admin(actor)?;

        if self
            .storage
            .get_template(&definition.form_template)
            .await?
            .is_none()
        {
            return Err(WorkflowError::TemplateNotFound(definition.form_template));
        }

        validator::validate(&definition, &self.config.validation_policy())?;

        let id = definition.id.clone();
        let template_id = definition.form_template.clone();
        let (states, transitions) = (definition.states.len(), definition.transitions.len());
        match self.storage.insert_definition(definition).await {
            Ok(()) => {}
            // one definition per template
            Err(StorageError::Conflict(_)) => {
                return Err(WorkflowError::DefinitionForTemplateExists(template_id));
            }
            Err(err) => return Err(err.into()),
        }
        tracing::info!(
            definition_id = %id,
            template_id = %template_id,
            states,
            transitions,
            "Workflow definition created"
        );
        Ok(id)
    }

    /// Validate and replace an existing definition.
    ///
    /// Running instances keep their `current_state` and ledger. If the new
    /// definition drops a state an instance sits in, that instance has no
    /// outgoing rules until an admin restores one.
    pub async fn update_definition(
        &self,
        actor: &Identity,
        definition: WorkflowDefinition,
    ) -> WorkflowResult<WorkflowDefinition> {
        self.require_admin(actor)?;

        let existing = self
            .storage
            .get_definition(&definition.id)
            .await?
            .ok_or_else(|| WorkflowError::definition_not_found(&definition.id))?;

        validator::validate(&definition, &self.config.validation_policy())?;

        let updated = WorkflowDefinition {
            created_at: existing.created_at,
            updated_at: chrono::Utc::now(),
            ..definition
        };
        self.storage.replace_definition(updated.clone()).await?;
        tracing::info!(definition_id = %updated.id, "Workflow definition updated");
        Ok(updated)
    }

    pub async fn list_definitions(
        &self,
        actor: &Identity,
    ) -> WorkflowResult<Vec<WorkflowDefinition>> {
        self.require_admin(actor)?;
        Ok(self.storage.list_definitions().await?)
    }

    async fn load_definition(&self, id: &WorkflowDefinitionId) -> WorkflowResult<WorkflowDefinition> {
        self.storage
            .get_definition(id)
            .await?
            .ok_or_else(|| WorkflowError::definition_not_found(id))
    }

    // ── Submissions ──────────────────────────────────────────────────

    /// Submit a filled-in form and start its workflow at the definition's
    /// initial state.
    pub async fn submit_form(
        &self,
        identity: &Identity,
        template_id: &FormTemplateId,
        data: Map<String, Value>,
    ) -> WorkflowResult<(SubmissionId, WorkflowInstanceId)> {
        let template = self
            .storage
            .get_template(template_id)
            .await?
            .ok_or_else(|| WorkflowError::TemplateNotFound(template_id.clone()))?;

        let missing = template.missing_required_fields(&data);
        if !missing.is_empty() {
            return Err(WorkflowError::MissingRequiredFields(missing));
        }

        let definition = self
            .storage
            .get_definition_for_template(template_id)
            .await?
            .ok_or_else(|| {
                WorkflowError::DefinitionNotFound(format!("for template {}", template_id))
            })?;
        let initial = definition
            .initial_state()
            .ok_or(WorkflowError::EmptyStates)?;

        let submission = FormSubmission::new(template_id.clone(), &identity.username, data);
        let instance = WorkflowInstance::new(definition.id.clone(), submission.id.clone(), initial);
        let ids = (submission.id.clone(), instance.id.clone());

        self.storage.insert_submission(submission, instance).await?;
        tracing::info!(
            submission_id = %ids.0,
            instance_id = %ids.1,
            username = %identity.username,
            state = %initial,
            "Form submitted"
        );
        Ok(ids)
    }

    /// Submissions made by `identity`, oldest first, each with the instance
    /// routing it
    pub async fn my_submissions(
        &self,
        identity: &Identity,
    ) -> WorkflowResult<Vec<(FormSubmission, WorkflowInstance)>> {
        let submissions = self.storage.list_submissions_by(&identity.username).await?;
        let mut mine = Vec::with_capacity(submissions.len());
        for submission in submissions {
            match self.storage.get_instance_for_submission(&submission.id).await? {
                Some(instance) => mine.push((submission, instance)),
                None => tracing::warn!(
                    submission_id = %submission.id,
                    "Submission has no workflow instance"
                ),
            }
        }
        Ok(mine)
    }

    pub async fn get_submission(&self, id: &SubmissionId) -> WorkflowResult<FormSubmission> {
        self.storage
            .get_submission(id)
            .await?
            .ok_or_else(|| WorkflowError::SubmissionNotFound(id.clone()))
    }

    // ── Instances ────────────────────────────────────────────────────

    pub async fn get_instance(&self, id: &WorkflowInstanceId) -> WorkflowResult<WorkflowInstance> {
        self.storage
            .get_instance(id)
            .await?
            .ok_or_else(|| WorkflowError::InstanceNotFound(id.clone()))
    }

    pub async fn instance_for_submission(
        &self,
        submission: &SubmissionId,
    ) -> WorkflowResult<WorkflowInstance> {
        self.storage
            .get_instance_for_submission(submission)
            .await?
            .ok_or_else(|| WorkflowError::SubmissionNotFound(submission.clone()))
    }

    /// Attempt to move an instance to `target` on behalf of `identity`.
    ///
    /// Load, evaluate and persist happen under the instance's lock, on a
    /// private copy. If the write fails the copy is dropped and the stored
    /// instance is exactly as it was.
    pub async fn attempt_transition(
        &self,
        instance_id: &WorkflowInstanceId,
        target: &str,
        identity: &Identity,
    ) -> WorkflowResult<TransitionOutcome> {
        let guard = self.locks.acquire(instance_id).await;
        let result = self.attempt_locked(instance_id, target, identity).await;
        drop(guard);
        self.locks.release(instance_id).await;
        result
    }

    async fn attempt_locked(
        &self,
        instance_id: &WorkflowInstanceId,
        target: &str,
        identity: &Identity,
    ) -> WorkflowResult<TransitionOutcome> {
        let mut instance = self.get_instance(instance_id).await?;
        let definition = self.load_definition(&instance.definition_id).await?;
        let loaded_revision = instance.revision;

        let outcome =
            self.committer
                .attempt_transition(&mut instance, &definition, target, identity)?;

        if instance.revision != loaded_revision {
            if let Err(err) = self.storage.save_instance(instance, loaded_revision).await {
                tracing::error!(
                    instance_id = %instance_id,
                    to = %target,
                    username = %identity.username,
                    error = %err,
                    "Failed to persist transition"
                );
                return Err(err.into());
            }
        }

        Ok(outcome)
    }

    /// Rules out of the instance's current state that `identity` may act on
    pub async fn available_transitions(
        &self,
        instance_id: &WorkflowInstanceId,
        identity: &Identity,
    ) -> WorkflowResult<Vec<TransitionRule>> {
        let instance = self.get_instance(instance_id).await?;
        let definition = self.load_definition(&instance.definition_id).await?;
        Ok(self
            .queries
            .available_transitions(&instance, &definition, identity)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Instances currently waiting on an action `identity` may take
    pub async fn pending_for(&self, identity: &Identity) -> WorkflowResult<Vec<WorkflowInstance>> {
        let instances = self.storage.list_instances().await?;
        let definitions: HashMap<_, _> = self
            .storage
            .list_definitions()
            .await?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();

        Ok(self
            .queries
            .pending_for(identity, &instances, |id| definitions.get(id))
            .into_iter()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use serde_json::json;

    fn admin() -> Identity {
        Identity::new("root", ["Admin"])
    }

    fn data(value: serde_json::Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn service() -> FormflowService<InMemoryStorage> {
        FormflowService::new(Arc::new(InMemoryStorage::new()), EngineConfig::default())
    }

    /// Expense template with Draft -> Submitted (Employee), then
    /// Submitted -> Approved needing both Manager and Finance.
    async fn expense_setup(
        svc: &FormflowService<InMemoryStorage>,
    ) -> (FormTemplateId, WorkflowDefinitionId) {
        let template =
            FormTemplate::new("Expense").with_field(FieldSpec::required("amount").with_type("number"));
        let template_id = svc.create_template(&admin(), template).await.unwrap();

        let definition =
            WorkflowDefinition::new(template_id.clone(), ["Draft", "Submitted", "Approved", "Rejected"])
                .with_transition(TransitionRule::any_of("Draft", "Submitted", ["Employee"]))
                .with_transition(TransitionRule::all_of(
                    "Submitted",
                    "Approved",
                    ["Manager", "Finance"],
                ))
                .with_transition(TransitionRule::any_of(
                    "Submitted",
                    "Rejected",
                    ["Manager", "Finance"],
                ));
        let definition_id = svc.create_definition(&admin(), definition).await.unwrap();
        (template_id, definition_id)
    }

    async fn submitted(svc: &FormflowService<InMemoryStorage>) -> WorkflowInstanceId {
        let (template_id, _) = expense_setup(svc).await;
        let employee = Identity::new("erin", ["Employee"]);
        let (_, instance_id) = svc
            .submit_form(&employee, &template_id, data(json!({ "amount": 42 })))
            .await
            .unwrap();
        svc.attempt_transition(&instance_id, "Submitted", &employee)
            .await
            .unwrap();
        instance_id
    }

    #[tokio::test]
    async fn test_admin_operations_require_admin_role() {
        let svc = service();
        let user = Identity::new("erin", ["Employee"]);

        let result = svc.create_template(&user, FormTemplate::new("Expense")).await;
        assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));

        let result = svc.list_definitions(&user).await;
        assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_configured_admin_roles() {
        let config = EngineConfig {
            admin_roles: vec!["Ops".into()],
            ..Default::default()
        };
        let svc = FormflowService::new(Arc::new(InMemoryStorage::new()), config);

        let ops = Identity::new("o", ["Ops"]);
        assert!(svc.create_template(&ops, FormTemplate::new("T")).await.is_ok());
        let result = svc.create_template(&admin(), FormTemplate::new("U")).await;
        assert!(matches!(result, Err(WorkflowError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_template_names_are_unique() {
        let svc = service();
        svc.create_template(&admin(), FormTemplate::new("Expense"))
            .await
            .unwrap();
        let result = svc.create_template(&admin(), FormTemplate::new("Expense")).await;
        assert!(matches!(result, Err(WorkflowError::DuplicateTemplateName(_))));
        assert_eq!(svc.list_templates().await.unwrap().len(), 1);

        let leave = svc
            .create_template(&admin(), FormTemplate::new("Leave"))
            .await
            .unwrap();
        let clash = FormTemplate::new("Expense").with_id(leave);
        let result = svc.update_template(&admin(), clash).await;
        assert!(matches!(result, Err(WorkflowError::DuplicateTemplateName(_))));
    }

    #[tokio::test]
    async fn test_update_template_keeps_creation_time() {
        let svc = service();
        let original = FormTemplate::new("Expense");
        let created_at = original.created_at;
        let id = svc.create_template(&admin(), original).await.unwrap();

        let renamed = FormTemplate::new("Expenses").with_id(id.clone());
        let updated = svc.update_template(&admin(), renamed).await.unwrap();
        assert_eq!(updated.name, "Expenses");
        assert_eq!(updated.created_at, created_at);

        let missing = FormTemplate::new("Other");
        let result = svc.update_template(&admin(), missing).await;
        assert!(matches!(result, Err(WorkflowError::TemplateNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_definition_validates() {
        let svc = service();
        let template_id = svc
            .create_template(&admin(), FormTemplate::new("Expense"))
            .await
            .unwrap();

        let bad = WorkflowDefinition::new(template_id.clone(), ["Draft"])
            .with_transition(TransitionRule::any_of("Draft", "Nowhere", ["X"]));
        let result = svc.create_definition(&admin(), bad).await;
        assert!(matches!(result, Err(WorkflowError::UnknownState(_))));

        let unbound = WorkflowDefinition::new(FormTemplateId::new("missing"), ["Draft"]);
        let result = svc.create_definition(&admin(), unbound).await;
        assert!(matches!(result, Err(WorkflowError::TemplateNotFound(_))));
    }

    #[tokio::test]
    async fn test_one_definition_per_template() {
        let svc = service();
        let (template_id, _) = expense_setup(&svc).await;

        let second = WorkflowDefinition::new(template_id.clone(), ["Open", "Closed"]);
        let result = svc.create_definition(&admin(), second).await;
        assert!(matches!(
            result,
            Err(WorkflowError::DefinitionForTemplateExists(ref t)) if *t == template_id
        ));
        assert_eq!(svc.list_definitions(&admin()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_instance_locks_are_released() {
        let svc = service();
        let (template_id, _) = expense_setup(&svc).await;
        let employee = Identity::new("erin", ["Employee"]);
        let outsider = Identity::new("olly", ["Guest"]);

        for _ in 0..50 {
            let (_, instance_id) = svc
                .submit_form(&employee, &template_id, data(json!({ "amount": 5 })))
                .await
                .unwrap();
            svc.attempt_transition(&instance_id, "Submitted", &employee)
                .await
                .unwrap();
            let refused = svc
                .attempt_transition(&instance_id, "Approved", &outsider)
                .await;
            assert!(refused.is_err());
        }
        let missing = svc
            .attempt_transition(&WorkflowInstanceId::new("nope"), "X", &employee)
            .await;
        assert!(missing.is_err());

        assert!(svc.locks.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_definition() {
        let svc = service();
        let (template_id, definition_id) = expense_setup(&svc).await;

        let replacement = WorkflowDefinition::new(template_id, ["Draft", "Done"])
            .with_id(definition_id.clone())
            .with_transition(TransitionRule::any_of("Draft", "Done", ["Employee"]));
        let updated = svc.update_definition(&admin(), replacement).await.unwrap();
        assert_eq!(updated.states, vec!["Draft", "Done"]);

        let listed = svc.list_definitions(&admin()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].transitions.len(), 1);
    }

    #[tokio::test]
    async fn test_submit_form_starts_at_initial_state() {
        let svc = service();
        let (template_id, definition_id) = expense_setup(&svc).await;
        let employee = Identity::new("erin", ["Employee"]);

        let (submission_id, instance_id) = svc
            .submit_form(&employee, &template_id, data(json!({ "amount": 10 })))
            .await
            .unwrap();

        let instance = svc.get_instance(&instance_id).await.unwrap();
        assert_eq!(instance.current_state, "Draft");
        assert_eq!(instance.definition_id, definition_id);
        assert!(instance.pending_approvals.is_empty());

        let submission = svc.get_submission(&submission_id).await.unwrap();
        assert_eq!(submission.submitted_by, "erin");
        assert_eq!(
            svc.instance_for_submission(&submission_id).await.unwrap().id,
            instance_id
        );
        let mine = svc.my_submissions(&employee).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].0.id, submission_id);
        assert_eq!(mine[0].1.id, instance_id);
        assert_eq!(mine[0].1.current_state, "Draft");
    }

    #[tokio::test]
    async fn test_submit_form_rejects_missing_fields() {
        let svc = service();
        let (template_id, _) = expense_setup(&svc).await;
        let employee = Identity::new("erin", ["Employee"]);

        let result = svc
            .submit_form(&employee, &template_id, data(json!({ "amount": 0 })))
            .await;
        match result {
            Err(WorkflowError::MissingRequiredFields(fields)) => assert_eq!(fields, vec!["amount"]),
            other => panic!("expected MissingRequiredFields, got {:?}", other),
        }
        assert!(svc.my_submissions(&employee).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_form_needs_definition() {
        let svc = service();
        let template_id = svc
            .create_template(&admin(), FormTemplate::new("Orphan"))
            .await
            .unwrap();
        let result = svc
            .submit_form(&Identity::new("e", ["Employee"]), &template_id, Map::new())
            .await;
        assert!(matches!(result, Err(WorkflowError::DefinitionNotFound(_))));
    }

    #[tokio::test]
    async fn test_all_quorum_through_service() {
        let svc = service();
        let instance_id = submitted(&svc).await;
        let manager = Identity::new("mia", ["Manager"]);
        let finance = Identity::new("fred", ["Finance"]);

        let outcome = svc
            .attempt_transition(&instance_id, "Approved", &manager)
            .await
            .unwrap();
        assert!(matches!(outcome, TransitionOutcome::Pending(_)));

        let again = svc
            .attempt_transition(&instance_id, "Approved", &manager)
            .await
            .unwrap();
        assert_eq!(again, TransitionOutcome::AlreadyApproved);

        let outcome = svc
            .attempt_transition(&instance_id, "Approved", &finance)
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Committed("Approved".into()));

        let instance = svc.get_instance(&instance_id).await.unwrap();
        assert_eq!(instance.current_state, "Approved");
        assert!(instance.pending_approvals.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_attempt_leaves_instance_untouched() {
        let svc = service();
        let instance_id = submitted(&svc).await;
        let before = svc.get_instance(&instance_id).await.unwrap();

        let outsider = Identity::new("olly", ["Employee"]);
        let result = svc
            .attempt_transition(&instance_id, "Approved", &outsider)
            .await;
        assert!(matches!(result, Err(WorkflowError::Forbidden { .. })));

        let result = svc
            .attempt_transition(&instance_id, "Draft", &outsider)
            .await;
        assert!(matches!(result, Err(WorkflowError::InvalidTransition { .. })));

        let after = svc.get_instance(&instance_id).await.unwrap();
        assert_eq!(after.revision, before.revision);
        assert_eq!(after.current_state, "Submitted");
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let svc = service();
        let result = svc
            .attempt_transition(&WorkflowInstanceId::new("nope"), "X", &admin())
            .await;
        assert!(matches!(result, Err(WorkflowError::InstanceNotFound(_))));
    }

    #[tokio::test]
    async fn test_available_transitions_and_pending_for() {
        let svc = service();
        let instance_id = submitted(&svc).await;

        let manager = Identity::new("mia", ["Manager"]);
        let rules = svc
            .available_transitions(&instance_id, &manager)
            .await
            .unwrap();
        let targets: Vec<_> = rules.iter().map(|r| r.to_state.as_str()).collect();
        assert_eq!(targets, vec!["Approved", "Rejected"]);

        let pending = svc.pending_for(&manager).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, instance_id);

        let employee = Identity::new("erin", ["Employee"]);
        assert!(svc.pending_for(&employee).await.unwrap().is_empty());
    }
}
