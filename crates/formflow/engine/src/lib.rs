//! Formflow transition engine
//!
//! Moves workflow instances between the states of their definition. Every
//! move is gated by the roles on the matching transition rule, and `ALL`
//! rules wait until every listed role has approved.
//!
//! # Architecture
//!
//! The [`FormflowService`] composes specialized components:
//!
//! - [`RuleEvaluator`]: rule lookup and role checks
//! - [`TransitionCommitter`]: the state machine; records approvals,
//!   evaluates quorum and commits
//! - [`InstanceQueryService`]: available transitions and pending work
//! - [`validator`]: structural checks on definitions before they are stored
//! - [`storage`]: async storage traits and [`InMemoryStorage`]
//! - [`InstanceLocks`]: one mutex per instance, so attempts on the same
//!   instance never interleave
//!
//! # Example
//!
//! ```rust
//! use formflow_engine::TransitionCommitter;
//! use formflow_types::*;
//!
//! let def = WorkflowDefinition::new(FormTemplateId::new("expense"), ["Submitted", "Approved"])
//!     .with_transition(TransitionRule::all_of("Submitted", "Approved", ["Manager", "Finance"]));
//! let mut instance = WorkflowInstance::new(def.id.clone(), SubmissionId::generate(), "Submitted");
//!
//! let committer = TransitionCommitter::new();
//! let manager = Identity::new("mia", ["Manager"]);
//! let finance = Identity::new("fred", ["Finance"]);
//!
//! let first = committer.attempt_transition(&mut instance, &def, "Approved", &manager).unwrap();
//! assert!(matches!(first, TransitionOutcome::Pending(_)));
//!
//! let second = committer.attempt_transition(&mut instance, &def, "Approved", &finance).unwrap();
//! assert_eq!(second, TransitionOutcome::Committed("Approved".into()));
//! assert!(instance.pending_approvals.is_empty());
//! ```

#![deny(unsafe_code)]

pub mod committer;
pub mod config;
pub mod definition_registry;
pub mod evaluator;
pub mod locks;
pub mod query;
pub mod service;
pub mod storage;
pub mod validator;

// Re-export main types
pub use committer::TransitionCommitter;
pub use config::{EngineConfig, FormflowConfig, LoggingConfig, StorageConfig};
pub use definition_registry::DefinitionRegistry;
pub use evaluator::RuleEvaluator;
pub use locks::InstanceLocks;
pub use query::InstanceQueryService;
pub use service::FormflowService;
pub use storage::{InMemoryStorage, Storage};
pub use validator::{validate, ValidationPolicy};
