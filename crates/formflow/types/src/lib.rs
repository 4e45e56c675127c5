//! Formflow domain types
//!
//! A form template describes the fields a submission must carry. A workflow
//! definition binds a flat state graph to one template: an ordered list of
//! named states plus role-gated transition rules between them. Each accepted
//! submission gets a workflow instance that walks that graph until it lands
//! in a state with no outgoing rules.
//!
//! # Key Concepts
//!
//! - **WorkflowDefinition**: ordered states (the first one is initial) and
//!   the transition rules that connect them.
//! - **TransitionRule**: a `from -> to` edge with the roles allowed to act
//!   on it and a [`QuorumMode`].
//! - **WorkflowInstance**: one submission's live position in the graph,
//!   owning its [`ApprovalLedger`].
//! - **ApprovalLedger**: who has approved each in-flight target state.
//! - **Identity**: a pre-verified username plus role claims, supplied per
//!   request and never cached.
//!
//! This crate holds data and the invariants local to each value. Rule
//! lookup, authorization and committing live in `formflow-engine`.

#![deny(unsafe_code)]

mod definition;
mod errors;
mod form;
mod identity;
mod instance;
mod ledger;
mod outcome;

pub use definition::*;
pub use errors::*;
pub use form::*;
pub use identity::*;
pub use instance::*;
pub use ledger::*;
pub use outcome::*;
