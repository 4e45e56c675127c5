//! Storage layer for the engine
//!
//! Durable storage is an external concern. The traits here are the shape
//! the service needs; `InMemoryStorage` backs tests, the CLI and
//! single-process deployments.

mod memory;
mod traits;

pub use memory::InMemoryStorage;
pub use traits::{DefinitionStorage, InstanceStorage, Storage, SubmissionStorage, TemplateStorage};
