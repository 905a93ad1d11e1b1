//! Module: registration
//! Responsibility: binding identifiers to resolution URLs at the external
//! handle registry, asynchronously and at least once.
//! Does not own: queueing or redelivery; see `queue`.

mod dispatcher;
mod http;
mod memory;
mod registry;
mod task;
mod worker;

pub use dispatcher::RegistrationDispatcher;
pub use http::{HttpRegistry, bind_body, interpret_bind, interpret_fetch};
pub use memory::{MemoryRegistry, RegistryCall};
pub use registry::ResolutionRegistry;
pub use task::{RegistrationTask, TaskId, TaskKind};
pub use worker::RegistrationWorker;
