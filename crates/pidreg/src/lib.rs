//! PID registry service layer: configuration, logging, persistence seams,
//! caching, the registration queue, and the networked search backend,
//! composed into [`service::IdentifierService`].

pub mod actor;
pub mod backend;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod link_check;
pub mod logging;
pub mod projection;
pub mod queue;
pub mod registration;
pub mod reindex;
pub mod repository;
pub mod service;

mod transport;

pub use pidreg_core as core;

///
/// Prelude
///
/// Service vocabulary only.
///

pub mod prelude {
    pub use crate::{
        actor::{Actor, ClientCredentials, Role},
        config::Config,
        repository::{IdentifierRepository, OwnerDirectory},
        service::{Committed, IdentifierInput, IdentifierService, ServiceParts},
    };
    pub use pidreg_core::prelude::*;
}
