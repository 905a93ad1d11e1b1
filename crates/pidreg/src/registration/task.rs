use crate::actor::ClientCredentials;
use derive_more::Display;
use pidreg_core::types::Doi;
use ulid::Ulid;

///
/// TaskId
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TaskId(Ulid);

impl TaskId {
    /// Fresh id ordered by creation time.
    #[must_use]
    pub fn generate() -> Self {
        let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();

        Self(Ulid::from_parts(millis, rand::random()))
    }
}

///
/// TaskKind
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TaskKind {
    /// Bind the identifier to `url` at the resolution registry.
    Bind { url: String },
    /// Read the bound URL back and store it locally when it differs.
    RefreshUrl,
}

impl TaskKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "bind",
            Self::RefreshUrl => "refresh_url",
        }
    }
}

///
/// RegistrationTask
///
/// One unit of asynchronous registration work. `attempt` starts at 1 and is
/// bumped by the queue on each redelivery.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegistrationTask {
    pub id: TaskId,
    pub doi: Doi,
    pub kind: TaskKind,
    pub credentials: ClientCredentials,
    pub attempt: u32,
}

impl RegistrationTask {
    #[must_use]
    pub fn new(doi: Doi, kind: TaskKind, credentials: ClientCredentials) -> Self {
        Self {
            id: TaskId::generate(),
            doi,
            kind,
            credentials,
            attempt: 1,
        }
    }
}
