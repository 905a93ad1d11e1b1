//! Module: actor
//! Responsibility: the caller identity the service needs for visibility
//! and registration privilege checks.

use std::fmt;

///
/// Role
///
/// Ordered from least to most privileged.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Role {
    #[default]
    Anonymous,
    User,
    ClientAdmin,
    ProviderAdmin,
    StaffAdmin,
}

///
/// ClientCredentials
///
/// Basic-auth credentials of the owning repository account.
///

#[derive(Clone, Eq, PartialEq)]
pub struct ClientCredentials {
    pub username: String,
    pub password: String,
}

impl ClientCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

///
/// Actor
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Actor {
    pub role: Role,
    pub credentials: Option<ClientCredentials>,
}

impl Actor {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_role(role: Role) -> Self {
        Self {
            role,
            credentials: None,
        }
    }

    #[must_use]
    pub fn client_admin(credentials: ClientCredentials) -> Self {
        Self {
            role: Role::ClientAdmin,
            credentials: Some(credentials),
        }
    }

    /// Anonymous callers and plain users only see findable identifiers.
    #[must_use]
    pub fn sees_only_findable(&self) -> bool {
        self.role <= Role::User
    }

    /// Credentials usable for registry calls, when the role allows them.
    #[must_use]
    pub fn registration_credentials(&self) -> Option<&ClientCredentials> {
        (self.role >= Role::ClientAdmin)
            .then_some(self.credentials.as_ref())
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_requires_client_admin_and_credentials() {
        let creds = ClientCredentials::new("EXAMPLE.REPO", "secret");

        assert!(Actor::client_admin(creds.clone()).registration_credentials().is_some());
        assert!(Actor::with_role(Role::StaffAdmin).registration_credentials().is_none());
        let user = Actor {
            role: Role::User,
            credentials: Some(creds),
        };
        assert!(user.registration_credentials().is_none());
        assert!(user.sees_only_findable());
        assert!(!Actor::with_role(Role::ProviderAdmin).sees_only_findable());
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", ClientCredentials::new("a", "hunter2"));

        assert!(!rendered.contains("hunter2"));
    }
}
