use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::role::Role;

/// Server-assigned user identifier (opaque string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct UserId(pub String);

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Bearer credential issued by the identity API.
///
/// Guaranteed non-empty by construction. `Debug` is redacted so the token
/// never ends up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Credential(String);

impl Credential {
    /// # Errors
    ///
    /// Returns [`Error::Credential`] if the token is empty or whitespace.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::Credential("empty bearer token".into()));
        }
        Ok(Self(token))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl TryFrom<String> for Credential {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Credential> for String {
    fn from(c: Credential) -> Self {
        c.0
    }
}

/// The signed-in user as the client sees it.
///
/// Persisted as `{id, email, name, role}` with `role` in server vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    pub role: Role,
}

/// Role-specific registration fields.
///
/// Serializes to one flat camelCase object, the `profileData` member of
/// registration and federated signup payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProfileData {
    #[serde(rename_all = "camelCase")]
    Citizen { location: String },
    #[serde(rename_all = "camelCase")]
    Volunteer {
        skills: Vec<String>,
        availability: String,
    },
    #[serde(rename_all = "camelCase")]
    Organization {
        organization_name: String,
        organization_type: String,
        contact_information: String,
    },
}

impl ProfileData {
    /// The role these fields belong to.
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Self::Citizen { .. } => Role::Citizen,
            Self::Volunteer { .. } => Role::Volunteer,
            Self::Organization { .. } => Role::Organization,
        }
    }

    /// Checks the fields belong to `role`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProfile`] on a role mismatch.
    pub fn ensure_role(&self, role: Role) -> Result<(), Error> {
        if self.role() == role {
            Ok(())
        } else {
            Err(Error::InvalidProfile(format!(
                "{} profile details cannot be used to register as {role}",
                self.role()
            )))
        }
    }
}

/// Identity handed back by the federated provider after the user signs in.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct FederatedIdentity {
    /// Provider-issued ID token, forwarded to `/auth/google`.
    pub id_token: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl FederatedIdentity {
    #[must_use]
    pub fn new(id_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
            email: None,
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
