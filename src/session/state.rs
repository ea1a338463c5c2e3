use crate::role::Role;
use crate::types::{FederatedIdentity, UserProfile};

/// Current authentication state of the client.
///
/// A profile is only ever carried by `Authenticated`, and the manager only
/// enters that state after storing a non-empty credential.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Unauthenticated,
    /// An auth request (login, registration, restore) is in flight.
    Authenticating,
    Authenticated(UserProfile),
    /// Federated sign-in succeeded but the account does not exist yet.
    AwaitingRoleSelection(FederatedIdentity),
    /// The last auth request failed; holds the inline error message.
    AuthError(String),
}

impl Session {
    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile().map(|p| p.role)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Whether the UI should show a loading indicator instead of gated content.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Authenticating)
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::AuthError(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Outcome of a federated (Google) login attempt that did not hard-fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleLogin {
    /// Existing account; the session is now authenticated.
    Authenticated(UserProfile),
    /// Unknown account; the user must pick a role and call
    /// [`SessionManager::complete_google_profile`](super::SessionManager::complete_google_profile).
    NeedsRoleSelection(FederatedIdentity),
}
