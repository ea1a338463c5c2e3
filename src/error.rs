/// Errors surfaced by the session core.
///
/// Only [`Error::SessionExpired`] ever causes an unsolicited session
/// transition. Everything else is returned to the caller that started the
/// operation and is meant to be rendered inline via [`Error::user_message`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Bad email/password/role combination on an auth endpoint.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The identity API could not be reached.
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 401 on an authenticated request. The session has been torn down.
    #[error("Session expired")]
    SessionExpired,

    /// The server returned a role outside the known vocabulary.
    #[error("Unknown role: {0:?}")]
    RoleMapping(String),

    /// The federated identity provider failed or the user cancelled.
    #[error("Identity provider error: {0}")]
    Provider(String),

    /// Federated login for an identity the API has not seen yet.
    #[error("Federated user not registered")]
    FederatedUserNotFound,

    /// Registration profile fields do not match the selected role.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// Any other unsuccessful API response.
    #[error("{operation} failed ({status:?}): {message}")]
    Api {
        operation: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// Durable storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Another auth operation is still in flight.
    #[error("Another authentication request is already in progress")]
    OperationInProgress,

    /// The session changed while the request was in flight; its result was dropped.
    #[error("Response discarded: session changed while the request was in flight")]
    Superseded,

    /// The operation is not valid in the current session state.
    #[error("Invalid session state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    /// Human-readable message for inline display next to a form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Credential(msg) if !msg.is_empty() => msg.clone(),
            Self::Credential(_) => "Invalid email, password or role".into(),
            Self::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".into()
            }
            Self::SessionExpired => "Your session has expired. Please sign in again.".into(),
            Self::RoleMapping(_) => {
                "Your account has a role this app does not support. Contact support.".into()
            }
            Self::Provider(_) => "Google sign-in did not complete. Please try again.".into(),
            Self::FederatedUserNotFound => "Please choose a role to finish signing up.".into(),
            Self::InvalidProfile(msg) => msg.clone(),
            Self::Api { message, .. } if !message.is_empty() => message.clone(),
            Self::OperationInProgress => "Please wait for the current request to finish.".into(),
            Self::Api { .. }
            | Self::Storage(_)
            | Self::Config(_)
            | Self::Superseded
            | Self::InvalidState(_) => "Something went wrong. Please try again.".into(),
        }
    }

    /// Whether this error ended the session.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}
