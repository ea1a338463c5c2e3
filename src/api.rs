use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::Error;
use crate::role::Role;
use crate::types::{Credential, ProfileData, UserId, UserProfile};

const LOGIN_PATH: &str = "auth/login";
const REGISTER_PATH: &str = "auth/register";
const GOOGLE_PATH: &str = "auth/google";
const PROFILE_PATH: &str = "auth/profile";
const ROLE_PATH: &str = "auth/role";

/// DisasterConnect identity API configuration.
///
/// ```rust,ignore
/// let config = ApiConfig::new("https://api.disasterconnect.org/api/".parse()?)
///     .with_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ApiConfig {
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
}

impl ApiConfig {
    /// Endpoint paths are resolved relative to `base_url`; a missing trailing
    /// slash is added so `https://host/api` keeps its `/api` segment.
    #[must_use]
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            timeout: Duration::from_secs(30),
        }
    }

    /// Per-request timeout (default: 30 s).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves an API path such as `/auth/login` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("invalid endpoint {path:?}: {e}")))
    }
}

/// How a failing response from an endpoint is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointKind {
    /// login/register: 401 means bad credentials.
    Credentials,
    /// `/auth/google`: like `Credentials`, plus "user not found".
    Federated,
    /// Bearer-authenticated: 401 means the session is gone.
    Authorized,
}

/// `{success, message, error, data}` wrapper around every API reply.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<JsonValue>,
    #[serde(default)]
    data: Option<JsonValue>,
}

impl Envelope {
    /// `message`, falling back to a string `error` member.
    fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| {
            self.error
                .as_ref()
                .and_then(JsonValue::as_str)
                .map(str::to_owned)
        })
    }
}

/// Successful reply, with `data` still undecoded.
#[derive(Debug)]
pub(crate) struct Reply {
    pub(crate) message: Option<String>,
    data: Option<JsonValue>,
}

impl Reply {
    pub(crate) fn data<T: DeserializeOwned>(self, operation: &'static str) -> Result<T, Error> {
        let data = self.data.ok_or_else(|| Error::Api {
            operation,
            status: None,
            message: "response has no data".into(),
        })?;
        serde_json::from_value(data).map_err(|e| Error::Api {
            operation,
            status: None,
            message: format!("malformed response: {e}"),
        })
    }
}

/// User ids arrive as strings or numbers depending on the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for UserId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => UserId(s),
            WireId::Number(n) => UserId(n.to_string()),
        }
    }
}

/// User record as the identity API sends it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WireUser {
    id: WireId,
    #[serde(default)]
    email: String,
    #[serde(default, rename = "displayName", alias = "name")]
    display_name: Option<String>,
    role: String,
}

impl WireUser {
    /// The one place server users become [`UserProfile`]s.
    pub(crate) fn into_profile(self) -> Result<UserProfile, Error> {
        let role = Role::from_server(&self.role)?;
        Ok(UserProfile {
            id: self.id.into(),
            email: self.email,
            display_name: self.display_name.unwrap_or_default(),
            role,
        })
    }
}

/// `data` of login and federated login replies.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthData {
    pub(crate) token: String,
    pub(crate) user: WireUser,
}

/// `data` of profile and role-switch replies.
#[derive(Debug, Deserialize)]
pub(crate) struct UserData {
    #[serde(default)]
    pub(crate) token: Option<String>,
    pub(crate) user: WireUser,
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
    role: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
    role: &'static str,
    profile_data: &'a ProfileData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleBody<'a> {
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_data: Option<&'a ProfileData>,
}

#[derive(Debug, Serialize)]
struct RoleBody {
    role: &'static str,
}

/// HTTP client for the DisasterConnect identity API.
pub struct ApiClient {
    config: ApiConfig,
    http: reqwest::Client,
}

impl ApiClient {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `POST /auth/login`.
    pub(crate) async fn login(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<AuthData, Error> {
        let body = LoginBody {
            email,
            password,
            role: role.as_server_str(),
        };
        let request = self.request(Method::POST, LOGIN_PATH)?.json(&body);
        self.call(request, "login", EndpointKind::Credentials)
            .await?
            .data("login")
    }

    /// `POST /auth/register`. Returns the server's confirmation message.
    pub(crate) async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
        profile_data: &ProfileData,
    ) -> Result<Option<String>, Error> {
        let body = RegisterBody {
            email,
            password,
            name,
            role: role.as_server_str(),
            profile_data,
        };
        let request = self.request(Method::POST, REGISTER_PATH)?.json(&body);
        let reply = self
            .call(request, "registration", EndpointKind::Credentials)
            .await?;
        Ok(reply.message)
    }

    /// `POST /auth/google`. Without `signup` this is a plain federated login.
    pub(crate) async fn google(
        &self,
        id_token: &str,
        signup: Option<(Role, &ProfileData)>,
    ) -> Result<AuthData, Error> {
        let body = GoogleBody {
            token: id_token,
            role: signup.map(|(role, _)| role.as_server_str()),
            profile_data: signup.map(|(_, data)| data),
        };
        let request = self.request(Method::POST, GOOGLE_PATH)?.json(&body);
        self.call(request, "google login", EndpointKind::Federated)
            .await?
            .data("google login")
    }

    /// `GET /auth/profile`.
    pub(crate) async fn profile(&self, token: &Credential) -> Result<UserData, Error> {
        let request = self
            .request(Method::GET, PROFILE_PATH)?
            .bearer_auth(token.as_str());
        self.call(request, "profile fetch", EndpointKind::Authorized)
            .await?
            .data("profile fetch")
    }

    /// `PUT /auth/role`.
    pub(crate) async fn switch_role(
        &self,
        token: &Credential,
        role: Role,
    ) -> Result<UserData, Error> {
        let body = RoleBody {
            role: role.as_server_str(),
        };
        let request = self
            .request(Method::PUT, ROLE_PATH)?
            .bearer_auth(token.as_str())
            .json(&body);
        self.call(request, "role switch", EndpointKind::Authorized)
            .await?
            .data("role switch")
    }

    /// Any bearer-authenticated request. A 401 becomes [`Error::SessionExpired`].
    pub(crate) async fn authorized<B, T>(
        &self,
        method: Method,
        path: &str,
        token: &Credential,
        body: Option<&B>,
    ) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.request(method, path)?.bearer_auth(token.as_str());
        if let Some(body) = body {
            request = request.json(body);
        }
        self.call(request, "request", EndpointKind::Authorized)
            .await?
            .data("request")
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let url = self.config.endpoint(path)?;
        tracing::debug!(%method, %url, "Identity API request");
        Ok(self
            .http
            .request(method, url)
            .timeout(self.config.timeout))
    }

    /// Sends the request and maps the reply onto the error taxonomy.
    async fn call(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        kind: EndpointKind,
    ) -> Result<Reply, Error> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let envelope = serde_json::from_str::<Envelope>(&body).ok();
        let message = envelope.as_ref().and_then(Envelope::message);

        if !status.is_success() {
            return Err(classify_failure(operation, kind, Some(status), message, body));
        }

        let envelope = envelope.ok_or_else(|| Error::Api {
            operation,
            status: Some(status.as_u16()),
            message: "malformed response body".into(),
        })?;

        if envelope.success == Some(false) {
            return Err(classify_failure(operation, kind, None, message, body));
        }

        Ok(Reply {
            message,
            data: envelope.data,
        })
    }
}

fn classify_failure(
    operation: &'static str,
    kind: EndpointKind,
    status: Option<StatusCode>,
    message: Option<String>,
    body: String,
) -> Error {
    if kind == EndpointKind::Federated {
        // Only a client-side rejection can mean "unknown user"; a 5xx stays a hard failure.
        let not_found_message = status.is_none_or(|s| s.is_client_error())
            && message
                .as_deref()
                .is_some_and(|m| m.to_ascii_lowercase().contains("not found"));
        if status == Some(StatusCode::NOT_FOUND) || not_found_message {
            return Error::FederatedUserNotFound;
        }
    }

    match (kind, status) {
        (EndpointKind::Authorized, Some(StatusCode::UNAUTHORIZED)) => Error::SessionExpired,
        (EndpointKind::Credentials | EndpointKind::Federated, None)
        | (
            EndpointKind::Credentials | EndpointKind::Federated,
            Some(StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN),
        ) => Error::Credential(message.unwrap_or_default()),
        _ => Error::Api {
            operation,
            status: status.map(|s| s.as_u16()),
            message: message.unwrap_or(body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_path_prefix() {
        let config = ApiConfig::new("https://example.org/api".parse().unwrap());
        assert_eq!(
            config.endpoint("/auth/login").unwrap().as_str(),
            "https://example.org/api/auth/login"
        );
        assert_eq!(
            config.endpoint("auth/profile").unwrap().as_str(),
            "https://example.org/api/auth/profile"
        );
    }

    #[test]
    fn config_overrides() {
        let config = ApiConfig::new("https://example.org/".parse().unwrap())
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.base_url().as_str(), "https://example.org/");
    }

    #[test]
    fn wire_user_normalizes_role() {
        let user: WireUser = serde_json::from_value(serde_json::json!({
            "id": "1", "email": "a@b.com", "role": "civilian"
        }))
        .unwrap();
        let profile = user.into_profile().unwrap();
        assert_eq!(profile.role, Role::Citizen);
        assert_eq!(profile.id, UserId::from("1"));
        assert_eq!(profile.display_name, "");
    }

    #[test]
    fn wire_user_accepts_numeric_id_and_name_alias() {
        let user: WireUser = serde_json::from_value(serde_json::json!({
            "id": 7, "email": "o@b.com", "name": "Relief Org", "role": "organization"
        }))
        .unwrap();
        let profile = user.into_profile().unwrap();
        assert_eq!(profile.id, UserId::from("7"));
        assert_eq!(profile.display_name, "Relief Org");
    }

    #[test]
    fn wire_user_rejects_unknown_role() {
        let user: WireUser = serde_json::from_value(serde_json::json!({
            "id": "1", "email": "a@b.com", "role": "admin"
        }))
        .unwrap();
        assert!(matches!(user.into_profile(), Err(Error::RoleMapping(_))));
    }

    #[test]
    fn unauthorized_depends_on_endpoint() {
        let expired = classify_failure(
            "profile fetch",
            EndpointKind::Authorized,
            Some(StatusCode::UNAUTHORIZED),
            None,
            String::new(),
        );
        assert!(matches!(expired, Error::SessionExpired));

        let credential = classify_failure(
            "login",
            EndpointKind::Credentials,
            Some(StatusCode::UNAUTHORIZED),
            Some("Invalid password".into()),
            String::new(),
        );
        assert!(matches!(credential, Error::Credential(ref m) if m == "Invalid password"));
    }

    #[test]
    fn federated_not_found_variants() {
        let by_status = classify_failure(
            "google login",
            EndpointKind::Federated,
            Some(StatusCode::NOT_FOUND),
            None,
            String::new(),
        );
        assert!(matches!(by_status, Error::FederatedUserNotFound));

        let by_message = classify_failure(
            "google login",
            EndpointKind::Federated,
            None,
            Some("User not found".into()),
            String::new(),
        );
        assert!(matches!(by_message, Error::FederatedUserNotFound));

        let rejected = classify_failure(
            "google login",
            EndpointKind::Federated,
            Some(StatusCode::BAD_REQUEST),
            Some("User not found".into()),
            String::new(),
        );
        assert!(matches!(rejected, Error::FederatedUserNotFound));
    }

    #[test]
    fn federated_server_error_is_not_a_signup() {
        let err = classify_failure(
            "google login",
            EndpointKind::Federated,
            Some(StatusCode::INTERNAL_SERVER_ERROR),
            Some("record not found in cache".into()),
            String::new(),
        );
        assert!(matches!(
            err,
            Error::Api { status: Some(500), ref message, .. } if message == "record not found in cache"
        ));
    }

    #[test]
    fn envelope_accepts_message_and_error_together() {
        let envelope: Envelope = serde_json::from_value(serde_json::json!({
            "success": true,
            "message": "Welcome back",
            "error": null,
            "data": {"id": "1"}
        }))
        .unwrap();
        assert_eq!(envelope.message().as_deref(), Some("Welcome back"));
        assert_eq!(envelope.data, Some(serde_json::json!({"id": "1"})));

        let both: Envelope = serde_json::from_value(serde_json::json!({
            "success": false,
            "message": "Invalid credentials",
            "error": "Unauthorized"
        }))
        .unwrap();
        assert_eq!(both.message().as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn envelope_falls_back_to_error_member() {
        let envelope: Envelope = serde_json::from_value(serde_json::json!({
            "success": false,
            "error": "Email already registered"
        }))
        .unwrap();
        assert_eq!(envelope.success, Some(false));
        assert_eq!(envelope.message().as_deref(), Some("Email already registered"));

        let structured: Envelope = serde_json::from_value(serde_json::json!({
            "error": {"code": 42}
        }))
        .unwrap();
        assert_eq!(structured.message(), None);
    }

    #[test]
    fn server_errors_keep_status() {
        let err = classify_failure(
            "login",
            EndpointKind::Credentials,
            Some(StatusCode::INTERNAL_SERVER_ERROR),
            None,
            "boom".into(),
        );
        assert!(matches!(
            err,
            Error::Api { status: Some(500), ref message, .. } if message == "boom"
        ));
    }

    #[test]
    fn register_body_shape() {
        let data = ProfileData::Citizen {
            location: "Accra".into(),
        };
        let body = RegisterBody {
            email: "c@b.com",
            password: "pw",
            name: "Cee",
            role: Role::Citizen.as_server_str(),
            profile_data: &data,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "email": "c@b.com",
                "password": "pw",
                "name": "Cee",
                "role": "civilian",
                "profileData": {"location": "Accra"},
            })
        );
    }

    #[test]
    fn google_body_omits_signup_fields() {
        let body = GoogleBody {
            token: "gtok",
            role: None,
            profile_data: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"token": "gtok"})
        );
    }
}
