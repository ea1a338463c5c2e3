use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use super::config::SessionConfig;
use super::state::{GoogleLogin, Session};
use super::traits::FederatedIdentityProvider;
use crate::api::ApiClient;
use crate::error::Error;
use crate::navigation::{Navigator, Notice, Route};
use crate::profile_cache::ProfileCache;
use crate::role::Role;
use crate::storage::DurableStorage;
use crate::token_store::TokenStore;
use crate::types::{Credential, FederatedIdentity, ProfileData, UserProfile};

/// Bookkeeping for in-flight auth operations.
///
/// `epoch` is bumped by every sign-out (explicit or forced). A response is
/// applied only if the epoch it started under is still current.
#[derive(Debug, Default)]
struct Control {
    epoch: u64,
    in_flight: Option<u64>,
}

/// Releases the in-flight slot when the operation finishes or its future is
/// dropped.
struct InFlight<'a> {
    control: &'a Mutex<Control>,
    epoch: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut control = self.control.lock();
        if control.in_flight == Some(self.epoch) {
            control.in_flight = None;
        }
    }
}

/// The single authority over session state.
///
/// Only this type talks to the identity API's auth endpoints and only it
/// changes the token store, the profile cache and the [`Session`].
pub struct SessionManager {
    api: ApiClient,
    tokens: TokenStore,
    profiles: ProfileCache,
    navigator: Arc<dyn Navigator>,
    session: watch::Sender<Session>,
    control: Mutex<Control>,
}

impl SessionManager {
    /// Builds the manager over shared durable storage.
    ///
    /// The session starts `Unauthenticated`; call
    /// [`restore_session`](Self::restore_session) before rendering gated views.
    pub fn new(
        config: SessionConfig,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let tokens = TokenStore::load(storage.clone(), config.token_key);
        let profiles = ProfileCache::load(storage, config.profile_key);

        if !tokens.is_authenticated() && profiles.get().is_some() {
            tracing::warn!("Persisted profile without a token; discarding it");
            profiles.clear();
        }

        let (session, _) = watch::channel(Session::Unauthenticated);
        Self {
            api: config.api,
            tokens,
            profiles,
            navigator,
            session,
            control: Mutex::new(Control::default()),
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Receiver that observes every session transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    #[must_use]
    pub fn profile_cache(&self) -> &ProfileCache {
        &self.profiles
    }

    // ── Email/password ─────────────────────────────────────────────

    /// Signs in with email and password and navigates to the role's home.
    ///
    /// # Errors
    ///
    /// [`Error::Credential`] or [`Error::Network`] for ordinary failures,
    /// [`Error::RoleMapping`] if the server role is unknown. None of these
    /// touch the token store or the profile cache; the session moves to
    /// `AuthError`. [`Error::OperationInProgress`], [`Error::Superseded`] and
    /// [`Error::InvalidState`] (already signed in) leave the session alone.
    pub async fn login(&self, email: &str, password: &str, role: Role) -> Result<Session, Error> {
        self.ensure_signed_out()?;
        let flight = self.begin()?;
        self.publish(Session::Authenticating);

        let result = async {
            let data = self.api.login(email, password, role).await?;
            let profile = data.user.into_profile()?;
            let token = Credential::new(data.token)?;
            Ok::<_, Error>((token, profile))
        }
        .await;

        match result {
            Ok((token, profile)) => self.establish(&flight, Some(token), profile, "login"),
            Err(e) => Err(self.fail(&flight, e)),
        }
    }

    /// Creates an account. Does not sign in; sends the user to the login view.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidProfile`] if `profile_data` belongs to another role
    /// (no request is made), [`Error::InvalidState`] when already signed in,
    /// otherwise the same failures as [`login`](Self::login).
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        role: Role,
        profile_data: &ProfileData,
    ) -> Result<(), Error> {
        profile_data.ensure_role(role)?;
        self.ensure_signed_out()?;

        let flight = self.begin()?;
        self.publish(Session::Authenticating);

        match self
            .api
            .register(email, password, name, role, profile_data)
            .await
        {
            Ok(message) => {
                self.commit(&flight, || self.publish(Session::Unauthenticated))?;
                tracing::info!(
                    role = %role,
                    message = message.as_deref().unwrap_or(""),
                    "Registration successful"
                );
                self.navigator.navigate(Route::Login);
                Ok(())
            }
            Err(e) => Err(self.fail(&flight, e)),
        }
    }

    // ── Federated ──────────────────────────────────────────────────

    /// Signs in through the federated provider.
    ///
    /// An identity the API does not know yet is not an error: the session
    /// moves to `AwaitingRoleSelection`, the user is sent to role selection
    /// and [`GoogleLogin::NeedsRoleSelection`] is returned.
    ///
    /// # Errors
    ///
    /// [`Error::Provider`] if the provider flow fails, otherwise as
    /// [`login`](Self::login).
    pub async fn login_with_google<P>(&self, provider: &P) -> Result<GoogleLogin, Error>
    where
        P: FederatedIdentityProvider,
    {
        self.ensure_signed_out()?;
        let flight = self.begin()?;
        self.publish(Session::Authenticating);

        let identity = match provider.sign_in().await {
            Ok(identity) => identity,
            Err(e) => return Err(self.fail(&flight, Error::Provider(e.to_string()))),
        };

        let result = async {
            let data = self.api.google(&identity.id_token, None).await?;
            let profile = data.user.into_profile()?;
            let token = Credential::new(data.token)?;
            Ok::<_, Error>((token, profile))
        }
        .await;

        match result {
            Ok((token, profile)) => {
                let profile = self
                    .establish(&flight, Some(token), profile, "google login")?
                    .profile()
                    .cloned()
                    .ok_or(Error::InvalidState("session not authenticated"))?;
                Ok(GoogleLogin::Authenticated(profile))
            }
            Err(Error::FederatedUserNotFound) => {
                self.commit(&flight, || {
                    self.publish(Session::AwaitingRoleSelection(identity.clone()));
                })?;
                tracing::info!("Federated identity not registered; awaiting role selection");
                self.navigator.navigate(Route::RoleSelection);
                Ok(GoogleLogin::NeedsRoleSelection(identity))
            }
            Err(e) => Err(self.fail(&flight, e)),
        }
    }

    /// Finishes a federated signup after role selection and signs in.
    ///
    /// Unlike [`register`](Self::register) this authenticates immediately.
    ///
    /// # Errors
    ///
    /// As [`register`](Self::register) and [`login`](Self::login).
    pub async fn complete_google_profile(
        &self,
        identity: &FederatedIdentity,
        role: Role,
        profile_data: &ProfileData,
    ) -> Result<Session, Error> {
        profile_data.ensure_role(role)?;
        self.ensure_signed_out()?;

        let flight = self.begin()?;
        self.publish(Session::Authenticating);

        let result = async {
            let data = self
                .api
                .google(&identity.id_token, Some((role, profile_data)))
                .await?;
            let profile = data.user.into_profile()?;
            let token = Credential::new(data.token)?;
            Ok::<_, Error>((token, profile))
        }
        .await;

        match result {
            Ok((token, profile)) => self.establish(&flight, Some(token), profile, "google signup"),
            Err(e) => Err(self.fail(&flight, e)),
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Validates the persisted token against the API.
    ///
    /// Call once at startup and keep gated content hidden until it returns.
    /// Any failure clears both the token and the cached profile.
    pub async fn restore_session(&self) -> Session {
        let flight = match self.begin() {
            Ok(flight) => flight,
            Err(_) => return self.session(),
        };

        let Some(token) = self.tokens.token() else {
            let _ = self.commit(&flight, || {
                self.profiles.clear();
                self.publish(Session::Unauthenticated);
            });
            return self.session();
        };

        self.publish(Session::Authenticating);

        let result = async {
            let data = self.api.profile(&token).await?;
            let refreshed = data.token.map(Credential::new).transpose()?;
            let profile = data.user.into_profile()?;
            Ok::<_, Error>((refreshed, profile))
        }
        .await;

        match result {
            Ok((refreshed, profile)) => self
                .apply_profile(&flight, refreshed, profile, "restore")
                .unwrap_or_else(|_| self.session()),
            Err(e) => {
                let _ = self.commit(&flight, || {
                    tracing::warn!(error = %e, "Session restore failed; clearing credentials");
                    self.tokens.clear_token();
                    self.profiles.clear();
                    self.publish(Session::Unauthenticated);
                });
                self.session()
            }
        }
    }

    /// Signs out. Safe to call in any state, including when already signed out.
    ///
    /// Any auth response still in flight is discarded when it arrives.
    pub fn logout(&self) -> Session {
        let was_authenticated = self.sign_out();
        if was_authenticated {
            tracing::info!("Logged out");
        }
        self.navigator.navigate(Route::Login);
        Session::Unauthenticated
    }

    /// Moves an `AuthError` session back to `Unauthenticated` once the user
    /// has seen the message.
    pub fn acknowledge_error(&self) {
        self.session.send_if_modified(|session| {
            if matches!(session, Session::AuthError(_)) {
                *session = Session::Unauthenticated;
                true
            } else {
                false
            }
        });
    }

    /// Changes the signed-in user's role.
    ///
    /// The cached profile is replaced; the token is replaced only if the
    /// server issues a new one.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when not signed in, [`Error::SessionExpired`]
    /// on a 401 (the session is torn down), [`Error::RoleMapping`] for an
    /// unknown server role. Other failures leave the session unchanged.
    pub async fn switch_role(&self, role: Role) -> Result<Session, Error> {
        if !self.session.borrow().is_authenticated() {
            return Err(Error::InvalidState("not signed in"));
        }
        let flight = self.begin()?;
        let token = self.tokens.token().ok_or(Error::SessionExpired)?;

        let result = async {
            let data = self.api.switch_role(&token, role).await?;
            let refreshed = data.token.map(Credential::new).transpose()?;
            let profile = data.user.into_profile()?;
            Ok::<_, Error>((refreshed, profile))
        }
        .await;

        match result {
            Ok((refreshed, profile)) => {
                self.commit(&flight, || self.profiles.clear())?;
                let session = self.apply_profile(&flight, refreshed, profile, "role switch")?;
                if let Some(role) = session.role() {
                    self.navigator.navigate(role.home_route());
                }
                Ok(session)
            }
            Err(Error::SessionExpired) => {
                self.expire(flight.epoch, &token);
                Err(Error::SessionExpired)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Role switch failed");
                Err(e)
            }
        }
    }

    // ── Authenticated requests ─────────────────────────────────────

    /// Sends a bearer-authenticated request and decodes the `data` member of
    /// the reply.
    ///
    /// # Errors
    ///
    /// [`Error::SessionExpired`] without a token, or when the API answers
    /// 401; in the latter case the session is signed out and the user is sent
    /// to the login view with a notice.
    pub async fn send_authorized<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let epoch = self.control.lock().epoch;
        let token = self.tokens.token().ok_or(Error::SessionExpired)?;

        match self.api.authorized(method, path, &token, body).await {
            Err(Error::SessionExpired) => {
                self.expire(epoch, &token);
                Err(Error::SessionExpired)
            }
            other => other,
        }
    }

    // ── Internals ──────────────────────────────────────────────────

    fn ensure_signed_out(&self) -> Result<(), Error> {
        if self.session.borrow().is_authenticated() {
            return Err(Error::InvalidState("already signed in"));
        }
        Ok(())
    }

    fn begin(&self) -> Result<InFlight<'_>, Error> {
        let mut control = self.control.lock();
        if control.in_flight == Some(control.epoch) {
            tracing::debug!("Auth request ignored: another one is in flight");
            return Err(Error::OperationInProgress);
        }
        control.in_flight = Some(control.epoch);
        Ok(InFlight {
            control: &self.control,
            epoch: control.epoch,
        })
    }

    /// Runs `apply` only if no sign-out happened since `flight` began.
    fn commit<T>(&self, flight: &InFlight<'_>, apply: impl FnOnce() -> T) -> Result<T, Error> {
        let control = self.control.lock();
        if control.epoch != flight.epoch {
            tracing::warn!(
                started = flight.epoch,
                current = control.epoch,
                "Discarding stale auth response"
            );
            return Err(Error::Superseded);
        }
        Ok(apply())
    }

    /// Stores token and profile together, authenticates and navigates home.
    fn establish(
        &self,
        flight: &InFlight<'_>,
        token: Option<Credential>,
        profile: UserProfile,
        operation: &'static str,
    ) -> Result<Session, Error> {
        let home = profile.role.home_route();
        let session = self.apply_profile(flight, token, profile, operation)?;
        self.navigator.navigate(home);
        Ok(session)
    }

    fn apply_profile(
        &self,
        flight: &InFlight<'_>,
        token: Option<Credential>,
        profile: UserProfile,
        operation: &'static str,
    ) -> Result<Session, Error> {
        self.commit(flight, || {
            if let Some(token) = token {
                self.tokens.set_token(token);
            }
            if !self.tokens.is_authenticated() {
                return Err(Error::SessionExpired);
            }
            tracing::info!(
                user_id = %profile.id,
                role = %profile.role,
                operation,
                "Session authenticated"
            );
            self.profiles.set(profile.clone());
            let session = Session::Authenticated(profile);
            self.publish(session.clone());
            Ok(session)
        })?
    }

    /// Records a failed auth operation. Stale failures are swallowed.
    fn fail(&self, flight: &InFlight<'_>, error: Error) -> Error {
        let message = error.user_message();
        match self.commit(flight, || self.publish(Session::AuthError(message))) {
            Ok(()) => {
                tracing::warn!(error = %error, "Authentication failed");
                error
            }
            Err(superseded) => superseded,
        }
    }

    /// Clears credentials and bumps the epoch. Returns whether a session existed.
    fn sign_out(&self) -> bool {
        let mut control = self.control.lock();
        self.sign_out_locked(&mut control)
    }

    fn sign_out_locked(&self, control: &mut Control) -> bool {
        control.epoch += 1;
        let was_authenticated = self.tokens.is_authenticated();
        self.tokens.clear_token();
        self.profiles.clear();
        self.publish(Session::Unauthenticated);
        was_authenticated
    }

    /// Forced sign-out after a 401, unless the session or its credential
    /// changed since the request started.
    fn expire(&self, epoch: u64, sent: &Credential) {
        {
            let mut control = self.control.lock();
            if control.epoch != epoch || self.tokens.token().as_ref() != Some(sent) {
                tracing::debug!("Ignoring 401 for a credential that is no longer current");
                return;
            }
            if self.sign_out_locked(&mut control) {
                tracing::warn!("Session expired; signing out");
            }
        }
        self.navigator
            .navigate(Route::LoginWithNotice(Notice::SessionExpired));
    }

    fn publish(&self, session: Session) {
        self.session.send_replace(session);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &*self.session.borrow())
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}
