use std::borrow::Cow;

/// Notice shown on the login view after an unsolicited sign-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Notice {
    SessionExpired,
}

impl Notice {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::SessionExpired => "session_expired",
        }
    }
}

/// Views the session core may send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Route {
    Login,
    LoginWithNotice(Notice),
    CitizenHome,
    OrganizationHome,
    VolunteerHome,
    RoleSelection,
}

impl Route {
    /// Client-side path for this route.
    #[must_use]
    pub fn path(self) -> Cow<'static, str> {
        match self {
            Self::Login => Cow::Borrowed("/login"),
            Self::LoginWithNotice(notice) => Cow::Owned(format!(
                "/login?notice={}",
                urlencoding::encode(notice.code())
            )),
            Self::CitizenHome => Cow::Borrowed("/citizen/dashboard"),
            Self::OrganizationHome => Cow::Borrowed("/organization/dashboard"),
            Self::VolunteerHome => Cow::Borrowed("/volunteer/dashboard"),
            Self::RoleSelection => Cow::Borrowed("/select-role"),
        }
    }

    /// Whether this is one of the login views.
    #[must_use]
    pub fn is_login(self) -> bool {
        matches!(self, Self::Login | Self::LoginWithNotice(_))
    }
}

/// Routing layer of the embedding UI.
///
/// The session manager calls this after state transitions that move the
/// user: role home after sign-in, login after sign-out or registration,
/// role selection during federated signup.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: Route);
}

/// Navigator that ignores every request, for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(path = %route.path(), "Navigation ignored");
    }
}
