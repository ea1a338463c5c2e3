use crate::navigation::Route;
use crate::role::Role;
use crate::session::Session;

/// Set of roles allowed to view a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    #[must_use]
    pub fn all() -> Self {
        Role::ALL.into_iter().collect()
    }

    #[must_use]
    pub fn of(roles: &[Role]) -> Self {
        roles.iter().copied().collect()
    }

    #[must_use]
    pub fn with(mut self, role: Role) -> Self {
        self.insert(role);
        self
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    #[must_use]
    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        Self::EMPTY.with(role)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// Authorization decisions for role-scoped views.
///
/// Pure: no I/O, no state. Denied access always sends the user to the login
/// view, never to an error page.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleGate;

impl RoleGate {
    /// `true` iff the session is authenticated with a role in `required`.
    #[must_use]
    pub fn can_access(session: &Session, required: RoleSet) -> bool {
        session
            .profile()
            .is_some_and(|profile| required.contains(profile.role))
    }

    /// Routing helper: `Err(Route::Login)` when access is denied.
    ///
    /// # Errors
    ///
    /// Returns the login route to redirect to.
    pub fn check(session: &Session, required: RoleSet) -> Result<(), Route> {
        if Self::can_access(session, required) {
            Ok(())
        } else {
            Err(Route::Login)
        }
    }
}
