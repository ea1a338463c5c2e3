use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::navigation::Route;

/// Client-side role of a DisasterConnect account.
///
/// The set is closed. Server role strings enter through [`Role::from_server`]
/// only, so holding a `Role` proves the server value was recognized. Serde
/// goes through the same mapping, which means a persisted profile with an
/// unknown role fails to deserialize instead of being coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    Citizen,
    Organization,
    Volunteer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Citizen, Role::Organization, Role::Volunteer];

    /// Maps a server role string to the client enum.
    ///
    /// Matching ignores ASCII case and surrounding whitespace. The server
    /// historically says `civilian` for citizens; both spellings are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RoleMapping`] for anything outside the synonym table.
    pub fn from_server(raw: &str) -> Result<Self, Error> {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "citizen" | "civilian" => Ok(Self::Citizen),
            "volunteer" => Ok(Self::Volunteer),
            "organization" | "organisation" => Ok(Self::Organization),
            _ => Err(Error::RoleMapping(raw.to_owned())),
        }
    }

    /// The role string the identity API expects in request payloads.
    #[must_use]
    pub fn as_server_str(self) -> &'static str {
        match self {
            Self::Citizen => "civilian",
            Self::Organization => "organization",
            Self::Volunteer => "volunteer",
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Citizen => "Citizen",
            Self::Organization => "Organization",
            Self::Volunteer => "Volunteer",
        }
    }

    /// Where the user lands after signing in with this role.
    #[must_use]
    pub fn home_route(self) -> Route {
        match self {
            Self::Citizen => Route::CitizenHome,
            Self::Organization => Route::OrganizationHome,
            Self::Volunteer => Route::VolunteerHome,
        }
    }

    pub(crate) fn bit(self) -> u8 {
        match self {
            Self::Citizen => 1,
            Self::Organization => 1 << 1,
            Self::Volunteer => 1 << 2,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_server(s)
    }
}

impl TryFrom<String> for Role {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_server(&s)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_server_str().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn civilian_maps_to_citizen() {
        assert_eq!(Role::from_server("civilian").unwrap(), Role::Citizen);
        assert_eq!(Role::from_server("citizen").unwrap(), Role::Citizen);
        assert_eq!(Role::from_server("civilian").unwrap().to_string(), "Citizen");
    }

    #[test]
    fn mapping_ignores_case_and_whitespace() {
        assert_eq!(Role::from_server(" Volunteer ").unwrap(), Role::Volunteer);
        assert_eq!(Role::from_server("ORGANIZATION").unwrap(), Role::Organization);
        assert_eq!(Role::from_server("organisation").unwrap(), Role::Organization);
    }

    #[test]
    fn unknown_roles_are_rejected() {
        for raw in ["admin", "", "citizens", "org", "volunteer_admin"] {
            match Role::from_server(raw) {
                Err(Error::RoleMapping(got)) => assert_eq!(got, raw),
                other => panic!("expected RoleMapping for {raw:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn server_vocabulary_maps_back_to_same_role() {
        for role in Role::ALL {
            assert_eq!(Role::from_server(role.as_server_str()).unwrap(), role);
        }
    }

    #[test]
    fn serde_uses_server_vocabulary() {
        let json = serde_json::to_string(&Role::Citizen).unwrap();
        assert_eq!(json, "\"civilian\"");
        let parsed: Role = serde_json::from_str("\"Citizen\"").unwrap();
        assert_eq!(parsed, Role::Citizen);
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }

    #[test]
    fn home_routes_are_distinct() {
        assert_eq!(Role::Citizen.home_route(), Route::CitizenHome);
        assert_eq!(Role::Organization.home_route(), Route::OrganizationHome);
        assert_eq!(Role::Volunteer.home_route(), Route::VolunteerHome);
    }
}
