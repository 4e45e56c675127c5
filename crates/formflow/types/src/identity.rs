//! Requesting identities
//!
//! The engine never verifies credentials. Whatever sits in front of it
//! exchanges a bearer token for a username and a set of role claims and
//! hands that pair over with every request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A pre-verified caller: a stable username plus role claims
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Identity {
    pub fn new<I, R>(username: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            username: username.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// True if this identity holds at least one of `roles`
    pub fn has_any_role<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        roles.into_iter().any(|r| self.roles.contains(r))
    }

    /// The subset of `roles` this identity holds
    pub fn roles_within(&self, roles: &BTreeSet<String>) -> BTreeSet<String> {
        self.roles.intersection(roles).cloned().collect()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.username)
    }
}
