//! Decoded identity claims.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Role list attached to one service (resource) or to the realm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRole {
    /// Role names granted within the scope.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Claim set of a verified Keycloak access token.
///
/// Constructed once per request by the decoder, immutable afterwards.
/// Every field is defaulted so partial tokens still decode; `exp == 0`
/// is an explicit no-expiry sentinel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeycloakClaims {
    /// Token identifier.
    pub jti: String,
    /// Expiry, epoch seconds; `0` means the token never expires.
    pub exp: i64,
    /// Not-before, epoch seconds.
    pub nbf: i64,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Issuer URL.
    pub iss: String,
    /// Subject, the provider-side user id.
    pub sub: String,
    /// Token type.
    pub typ: String,
    /// Authorized party.
    pub azp: String,
    /// Authentication time, epoch seconds.
    pub auth_time: i64,
    /// Provider session identifier.
    pub session_state: String,
    /// Authentication context class.
    pub acr: String,
    /// Origins allowed for this token.
    #[serde(rename = "allowed-origins")]
    pub allowed_origins: Vec<String>,
    /// Per-service role grants, keyed by service (resource) name.
    pub resource_access: HashMap<String, ServiceRole>,
    /// Display name.
    pub name: String,
    /// Preferred username; uid rules match against this.
    pub preferred_username: String,
    /// Given name.
    pub given_name: String,
    /// Family name.
    pub family_name: String,
    /// Email address.
    pub email: String,
    /// Realm-wide role grants.
    pub realm_access: ServiceRole,
}

impl KeycloakClaims {
    /// Whether the token's expiry has passed. `exp == 0` never expires.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.exp != 0 && Utc::now().timestamp() > self.exp
    }

    /// Whether `role` is granted for `service` in the resource-access map.
    #[must_use]
    pub fn has_service_role(&self, service: &str, role: &str) -> bool {
        self.resource_access
            .get(service)
            .is_some_and(|granted| granted.roles.iter().any(|r| r == role))
    }

    /// Whether `role` is granted realm-wide.
    #[must_use]
    pub fn has_realm_role(&self, role: &str) -> bool {
        self.realm_access.roles.iter().any(|r| r == role)
    }
}
