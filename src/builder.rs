//! Fluent builder composing access rules into an authorization chain.

use tracing::warn;

use crate::access::{AccessPredicate, AccessTuple};
use crate::config::KeycloakConfig;
use crate::middleware::KeycloakAuth;

/// Accumulates access rules and builds the OR-composed chain.
///
/// Builder calls take the builder by value and return it, so rule
/// accumulation reads fluently and intermediate values never alias.
#[derive(Debug, Clone, Default)]
pub struct AccessBuilder {
    allowed_roles: Vec<AccessTuple>,
    allowed_uids: Vec<AccessTuple>,
    allowed_realms: Vec<String>,
    config: KeycloakConfig,
}

impl AccessBuilder {
    /// Start a builder for the given configuration.
    #[must_use]
    pub fn new(config: KeycloakConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Allow callers granted `role` on the configured service.
    #[must_use]
    pub fn restrict_but_for_role(mut self, role: impl Into<String>) -> Self {
        self.allowed_roles.push(AccessTuple {
            service: self.config.service.clone(),
            role: role.into(),
            uid: String::new(),
        });
        self
    }

    /// Allow callers whose preferred username equals `uid`.
    #[must_use]
    pub fn restrict_but_for_uid(mut self, uid: impl Into<String>) -> Self {
        self.allowed_uids.push(AccessTuple {
            service: self.config.service.clone(),
            role: String::new(),
            uid: uid.into(),
        });
        self
    }

    /// Allow callers granted `realm_role` realm-wide.
    #[must_use]
    pub fn restrict_but_for_realm(mut self, realm_role: impl Into<String>) -> Self {
        self.allowed_realms.push(realm_role.into());
        self
    }

    /// Compose the accumulated rules into one OR predicate wrapped in
    /// an authorization chain.
    ///
    /// With `disable_security_check` set, the chain allows every
    /// request unconditionally and a warning is logged.
    #[must_use]
    pub fn build(self) -> KeycloakAuth {
        if self.config.disable_security_check {
            warn!("access check is disabled, every request will be allowed");
            return KeycloakAuth::bypass(&self.config);
        }

        let predicate = AccessPredicate::Any(vec![
            AccessPredicate::Roles(self.allowed_roles),
            AccessPredicate::Uids(self.allowed_uids),
            AccessPredicate::Realm(self.allowed_realms),
        ]);
        KeycloakAuth::new(&self.config, vec![predicate])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> KeycloakConfig {
        KeycloakConfig {
            service: "orders".to_string(),
            ..KeycloakConfig::default()
        }
    }

    #[test]
    fn role_rules_are_scoped_to_the_configured_service() {
        let builder = AccessBuilder::new(config())
            .restrict_but_for_role("reader")
            .restrict_but_for_role("writer");

        assert_eq!(builder.allowed_roles.len(), 2);
        assert!(
            builder
                .allowed_roles
                .iter()
                .all(|t| t.service == "orders" && t.uid.is_empty())
        );
        assert_eq!(builder.allowed_roles[0].role, "reader");
        assert_eq!(builder.allowed_roles[1].role, "writer");
    }

    #[test]
    fn uid_and_realm_rules_accumulate_independently() {
        let builder = AccessBuilder::new(config())
            .restrict_but_for_uid("u123456")
            .restrict_but_for_realm("operator");

        assert_eq!(builder.allowed_uids.len(), 1);
        assert_eq!(builder.allowed_uids[0].uid, "u123456");
        assert!(builder.allowed_uids[0].role.is_empty());
        assert_eq!(builder.allowed_realms, vec!["operator".to_string()]);
        assert!(builder.allowed_roles.is_empty());
    }

    #[test]
    fn disable_security_check_builds_a_bypass_chain() {
        let chain = AccessBuilder::new(KeycloakConfig {
            disable_security_check: true,
            ..config()
        })
        .build();

        assert!(chain.is_bypass());
    }

    #[test]
    fn a_normal_build_is_not_a_bypass() {
        let chain = AccessBuilder::new(config())
            .restrict_but_for_role("reader")
            .build();
        assert!(!chain.is_bypass());
    }
}
