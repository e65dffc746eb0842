//! Configuration for the authorization middleware.

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Middleware configuration.
///
/// Every field has a default, so a config file or environment only
/// needs to override what differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeycloakConfig {
    /// Base URL of the identity provider, e.g. `https://login.example.com`.
    pub url: String,

    /// Realm whose published keys verify incoming tokens.
    pub realm: String,

    /// Default service (resource) name scoping role rules added through
    /// the builder.
    pub service: String,

    /// Replaces the whole certs path on the provider, instead of the
    /// standard `{base path}/auth/realms/{realm}/protocol/openid-connect/certs`.
    pub full_certs_path: Option<String>,

    /// Escape hatch: skip every check and allow all requests.
    /// Logged at warn severity when active.
    pub disable_security_check: bool,

    /// Hard deadline for one authorization attempt, header extraction
    /// through rule evaluation.
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,

    /// How long fetched public keys are served from the cache before a
    /// refetch.
    #[serde(with = "humantime_serde")]
    pub key_cache_ttl: Duration,
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            realm: String::new(),
            service: String::new(),
            full_certs_path: None,
            disable_security_check: false,
            deadline: Duration::from_secs(30),
            key_cache_ttl: Duration::from_secs(8 * 60 * 60),
        }
    }
}

impl KeycloakConfig {
    /// Load configuration from an optional YAML file merged with
    /// `KEYCLOAK_GUARD_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or does not parse.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(ConfigError(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("KEYCLOAK_GUARD_").split("__"));

        figment.extract().map_err(|e| ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_documented_surface() {
        let config = KeycloakConfig::default();

        assert_eq!(config.deadline, Duration::from_secs(30));
        assert_eq!(config.key_cache_ttl, Duration::from_secs(8 * 60 * 60));
        assert!(!config.disable_security_check);
        assert!(config.full_certs_path.is_none());
    }

    #[test]
    fn yaml_overrides_defaults() {
        let config: KeycloakConfig = Figment::new()
            .merge(Yaml::string(
                r"
                url: https://login.example.com
                realm: master
                service: orders
                deadline: 5s
                key_cache_ttl: 1h
                ",
            ))
            .extract()
            .expect("config parses");

        assert_eq!(config.url, "https://login.example.com");
        assert_eq!(config.realm, "master");
        assert_eq!(config.service, "orders");
        assert_eq!(config.deadline, Duration::from_secs(5));
        assert_eq!(config.key_cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = KeycloakConfig::load(Some(Path::new("/nonexistent/guard.yaml")))
            .expect_err("missing file must fail");
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = KeycloakConfig::load(None).expect("defaults load");
        assert_eq!(config.deadline, Duration::from_secs(30));
    }
}
