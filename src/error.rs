//! Error taxonomy for the authorization chain.
//!
//! Every variant is scoped to a single request and folds into the
//! `Unauthenticated` decision at the chain level; nothing here is fatal
//! to the process. No retries are attempted anywhere in this crate.

use thiserror::Error;

/// Failure to resolve a signing key from the identity provider.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Network or body-decode failure while fetching the key set.
    #[error("key set fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The configured provider URL does not parse.
    #[error("invalid key set endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// The key set contains no key with the requested identifier,
    /// even after a fresh fetch.
    #[error("no public key found with kid {0}")]
    NotFound(String),

    /// The key entry's `kty` is neither RSA nor EC.
    #[error("no support for keys of type {0}")]
    UnsupportedKeyType(String),

    /// The EC key names a curve outside P-224/P-256/P-384/P-521.
    #[error("EC curve not supported: {0}")]
    UnsupportedCurve(String),

    /// The key entry's material does not decode into a usable key.
    #[error("invalid key material for kid {kid}: {reason}")]
    InvalidKeyMaterial {
        /// Identifier of the offending key entry.
        kid: String,
        /// Underlying decode failure.
        reason: String,
    },
}

/// Failure to turn an `Authorization` header value into verified claims.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The header is not exactly `"<scheme> <token>"`.
    #[error("incomplete authorization header")]
    MalformedHeader,

    /// The token is not a parsable compact JWS, or its protected
    /// header carries no key identifier.
    #[error("token not decodable: {0}")]
    MalformedToken(String),

    /// The signing key could not be resolved.
    #[error("key resolution failed: {0}")]
    KeyResolution(#[from] KeyError),

    /// The signature does not verify against the resolved key.
    #[error("signature verification failed: {0}")]
    InvalidSignature(String),

    /// The payload does not deserialize into the expected claim set.
    #[error("claim decoding failed: {0}")]
    ClaimDecode(String),

    /// The token's `exp` is in the past.
    #[error("token expired")]
    Expired,
}

/// Configuration loading failure.
#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub(crate) String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_errors_render_their_messages() {
        assert_eq!(
            KeyError::NotFound("abc".to_string()).to_string(),
            "no public key found with kid abc"
        );
        assert_eq!(
            KeyError::UnsupportedKeyType("oct".to_string()).to_string(),
            "no support for keys of type oct"
        );
        assert_eq!(
            KeyError::UnsupportedCurve("P-999".to_string()).to_string(),
            "EC curve not supported: P-999"
        );
    }

    #[test]
    fn token_error_wraps_key_error() {
        let err = TokenError::from(KeyError::NotFound("1".to_string()));
        assert_eq!(
            err.to_string(),
            "key resolution failed: no public key found with kid 1"
        );
    }
}
