//! Bearer-token decoding: header extraction, signature verification,
//! claim deserialization, expiry enforcement.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, Header, Validation, errors::ErrorKind};
use tracing::warn;

use crate::claims::KeycloakClaims;
use crate::error::TokenError;
use crate::resolver::KeyResolver;

/// Decodes and verifies a bearer token end to end.
#[derive(Clone)]
pub struct ClaimDecoder {
    resolver: Arc<KeyResolver>,
}

impl ClaimDecoder {
    /// Create a decoder backed by the given key resolver.
    #[must_use]
    pub fn new(resolver: Arc<KeyResolver>) -> Self {
        Self { resolver }
    }

    /// Decode an `Authorization` header value into verified claims.
    ///
    /// # Errors
    ///
    /// A [`TokenError`] classifying the failure: header shape, token
    /// structure, key resolution, signature, payload schema, or expiry.
    pub async fn decode(&self, header_value: &str) -> Result<KeycloakClaims, TokenError> {
        let (_scheme, token) = split_authorization(header_value)?;

        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| TokenError::MalformedToken(e.to_string()))?;
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| TokenError::MalformedToken("no kid in token header".to_string()))?;

        let key = self.resolver.resolve(kid).await?;

        let data = jsonwebtoken::decode::<KeycloakClaims>(token, &key, &build_validation(&header))
            .map_err(classify)?;
        let claims = data.claims;

        if claims.is_expired() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// Split an authorization header value into its scheme and token parts.
///
/// The scheme is deliberately not compared against `Bearer`; any
/// two-part header is accepted.
fn split_authorization(value: &str) -> Result<(&str, &str), TokenError> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) => Ok((scheme, token)),
        _ => Err(TokenError::MalformedHeader),
    }
}

/// Build a [`Validation`] from the token's protected header.
///
/// Expiry is enforced by the caller (`exp == 0` is a no-expiry sentinel
/// the library-level check cannot express), so library validation of
/// `exp` and `aud` is turned off.
fn build_validation(header: &Header) -> Validation {
    let alg = match header.alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::ES256
        | Algorithm::ES384 => header.alg,
        other => {
            warn!(alg = ?other, "unsupported token algorithm, defaulting to RS256");
            Algorithm::RS256
        }
    };

    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Classify a verification failure into the token error taxonomy.
fn classify(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::Json(_) => TokenError::ClaimDecode(err.to_string()),
        ErrorKind::Base64(_) | ErrorKind::InvalidToken => TokenError::MalformedToken(err.to_string()),
        _ => TokenError::InvalidSignature(err.to_string()),
    }
}
