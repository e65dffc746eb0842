//! Passive data shapes for the identity provider's published key set,
//! and the construction of verification key material from one entry.

use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// One fetch of the realm's key set endpoint.
///
/// Transient: consumed to populate the resolver cache, never retained.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Certs {
    /// Keys currently in rotation, in publication order.
    #[serde(default)]
    pub keys: Vec<KeyEntry>,
}

/// One published key. Algorithm-specific material is base64url-encoded
/// big-endian integers, exactly as the provider serves it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyEntry {
    /// Key identifier, unique within one fetch.
    pub kid: String,
    /// Key type, `RSA` or `EC`.
    pub kty: String,
    /// Signature algorithm the provider advertises for this key.
    pub alg: String,
    /// Intended use; `sig` for the keys this crate consumes.
    #[serde(rename = "use")]
    pub key_use: String,
    /// Named curve, for EC keys.
    pub crv: String,
    /// EC x coordinate.
    pub x: String,
    /// EC y coordinate.
    pub y: String,
    /// RSA modulus.
    pub n: String,
    /// RSA public exponent.
    pub e: String,
    /// X.509 certificate chain; not used for verification here.
    pub x5c: Vec<String>,
}

/// Named curves accepted for EC keys.
const SUPPORTED_CURVES: [&str; 4] = ["P-224", "P-256", "P-384", "P-521"];

impl KeyEntry {
    /// Build verification key material from this entry.
    ///
    /// RSA keys are built from `n`/`e`, EC keys from `x`/`y` after the
    /// curve gate. `kty` and `crv` comparisons are case-insensitive.
    ///
    /// # Errors
    ///
    /// [`KeyError::UnsupportedKeyType`] for a `kty` other than RSA/EC,
    /// [`KeyError::UnsupportedCurve`] for a curve outside the supported
    /// set, [`KeyError::InvalidKeyMaterial`] when the components do not
    /// decode.
    pub fn decoding_key(&self) -> Result<DecodingKey, KeyError> {
        if self.kty.eq_ignore_ascii_case("RSA") {
            DecodingKey::from_rsa_components(&self.n, &self.e).map_err(|e| self.invalid(&e))
        } else if self.kty.eq_ignore_ascii_case("EC") {
            let crv = self.crv.to_ascii_uppercase();
            if !SUPPORTED_CURVES.contains(&crv.as_str()) {
                return Err(KeyError::UnsupportedCurve(self.crv.clone()));
            }
            DecodingKey::from_ec_components(&self.x, &self.y).map_err(|e| self.invalid(&e))
        } else {
            Err(KeyError::UnsupportedKeyType(self.kty.clone()))
        }
    }

    fn invalid(&self, err: &jsonwebtoken::errors::Error) -> KeyError {
        KeyError::InvalidKeyMaterial {
            kid: self.kid.clone(),
            reason: err.to_string(),
        }
    }
}
