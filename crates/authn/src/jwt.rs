//! Signed identity assertions.
//!
//! An assertion is a short-lived RS256 JWT proving possession of the API
//! client's private key. It is exchanged once for an access token and then
//! discarded; every exchange signs a fresh one.
//!
//! Two claim-set shapes are supported:
//!
//! ```json
//! // Minimal: bearer of a direct token-exchange call
//! { "iss": "pure1:apikey:abc", "iat": 1700000000, "exp": 1700000010 }
//!
//! // Full: for endpoints that validate subject and audience
//! {
//!   "iss": "pure1:apikey:abc",
//!   "sub": "pure1:apikey:abc",
//!   "aud": "https://api.pure1.purestorage.com/oauth2/1.0/token",
//!   "iat": 1700000000,
//!   "exp": 1700000300
//! }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use pure1_authn::{ClaimSet, key::KeyLoader, jwt::AssertionSigner};
//!
//! # fn example() -> Result<(), pure1_authn::AuthError> {
//! let key = KeyLoader::terminal().load("pure1_rsa.pem", None)?;
//! let signer = AssertionSigner::new(&key, "pure1:apikey:abc", Duration::from_secs(10))?;
//! let assertion = signer.sign(ClaimSet::Minimal)?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};

use crate::{error::AuthError, key::SigningKey, validation::validate_algorithm};

/// Default lifetime of a minimal assertion.
pub const DEFAULT_MINIMAL_TTL: Duration = Duration::from_secs(10);

/// Default lifetime of a full assertion.
pub const DEFAULT_FULL_TTL: Duration = Duration::from_secs(300);

/// Shortest accepted assertion lifetime.
pub const MIN_ASSERTION_TTL: Duration = Duration::from_secs(5);

/// Longest accepted assertion lifetime.
pub const MAX_ASSERTION_TTL: Duration = Duration::from_secs(300);

/// Assertion claims as they appear on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer - the API client identifier (e.g. `pure1:apikey:abc`).
    pub iss: String,
    /// Subject - same identifier as `iss`; full shape only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Audience - token endpoint URL; full shape only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Issued at (seconds since epoch).
    pub iat: u64,
    /// Expiration time (seconds since epoch).
    pub exp: u64,
}

impl AssertionClaims {
    /// Lifetime in seconds (`exp - iat`).
    #[must_use]
    pub fn ttl_secs(&self) -> u64 {
        self.exp.saturating_sub(self.iat)
    }
}

/// Which claims an assertion carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimSet<'a> {
    /// `{iss, iat, exp}`.
    Minimal,
    /// `{iss, sub, aud, iat, exp}`.
    Full {
        /// Value of the `sub` claim.
        subject: &'a str,
        /// Value of the `aud` claim.
        audience: &'a str,
    },
}

/// Signs identity assertions with a loaded private key.
///
/// Signing is a pure function of `(key, claims)`. Failures are surfaced
/// immediately as [`AuthError::Signing`]; nothing is retried.
#[derive(Debug)]
pub struct AssertionSigner<'k> {
    key: &'k SigningKey,
    issuer: String,
    ttl: Duration,
}

impl<'k> AssertionSigner<'k> {
    /// Creates a signer for `issuer` producing assertions valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the issuer is empty or `ttl` lies
    /// outside [`MIN_ASSERTION_TTL`]..=[`MAX_ASSERTION_TTL`].
    pub fn new(
        key: &'k SigningKey,
        issuer: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, AuthError> {
        let issuer = issuer.into();
        if issuer.trim().is_empty() {
            return Err(AuthError::config("assertion issuer must not be empty"));
        }
        validate_ttl(ttl)?;
        Ok(Self { key, issuer, ttl })
    }

    /// Issuer placed in the `iss` claim.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Assertion lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Builds the claim set for an assertion issued at `issued_at`.
    #[must_use]
    pub fn claims_at(&self, issued_at: u64, claims: ClaimSet<'_>) -> AssertionClaims {
        let (sub, aud) = match claims {
            ClaimSet::Minimal => (None, None),
            ClaimSet::Full { subject, audience } => {
                (Some(subject.to_owned()), Some(audience.to_owned()))
            },
        };
        AssertionClaims {
            iss: self.issuer.clone(),
            sub,
            aud,
            iat: issued_at,
            exp: issued_at + self.ttl.as_secs(),
        }
    }

    /// Signs an assertion issued now.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the key cannot produce a signature.
    pub fn sign(&self, claims: ClaimSet<'_>) -> Result<String, AuthError> {
        let now = Utc::now().timestamp() as u64;
        self.sign_at(now, claims)
    }

    /// Signs an assertion issued at `issued_at` (seconds since epoch).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if the key cannot produce a signature.
    pub fn sign_at(&self, issued_at: u64, claims: ClaimSet<'_>) -> Result<String, AuthError> {
        let claims = self.claims_at(issued_at, claims);
        let header = Header::new(Algorithm::RS256);

        jsonwebtoken::encode(&header, &claims, self.key.encoding_key())
            .map_err(|e| AuthError::signing(e.to_string()))
    }
}

/// Checks that `ttl` is a usable assertion lifetime.
///
/// # Errors
///
/// Returns [`AuthError::Config`] if `ttl` is outside the accepted range.
pub fn validate_ttl(ttl: Duration) -> Result<(), AuthError> {
    if ttl < MIN_ASSERTION_TTL || ttl > MAX_ASSERTION_TTL {
        return Err(AuthError::config(format!(
            "assertion ttl must be between {}s and {}s, got {}s",
            MIN_ASSERTION_TTL.as_secs(),
            MAX_ASSERTION_TTL.as_secs(),
            ttl.as_secs()
        )));
    }
    Ok(())
}

/// Decode assertion header without verification.
///
/// # Errors
///
/// Returns an error if the JWT header cannot be decoded.
pub fn decode_assertion_header(token: &str) -> Result<Header, AuthError> {
    decode_header(token)
        .map_err(|e| AuthError::invalid_assertion(format!("Failed to decode JWT header: {}", e)))
}

/// Decode assertion claims without verification.
///
/// # Errors
///
/// Returns an error if:
/// - The JWT does not have exactly 3 parts
/// - The payload cannot be base64-decoded
/// - The payload cannot be parsed as JSON
/// - The `iss` claim is empty
pub fn decode_assertion_claims(token: &str) -> Result<AssertionClaims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::invalid_assertion("JWT must have 3 parts separated by dots"));
    }

    let payload_bytes = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|e| {
        AuthError::invalid_assertion(format!("Failed to decode JWT payload: {}", e))
    })?;

    let claims: AssertionClaims = serde_json::from_slice(&payload_bytes).map_err(|e| {
        AuthError::invalid_assertion(format!("Failed to parse JWT claims: {}", e))
    })?;

    if claims.iss.is_empty() {
        return Err(AuthError::invalid_assertion("Missing claim: iss"));
    }

    Ok(claims)
}

/// Verify an assertion signature with the signer's public key.
///
/// Only RS256 is accepted. Expiry is enforced; audience is not, since the
/// minimal shape carries none.
///
/// # Errors
///
/// Returns an error if the algorithm is not accepted, the signature does not
/// verify, or the assertion has expired.
pub fn verify_assertion(token: &str, key: &DecodingKey) -> Result<AssertionClaims, AuthError> {
    let header = decode_assertion_header(token)?;
    validate_algorithm(&format!("{:?}", header.alg))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.leeway = 0;

    let token_data = decode::<AssertionClaims>(token, key, &validation)?;

    Ok(token_data.claims)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::testutil::{RSA_PKCS8_PEM, RSA_PUBLIC_PEM, craft_raw_jwt};

    const ISSUER: &str = "pure1:apikey:dssf2331sd";
    const AUDIENCE: &str = "https://api.pure1.purestorage.com/oauth2/1.0/token";

    fn test_key() -> SigningKey {
        SigningKey::from_pem(RSA_PKCS8_PEM).unwrap()
    }

    fn payload_keys(token: &str) -> Vec<String> {
        let payload = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        let mut keys: Vec<String> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_minimal_assertion_has_exactly_three_claims() {
        let key = test_key();
        let signer = AssertionSigner::new(&key, ISSUER, Duration::from_secs(10)).unwrap();
        let token = signer.sign_at(1_700_000_000, ClaimSet::Minimal).unwrap();

        assert_eq!(payload_keys(&token), vec!["exp", "iat", "iss"]);
        let claims = decode_assertion_claims(&token).unwrap();
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp - claims.iat, 10);
    }

    #[test]
    fn test_full_assertion_has_exactly_five_claims() {
        let key = test_key();
        let signer = AssertionSigner::new(&key, ISSUER, Duration::from_secs(300)).unwrap();
        let token = signer
            .sign_at(1_700_000_000, ClaimSet::Full { subject: ISSUER, audience: AUDIENCE })
            .unwrap();

        assert_eq!(payload_keys(&token), vec!["aud", "exp", "iat", "iss", "sub"]);
        let claims = decode_assertion_claims(&token).unwrap();
        assert_eq!(claims.sub.as_deref(), Some(ISSUER));
        assert_eq!(claims.aud.as_deref(), Some(AUDIENCE));
        assert_eq!(claims.ttl_secs(), 300);
    }

    #[test]
    fn test_header_is_rs256_jwt() {
        let key = test_key();
        let signer = AssertionSigner::new(&key, ISSUER, DEFAULT_MINIMAL_TTL).unwrap();
        let token = signer.sign(ClaimSet::Minimal).unwrap();

        let header = decode_assertion_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
        assert!(header.kid.is_none());
    }

    #[test]
    fn test_rs256_signature_is_deterministic_for_fixed_claims() {
        let key = test_key();
        let signer = AssertionSigner::new(&key, ISSUER, DEFAULT_MINIMAL_TTL).unwrap();
        let a = signer.sign_at(1_700_000_000, ClaimSet::Minimal).unwrap();
        let b = signer.sign_at(1_700_000_000, ClaimSet::Minimal).unwrap();
        assert_eq!(a, b, "PKCS#1 v1.5 signatures are deterministic");
    }

    #[test]
    fn test_sign_uses_current_time() {
        let key = test_key();
        let signer = AssertionSigner::new(&key, ISSUER, DEFAULT_MINIMAL_TTL).unwrap();
        let before = Utc::now().timestamp() as u64;
        let claims = decode_assertion_claims(&signer.sign(ClaimSet::Minimal).unwrap()).unwrap();
        let after = Utc::now().timestamp() as u64;

        assert!(claims.iat >= before && claims.iat <= after);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_round_trip_with_public_key() {
        let key = test_key();
        let signer = AssertionSigner::new(&key, ISSUER, DEFAULT_FULL_TTL).unwrap();
        let issued_at = Utc::now().timestamp() as u64;
        let full = ClaimSet::Full { subject: ISSUER, audience: AUDIENCE };
        let token = signer.sign_at(issued_at, full).unwrap();

        let public = DecodingKey::from_rsa_pem(RSA_PUBLIC_PEM.as_bytes()).unwrap();
        let verified = verify_assertion(&token, &public).unwrap();
        assert_eq!(verified, signer.claims_at(issued_at, full));

        // The key's own public half verifies too.
        let verified = verify_assertion(&token, &key.decoding_key()).unwrap();
        assert_eq!(verified.iss, ISSUER);
    }

    #[test]
    fn test_expired_assertion_fails_verification() {
        let key = test_key();
        let signer = AssertionSigner::new(&key, ISSUER, DEFAULT_MINIMAL_TTL).unwrap();
        let token = signer.sign_at(1_000_000_000, ClaimSet::Minimal).unwrap();

        let result = verify_assertion(&token, &key.decoding_key());
        assert!(matches!(result, Err(AuthError::AssertionExpired)));
    }

    #[test]
    fn test_tampered_assertion_fails_verification() {
        let key = test_key();
        let signer = AssertionSigner::new(&key, ISSUER, DEFAULT_FULL_TTL).unwrap();
        let token = signer.sign(ClaimSet::Minimal).unwrap();

        let forged_claims = serde_json::json!({
            "iss": "pure1:apikey:attacker",
            "iat": Utc::now().timestamp(),
            "exp": Utc::now().timestamp() + 300,
        });
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = &forged_payload;
        let forged = parts.join(".");

        let result = verify_assertion(&forged, &key.decoding_key());
        assert!(matches!(result, Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn test_alg_none_rejected() {
        let key = test_key();
        let token = craft_raw_jwt(
            &serde_json::json!({"alg": "none", "typ": "JWT"}),
            &serde_json::json!({"iss": ISSUER, "iat": 1, "exp": 2}),
        );
        let result = verify_assertion(&token, &key.decoding_key());
        assert!(result.is_err());
    }

    #[test]
    fn test_ttl_bounds() {
        let key = test_key();
        assert!(AssertionSigner::new(&key, ISSUER, Duration::from_secs(4)).is_err());
        assert!(AssertionSigner::new(&key, ISSUER, Duration::from_secs(5)).is_ok());
        assert!(AssertionSigner::new(&key, ISSUER, Duration::from_secs(300)).is_ok());
        assert!(matches!(
            AssertionSigner::new(&key, ISSUER, Duration::from_secs(301)),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_empty_issuer_rejected() {
        let key = test_key();
        let result = AssertionSigner::new(&key, "  ", DEFAULT_MINIMAL_TTL);
        assert!(matches!(result, Err(AuthError::Config(msg)) if msg.contains("issuer")));
    }

    mod decode {
        use super::*;

        #[test]
        fn empty_input_rejected() {
            assert!(decode_assertion_claims("").is_err());
        }

        #[test]
        fn two_parts_rejected() {
            assert!(decode_assertion_claims("a.b").is_err());
        }

        #[test]
        fn invalid_base64_rejected() {
            assert!(decode_assertion_claims("a.!!!.c").is_err());
        }

        #[test]
        fn missing_iss_rejected() {
            let token = craft_raw_jwt(
                &serde_json::json!({"alg": "RS256"}),
                &serde_json::json!({"iss": "", "iat": 1, "exp": 2}),
            );
            let result = decode_assertion_claims(&token);
            assert!(
                matches!(&result, Err(AuthError::InvalidAssertion(msg)) if msg.contains("iss")),
                "got {result:?}"
            );
        }
    }

    mod proptest_claims {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            /// For any issue time and accepted TTL, `exp - iat == ttl` and the
            /// claim shape matches the requested set.
            #[test]
            fn claims_shape_and_ttl(
                issued_at in 0u64..4_000_000_000,
                ttl in 5u64..=300,
                full in any::<bool>(),
            ) {
                let key = SigningKey::from_pem(RSA_PKCS8_PEM).expect("fixture key");
                let signer = AssertionSigner::new(&key, ISSUER, Duration::from_secs(ttl))
                    .expect("ttl in range");
                let set = if full {
                    ClaimSet::Full { subject: ISSUER, audience: AUDIENCE }
                } else {
                    ClaimSet::Minimal
                };
                let claims = signer.claims_at(issued_at, set);

                prop_assert_eq!(claims.exp - claims.iat, ttl);
                prop_assert_eq!(claims.sub.is_some(), full);
                prop_assert_eq!(claims.aud.is_some(), full);

                let json = serde_json::to_value(&claims).expect("serialize");
                let expected = if full { 5 } else { 3 };
                prop_assert_eq!(json.as_object().expect("object").len(), expected);
            }
        }
    }
}
