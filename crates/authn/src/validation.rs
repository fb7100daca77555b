//! JWT algorithm validation.
//!
//! Assertions produced by this crate are always RS256. Verification helpers
//! run the header algorithm through [`validate_algorithm`] before touching the
//! signature, so substituted algorithms are rejected up front.

use crate::error::AuthError;

/// Forbidden JWT algorithms that are never accepted for security reasons.
///
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric algorithms (shared secret vulnerability)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted JWT algorithms.
///
/// The token exchange endpoint verifies RSA signatures over SHA-256 only.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256"];

/// Validate JWT algorithm against security policies.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if the algorithm is forbidden
/// or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use pure1_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("RS256").is_ok());
/// assert!(validate_algorithm("EdDSA").is_err());
/// assert!(validate_algorithm("HS256").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{}' is not allowed for security reasons",
            alg
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::UnsupportedAlgorithm(format!(
            "Algorithm '{}' is not in accepted list (only RS256 is supported)",
            alg
        )));
    }

    Ok(())
}
