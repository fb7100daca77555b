//! Private key loading.
//!
//! [`KeyLoader`] turns a PEM file on disk into a [`SigningKey`] usable for
//! RS256 assertions. Encrypted keys are decrypted with the supplied password;
//! when none was supplied the loader asks a [`PasswordPrompt`] exactly once.
//!
//! Supported encodings:
//!
//! | PEM label               | Encoding                                    |
//! |-------------------------|---------------------------------------------|
//! | `RSA PRIVATE KEY`       | PKCS#1, optionally OpenSSL-encrypted        |
//! | `PRIVATE KEY`           | PKCS#8                                      |
//! | `ENCRYPTED PRIVATE KEY` | PKCS#8 encrypted with PBES2                 |
//! | `OPENSSH PRIVATE KEY`   | OpenSSH, optionally bcrypt-encrypted        |

use std::{fmt, fs, io, path::Path};

use jsonwebtoken::{DecodingKey, EncodingKey};
use pkcs8::DecodePrivateKey;
use rsa::{
    RsaPrivateKey,
    pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey},
    traits::PublicKeyParts,
};
use ssh_key::PrivateKey as OpenSshKey;
use zeroize::Zeroizing;

use crate::{
    error::{AuthError, Result},
    legacy_pem::EncryptedPem,
};

/// Prompt shown when an encrypted key needs a password.
pub const PASSWORD_PROMPT: &str = "Private key password: ";

/// How many times the loader may ask for a password before giving up.
pub const MAX_PASSWORD_PROMPTS: usize = 1;

/// Source of interactive passwords.
pub trait PasswordPrompt {
    /// Reads a password, showing `message` to the user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasswordPrompt`] if the password cannot be read.
    fn prompt_password(&self, message: &str) -> Result<Zeroizing<String>>;
}

/// Reads passwords from the controlling terminal with echo disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn prompt_password(&self, message: &str) -> Result<Zeroizing<String>> {
        rpassword::prompt_password(message)
            .map(Zeroizing::new)
            .map_err(|e| AuthError::PasswordPrompt(e.to_string()))
    }
}

/// PEM encoding of a private key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    /// `RSA PRIVATE KEY`.
    Pkcs1,
    /// `RSA PRIVATE KEY` with `Proc-Type: 4,ENCRYPTED` headers.
    LegacyEncryptedPkcs1,
    /// `PRIVATE KEY`.
    Pkcs8,
    /// `ENCRYPTED PRIVATE KEY`.
    EncryptedPkcs8,
    /// `OPENSSH PRIVATE KEY`. Encryption is recorded inside the key body.
    OpenSsh,
}

impl KeyEncoding {
    /// Detects the encoding from the first PEM boundary in `pem`.
    ///
    /// Returns `None` when there is no PEM block or the label is not a
    /// private key label.
    #[must_use]
    pub fn detect(pem: &str) -> Option<Self> {
        let label = pem_block(pem)?
            .strip_prefix("-----BEGIN ")?
            .split_once("-----")
            .map(|(label, _)| label)?;

        match label {
            "RSA PRIVATE KEY" if pem.contains("Proc-Type: 4,ENCRYPTED") => {
                Some(Self::LegacyEncryptedPkcs1)
            },
            "RSA PRIVATE KEY" => Some(Self::Pkcs1),
            "PRIVATE KEY" => Some(Self::Pkcs8),
            "ENCRYPTED PRIVATE KEY" => Some(Self::EncryptedPkcs8),
            "OPENSSH PRIVATE KEY" => Some(Self::OpenSsh),
            _ => None,
        }
    }

    /// Whether the PEM label or headers mark the key as encrypted.
    ///
    /// Always `false` for [`KeyEncoding::OpenSsh`], whose cipher is only
    /// known once the body is parsed.
    #[must_use]
    pub fn is_encrypted(self) -> bool {
        matches!(self, Self::LegacyEncryptedPkcs1 | Self::EncryptedPkcs8)
    }
}

/// Slice of `pem` starting at its first `-----BEGIN` boundary.
///
/// Skips leading text such as OpenSSL bag attributes.
fn pem_block(pem: &str) -> Option<&str> {
    pem.find("-----BEGIN ").map(|start| &pem[start..])
}

/// Decrypted RSA key material ready for RS256 signing.
///
/// The PKCS#1 DER form is held in a [`Zeroizing`] buffer so it is scrubbed
/// from memory on drop. The key is never written back to disk.
#[derive(Clone)]
pub struct SigningKey {
    pkcs1_der: Zeroizing<Vec<u8>>,
    encoding_key: EncodingKey,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl SigningKey {
    /// Wraps an in-memory RSA private key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyFormat`] if the key cannot be re-encoded as
    /// PKCS#1 DER.
    pub fn from_rsa(key: &RsaPrivateKey) -> Result<Self> {
        let document = key
            .to_pkcs1_der()
            .map_err(|e| AuthError::key_format(format!("Failed to encode RSA key: {e}")))?;
        let pkcs1_der = Zeroizing::new(document.as_bytes().to_vec());
        let encoding_key = EncodingKey::from_rsa_der(&pkcs1_der);

        Ok(Self {
            pkcs1_der,
            encoding_key,
            modulus: key.n().to_bytes_be(),
            exponent: key.e().to_bytes_be(),
        })
    }

    /// Parses an unencrypted PEM key (PKCS#1 or PKCS#8).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyFormat`] for encrypted or unrecognised input.
    pub fn from_pem(pem: &str) -> Result<Self> {
        match decode_pem(pem, None)? {
            Some(key) => Self::from_rsa(&key),
            None => Err(AuthError::key_format("key is encrypted; use KeyLoader with a password")),
        }
    }

    /// Key used by `jsonwebtoken` to produce RS256 signatures.
    #[must_use]
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Public half of the key, for verifying assertions signed by it.
    #[must_use]
    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_rsa_raw_components(&self.modulus, &self.exponent)
    }

    /// Key size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        let leading_zeros = self.modulus.first().map_or(0, |b| b.leading_zeros() as usize);
        self.modulus.len() * 8 - leading_zeros
    }

    /// PKCS#1 DER encoding of the private key.
    #[must_use]
    pub fn pkcs1_der(&self) -> &[u8] {
        &self.pkcs1_der
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey").field("bits", &self.bits()).finish_non_exhaustive()
    }
}

/// Decodes a PEM private key.
///
/// Returns `Ok(None)` when the key is encrypted and no password was given.
/// Malformed headers are reported before any password is asked for.
fn decode_pem(pem: &str, password: Option<&str>) -> Result<Option<RsaPrivateKey>> {
    let encoding = KeyEncoding::detect(pem)
        .ok_or_else(|| AuthError::key_format("no RSA private key PEM block found"))?;
    let block = pem_block(pem).unwrap_or(pem);

    let key = match encoding {
        KeyEncoding::Pkcs1 => {
            ignore_password(password);
            RsaPrivateKey::from_pkcs1_pem(block)
                .map_err(|e| AuthError::key_format(format!("malformed PKCS#1 key: {e}")))?
        },
        KeyEncoding::Pkcs8 => {
            ignore_password(password);
            RsaPrivateKey::from_pkcs8_pem(block)
                .map_err(|e| AuthError::key_format(format!("malformed PKCS#8 key: {e}")))?
        },
        KeyEncoding::LegacyEncryptedPkcs1 => {
            let encrypted = EncryptedPem::parse(block)?;
            let Some(password) = password else {
                return Ok(None);
            };
            // Padding can survive a wrong password by chance; the DER
            // parse then fails instead.
            let der = encrypted.decrypt(password.as_bytes())?;
            RsaPrivateKey::from_pkcs1_der(&der).map_err(|e| {
                tracing::debug!(error = %e, "decrypted PEM is not a PKCS#1 key");
                AuthError::InvalidPassword
            })?
        },
        KeyEncoding::EncryptedPkcs8 => {
            let Some(password) = password else {
                return Ok(None);
            };
            // A wrong password surfaces as a padding or ASN.1 failure; both
            // mean the supplied password did not open the key.
            RsaPrivateKey::from_pkcs8_encrypted_pem(block, password.as_bytes()).map_err(|e| {
                tracing::debug!(error = %e, "encrypted key did not decrypt");
                AuthError::InvalidPassword
            })?
        },
        KeyEncoding::OpenSsh => return decode_openssh(block, password),
    };

    Ok(Some(key))
}

fn decode_openssh(block: &str, password: Option<&str>) -> Result<Option<RsaPrivateKey>> {
    let mut key = OpenSshKey::from_openssh(block)
        .map_err(|e| AuthError::key_format(format!("malformed OpenSSH key: {e}")))?;

    if key.is_encrypted() {
        let Some(password) = password else {
            return Ok(None);
        };
        key = key.decrypt(password.as_bytes()).map_err(|e| {
            tracing::debug!(error = %e, "OpenSSH key did not decrypt");
            AuthError::InvalidPassword
        })?;
    } else {
        ignore_password(password);
    }

    let keypair = key.key_data().rsa().ok_or_else(|| {
        AuthError::key_format(format!("OpenSSH key is {}, not RSA", key.algorithm().as_str()))
    })?;
    RsaPrivateKey::try_from(keypair)
        .map(Some)
        .map_err(|e| AuthError::key_format(format!("invalid OpenSSH RSA key: {e}")))
}

fn ignore_password(password: Option<&str>) {
    if password.is_some() {
        tracing::debug!("password supplied for an unencrypted key; ignoring it");
    }
}

/// Loads [`SigningKey`]s from PEM files.
///
/// # Example
///
/// ```no_run
/// use pure1_authn::key::KeyLoader;
///
/// # fn example() -> Result<(), pure1_authn::AuthError> {
/// let key = KeyLoader::terminal().load("/home/me/.ssh/pure1_rsa.pem", None)?;
/// println!("Loaded {}-bit key", key.bits());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyLoader<P = TerminalPrompt> {
    prompt: P,
}

impl KeyLoader<TerminalPrompt> {
    /// Loader that prompts on the terminal for encrypted keys.
    #[must_use]
    pub fn terminal() -> Self {
        Self { prompt: TerminalPrompt }
    }
}

impl<P: PasswordPrompt> KeyLoader<P> {
    /// Loader using a custom password source.
    pub fn with_prompt(prompt: P) -> Self {
        Self { prompt }
    }

    /// Borrow the password source.
    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    /// Loads and, if needed, decrypts the key at `path`.
    ///
    /// An encrypted key without a password triggers one prompt. A password
    /// that fails to decrypt the key, whether supplied or prompted, ends the
    /// attempt with [`AuthError::InvalidPassword`].
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyNotFound`] if `path` is not a readable file
    /// - [`AuthError::InvalidPassword`] if decryption fails
    /// - [`AuthError::KeyFormat`] if the file holds no supported RSA key
    /// - [`AuthError::PasswordPrompt`] if the prompt cannot read input
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(
        &self,
        path: impl AsRef<Path>,
        password: Option<Zeroizing<String>>,
    ) -> Result<SigningKey> {
        let path = path.as_ref();
        let pem = read_key_file(path)?;
        let mut password = password;

        for attempt in 0..=MAX_PASSWORD_PROMPTS {
            if let Some(key) = decode_pem(&pem, password.as_deref().map(String::as_str))? {
                let key = SigningKey::from_rsa(&key)?;
                tracing::debug!(bits = key.bits(), "private key loaded");
                return Ok(key);
            }

            // Only reachable for an encrypted key with no password yet.
            if attempt == MAX_PASSWORD_PROMPTS {
                break;
            }
            password = Some(self.prompt.prompt_password(PASSWORD_PROMPT)?);
        }

        Err(AuthError::InvalidPassword)
    }
}

fn read_key_file(path: &Path) -> Result<Zeroizing<String>> {
    if path.is_dir() {
        return Err(AuthError::key_not_found(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path is a directory"),
        ));
    }
    fs::read_to_string(path).map(Zeroizing::new).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => AuthError::key_format("key file is not valid UTF-8 PEM"),
        _ => AuthError::key_not_found(path, e),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::io::Write;

    use rstest::rstest;

    use super::*;
    use crate::testutil::{
        ENCRYPTED_KEY_PASSWORD, RSA_ENCRYPTED_PKCS8_PEM, RSA_LEGACY_ENCRYPTED_PEM,
        RSA_OPENSSH_ENCRYPTED_KEY, RSA_OPENSSH_KEY, RSA_PKCS1_PEM, RSA_PKCS8_PEM, ScriptedPrompt,
        fixture_path,
    };

    #[test]
    fn test_detect_encodings() {
        assert_eq!(KeyEncoding::detect(RSA_PKCS1_PEM), Some(KeyEncoding::Pkcs1));
        assert_eq!(KeyEncoding::detect(RSA_PKCS8_PEM), Some(KeyEncoding::Pkcs8));
        assert_eq!(KeyEncoding::detect(RSA_ENCRYPTED_PKCS8_PEM), Some(KeyEncoding::EncryptedPkcs8));
        assert_eq!(
            KeyEncoding::detect(RSA_LEGACY_ENCRYPTED_PEM),
            Some(KeyEncoding::LegacyEncryptedPkcs1)
        );
        assert_eq!(KeyEncoding::detect(RSA_OPENSSH_KEY), Some(KeyEncoding::OpenSsh));
        assert_eq!(KeyEncoding::detect(RSA_OPENSSH_ENCRYPTED_KEY), Some(KeyEncoding::OpenSsh));
        assert_eq!(KeyEncoding::detect("-----BEGIN PUBLIC KEY-----\n"), None);
        assert_eq!(KeyEncoding::detect("not a key"), None);
    }

    #[rstest]
    #[case::pkcs1(KeyEncoding::Pkcs1, false)]
    #[case::legacy(KeyEncoding::LegacyEncryptedPkcs1, true)]
    #[case::pkcs8(KeyEncoding::Pkcs8, false)]
    #[case::encrypted_pkcs8(KeyEncoding::EncryptedPkcs8, true)]
    #[case::openssh(KeyEncoding::OpenSsh, false)]
    fn test_is_encrypted_from_label(#[case] encoding: KeyEncoding, #[case] expected: bool) {
        assert_eq!(encoding.is_encrypted(), expected);
    }

    #[test]
    fn test_detect_skips_leading_text() {
        let pem = format!("Bag Attributes\n    localKeyID: 01\n{RSA_PKCS8_PEM}");
        assert_eq!(KeyEncoding::detect(&pem), Some(KeyEncoding::Pkcs8));
        assert!(SigningKey::from_pem(&pem).is_ok());
    }

    #[rstest]
    #[case::pkcs8(RSA_PKCS8_PEM)]
    #[case::openssh(RSA_OPENSSH_KEY)]
    fn test_unencrypted_encodings_are_the_same_key(#[case] pem: &str) {
        let reference = SigningKey::from_pem(RSA_PKCS1_PEM).unwrap();
        let key = SigningKey::from_pem(pem).unwrap();
        assert_eq!(key.pkcs1_der(), reference.pkcs1_der());
        assert_eq!(key.bits(), 2048);
    }

    #[rstest]
    #[case::pkcs8(RSA_ENCRYPTED_PKCS8_PEM)]
    #[case::legacy(RSA_LEGACY_ENCRYPTED_PEM)]
    #[case::openssh(RSA_OPENSSH_ENCRYPTED_KEY)]
    fn test_from_pem_rejects_encrypted(#[case] pem: &str) {
        let err = SigningKey::from_pem(pem).unwrap_err();
        assert!(matches!(err, AuthError::KeyFormat(_)));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let key = SigningKey::from_pem(RSA_PKCS8_PEM).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("bits: 2048"));
        assert!(!debug.contains("pkcs1_der"));
    }

    #[test]
    fn test_unencrypted_key_loads_without_prompt() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::default());
        let key = loader.load(fixture_path("rsa_pkcs8.pem"), None).unwrap();

        assert_eq!(key.bits(), 2048);
        assert_eq!(loader.prompt().calls(), 0);
    }

    #[test]
    fn test_password_ignored_for_unencrypted_key() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::default());
        let key =
            loader.load(fixture_path("rsa_pkcs1.pem"), Some(Zeroizing::new("unused".into())));

        assert!(key.is_ok());
        assert_eq!(loader.prompt().calls(), 0);
    }

    #[test]
    fn test_encrypted_key_with_supplied_password() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::default());
        let key = loader
            .load(
                fixture_path("rsa_encrypted.pem"),
                Some(Zeroizing::new(ENCRYPTED_KEY_PASSWORD.into())),
            )
            .unwrap();

        let plain = SigningKey::from_pem(RSA_PKCS8_PEM).unwrap();
        assert_eq!(key.pkcs1_der(), plain.pkcs1_der());
        assert_eq!(loader.prompt().calls(), 0);
    }

    #[test]
    fn test_encrypted_key_with_wrong_supplied_password_does_not_prompt() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::new([ENCRYPTED_KEY_PASSWORD]));
        let result =
            loader.load(fixture_path("rsa_encrypted.pem"), Some(Zeroizing::new("wrong".into())));

        assert!(matches!(result, Err(AuthError::InvalidPassword)));
        assert_eq!(loader.prompt().calls(), 0);
    }

    #[test]
    fn test_encrypted_key_prompts_once_with_correct_password() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::new([ENCRYPTED_KEY_PASSWORD]));
        let key = loader.load(fixture_path("rsa_encrypted.pem"), None);

        assert!(key.is_ok());
        assert_eq!(loader.prompt().calls(), 1);
        assert_eq!(loader.prompt().messages(), vec![PASSWORD_PROMPT.to_owned()]);
    }

    #[test]
    fn test_encrypted_key_prompts_once_with_wrong_password() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::new(["wrong", "also-wrong"]));
        let result = loader.load(fixture_path("rsa_encrypted.pem"), None);

        assert!(matches!(result, Err(AuthError::InvalidPassword)));
        assert_eq!(loader.prompt().calls(), 1, "a failed prompted password is terminal");
    }

    #[test]
    fn test_prompt_failure_is_surfaced() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::default());
        let result = loader.load(fixture_path("rsa_encrypted.pem"), None);

        assert!(matches!(result, Err(AuthError::PasswordPrompt(_))));
    }

    #[test]
    fn test_missing_file_is_key_not_found() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::default());
        let result = loader.load("/definitely/not/here.pem", None);

        assert!(matches!(result, Err(AuthError::KeyNotFound { .. })));
        assert_eq!(loader.prompt().calls(), 0);
    }

    #[test]
    fn test_directory_is_key_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = KeyLoader::with_prompt(ScriptedPrompt::default());
        let result = loader.load(dir.path(), None);

        assert!(matches!(result, Err(AuthError::KeyNotFound { .. })));
    }

    #[rstest]
    #[case::legacy_pem("rsa_legacy_encrypted.pem")]
    #[case::openssh("rsa_openssh_encrypted.key")]
    fn test_encrypted_key_prompts_once_and_decrypts(#[case] fixture: &str) {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::new([ENCRYPTED_KEY_PASSWORD]));
        let key = loader.load(fixture_path(fixture), None).unwrap();

        let plain = SigningKey::from_pem(RSA_PKCS1_PEM).unwrap();
        assert_eq!(key.pkcs1_der(), plain.pkcs1_der());
        assert_eq!(loader.prompt().messages(), vec![PASSWORD_PROMPT.to_owned()]);
    }

    #[rstest]
    #[case::legacy_pem("rsa_legacy_encrypted.pem")]
    #[case::openssh("rsa_openssh_encrypted.key")]
    fn test_encrypted_key_wrong_prompted_password_is_terminal(#[case] fixture: &str) {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::new(["wrong", ENCRYPTED_KEY_PASSWORD]));
        let result = loader.load(fixture_path(fixture), None);

        assert!(matches!(result, Err(AuthError::InvalidPassword)), "got {result:?}");
        assert_eq!(loader.prompt().calls(), 1);
    }

    #[test]
    fn test_legacy_encrypted_key_with_supplied_password() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::default());
        let key = loader.load(
            fixture_path("rsa_legacy_encrypted.pem"),
            Some(Zeroizing::new(ENCRYPTED_KEY_PASSWORD.into())),
        );

        assert!(key.is_ok(), "got {key:?}");
        assert_eq!(loader.prompt().calls(), 0);
    }

    #[test]
    fn test_legacy_encrypted_key_with_wrong_supplied_password_does_not_prompt() {
        let loader = KeyLoader::with_prompt(ScriptedPrompt::new([ENCRYPTED_KEY_PASSWORD]));
        let result = loader
            .load(fixture_path("rsa_legacy_encrypted.pem"), Some(Zeroizing::new("wrong".into())));

        assert!(matches!(result, Err(AuthError::InvalidPassword)));
        assert_eq!(loader.prompt().calls(), 0);
    }

    #[test]
    fn test_unsupported_legacy_cipher_fails_before_prompting() {
        let pem = RSA_LEGACY_ENCRYPTED_PEM.replace("AES-256-CBC", "BF-CBC");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();

        let loader = KeyLoader::with_prompt(ScriptedPrompt::new([ENCRYPTED_KEY_PASSWORD]));
        let result = loader.load(file.path(), None);

        assert!(matches!(&result, Err(AuthError::KeyFormat(msg)) if msg.contains("BF-CBC")));
        assert_eq!(loader.prompt().calls(), 0);
    }

    #[test]
    fn test_garbage_file_is_key_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ssh-rsa AAAAB3NzaC1yc2E this is a public key").unwrap();

        let loader = KeyLoader::with_prompt(ScriptedPrompt::default());
        let result = loader.load(file.path(), None);

        assert!(matches!(result, Err(AuthError::KeyFormat(_))));
    }

    #[test]
    fn test_truncated_pkcs8_is_key_format() {
        let truncated: String = RSA_PKCS8_PEM.lines().take(5).collect::<Vec<_>>().join("\n");
        let result = SigningKey::from_pem(&truncated);

        assert!(matches!(result, Err(AuthError::KeyFormat(_))));
    }
}
