//! RSA key-pair generation and PEM (de)serialization.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use pkcs8::PrivateKeyInfo;
use pkcs8::pkcs5::pbes2;
use rsa::rand_core::CryptoRngCore;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use tracing::info;

use crate::error::{AppError, Result};

pub const DEFAULT_KEY_BITS: usize = 4096;
pub const PUBLIC_EXPONENT: u32 = 65537;
pub const DEFAULT_COMMENT: &str = "higit@openharmony";

const PBKDF2_ITERATIONS: u32 = 2048;
const ENCRYPTED_PEM_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// A freshly generated key pair, both halves already serialized to PEM.
pub struct KeyPair {
    pub private_key: RsaPrivateKey,
    pub private_pem: String,
    pub public_pem: String,
    pub comment: String,
}

/// Random generator seeded from the operating system's entropy source.
pub fn entropy_rng() -> StdRng {
    StdRng::from_entropy()
}

/// Generate an RSA key pair with public exponent 65537.
///
/// The private half is written as PKCS#1 (`RSA PRIVATE KEY`), or as encrypted
/// PKCS#8 when `passphrase` is non-empty. The public half is written as
/// SubjectPublicKeyInfo (`PUBLIC KEY`). An empty comment falls back to
/// `DEFAULT_COMMENT`.
pub fn generate_key_pair<R: CryptoRngCore>(
    rng: &mut R,
    bits: usize,
    comment: &str,
    passphrase: &str,
) -> Result<KeyPair> {
    info!("Generating RSA key pair: bits={}", bits);

    let exponent = BigUint::from(PUBLIC_EXPONENT);
    let private_key = RsaPrivateKey::new_with_exp(rng, bits, &exponent)
        .map_err(|e| AppError::KeyGeneration(format!("failed to generate RSA key pair: {e}")))?;

    let private_pem = if passphrase.is_empty() {
        private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AppError::KeyGeneration(format!("failed to write private key to PEM: {e}")))?
            .to_string()
    } else {
        encrypt_private_key(rng, &private_key, passphrase)?
    };

    let public_pem = public_key_pem(&private_key)
        .map_err(|e| AppError::KeyGeneration(e.to_string()))?;

    let comment = if comment.is_empty() {
        DEFAULT_COMMENT.to_string()
    } else {
        comment.to_string()
    };

    Ok(KeyPair {
        private_key,
        private_pem,
        public_pem,
        comment,
    })
}

/// PKCS#8 PBES2 envelope (PBKDF2-SHA256 + AES-256-CBC) around the private key.
fn encrypt_private_key<R: CryptoRngCore>(
    rng: &mut R,
    key: &RsaPrivateKey,
    passphrase: &str,
) -> Result<String> {
    let fail = |e: &dyn std::fmt::Display| {
        AppError::KeyGeneration(format!("failed to write encrypted private key to PEM: {e}"))
    };

    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let der = key.to_pkcs8_der().map_err(|e| fail(&e))?;
    let info = PrivateKeyInfo::try_from(der.as_bytes()).map_err(|e| fail(&e))?;
    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBKDF2_ITERATIONS, &salt, &iv)
        .map_err(|e| fail(&e))?;
    let encrypted = info
        .encrypt_with_params(params, passphrase.as_bytes())
        .map_err(|e| fail(&e))?;
    let pem = encrypted
        .to_pem(ENCRYPTED_PEM_LABEL, LineEnding::LF)
        .map_err(|e| fail(&e))?;
    Ok(pem.to_string())
}

/// SubjectPublicKeyInfo PEM of the public half of `key`.
pub fn public_key_pem(key: &RsaPrivateKey) -> Result<String> {
    RsaPublicKey::from(key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Encoding(format!("failed to write public key to PEM: {e}")))
}

/// Parse a PEM private key written by this module or by common tooling.
///
/// Accepts PKCS#1, PKCS#8 and passphrase-encrypted PKCS#8. Keys in the
/// OpenSSH container format or for other algorithms are rejected with
/// `UnsupportedKeyType`.
pub fn load_private_key(pem: &str, passphrase: &str) -> Result<RsaPrivateKey> {
    let pem = pem.trim();

    if pem.contains("BEGIN OPENSSH PRIVATE KEY") {
        return Err(AppError::UnsupportedKeyType(
            "OpenSSH private key container".to_string(),
        ));
    }

    if pem.contains("BEGIN RSA PRIVATE KEY") {
        return RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| AppError::Encoding(format!("failed to parse private key: {e}")));
    }

    let parsed = if pem.contains("BEGIN ENCRYPTED PRIVATE KEY") {
        RsaPrivateKey::from_pkcs8_encrypted_pem(pem, passphrase.as_bytes())
    } else if pem.contains("BEGIN PRIVATE KEY") {
        RsaPrivateKey::from_pkcs8_pem(pem)
    } else {
        return Err(AppError::UnsupportedKeyType(
            "unrecognized private key format".to_string(),
        ));
    };

    parsed.map_err(|e| match e {
        rsa::pkcs8::Error::PublicKey(rsa::pkcs8::spki::Error::OidUnknown { oid }) => {
            AppError::UnsupportedKeyType(format!("private key algorithm {oid}"))
        }
        other => AppError::Encoding(format!("failed to parse private key: {other}")),
    })
}
