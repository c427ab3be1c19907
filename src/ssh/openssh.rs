//! OpenSSH `authorized_keys` encoding of RSA public keys.
//!
//! Wire blob layout: `string "ssh-rsa" || mpint e || mpint n`, each field
//! prefixed by a 4-byte big-endian length. Integers are minimal big-endian
//! with a single 0x00 pad byte when the top bit would otherwise read as a sign.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;

use crate::error::{AppError, Result};

pub const RSA_KEY_TYPE: &str = "ssh-rsa";

/// Parse a PEM public key. `PUBLIC KEY` (SPKI) and `RSA PUBLIC KEY` (PKCS#1)
/// are both accepted; non-RSA SPKI keys are `UnsupportedKeyType`.
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey> {
    let pem = pem.trim();

    if pem.contains("BEGIN RSA PUBLIC KEY") {
        return RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|e| AppError::Encoding(format!("failed to parse public key: {e}")));
    }

    RsaPublicKey::from_public_key_pem(pem).map_err(|e| match e {
        pkcs8::spki::Error::OidUnknown { oid } => {
            AppError::UnsupportedKeyType(format!("public key algorithm {oid}"))
        }
        other => AppError::Encoding(format!("failed to parse public key: {other}")),
    })
}

/// Convert a PEM public key into a single `ssh-rsa <base64> <comment>` line.
pub fn encode_public_key_pem(pem: &str, comment: &str) -> Result<String> {
    let key = parse_public_key_pem(pem)?;
    encode_public_key(&key, comment)
}

pub fn encode_public_key(key: &RsaPublicKey, comment: &str) -> Result<String> {
    let blob = rsa_wire_blob(&key.e().to_bytes_be(), &key.n().to_bytes_be())?;
    Ok(format!("{RSA_KEY_TYPE} {} {comment}", STANDARD.encode(blob)))
}

/// Build the `ssh-rsa` wire blob from big-endian exponent and modulus bytes.
pub fn rsa_wire_blob(e: &[u8], n: &[u8]) -> Result<Vec<u8>> {
    let e = mpint_body(e);
    let n = mpint_body(n);

    let e_len = e.len() + usize::from(needs_pad(e));
    let n_len = n.len() + usize::from(needs_pad(n));
    let expected = 4 + RSA_KEY_TYPE.len() + 4 + e_len + 4 + n_len;

    let mut blob = Vec::with_capacity(expected);
    put_string(&mut blob, RSA_KEY_TYPE.as_bytes())?;
    put_mpint(&mut blob, e)?;
    put_mpint(&mut blob, n)?;

    if blob.len() != expected {
        return Err(AppError::Encoding(format!(
            "wire blob length mismatch: wrote {}, expected {expected}",
            blob.len()
        )));
    }
    Ok(blob)
}

/// Split a wire blob into its length-prefixed fields. `None` if any length
/// runs past the end of the buffer.
pub fn split_wire_fields(blob: &[u8]) -> Option<Vec<&[u8]>> {
    let mut fields = Vec::new();
    let mut rest = blob;
    while !rest.is_empty() {
        let (len, tail) = rest.split_first_chunk::<4>()?;
        let len = u32::from_be_bytes(*len) as usize;
        if tail.len() < len {
            return None;
        }
        let (field, tail) = tail.split_at(len);
        fields.push(field);
        rest = tail;
    }
    Some(fields)
}

fn mpint_body(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn needs_pad(body: &[u8]) -> bool {
    body.first().is_some_and(|&b| b & 0x80 != 0)
}

fn put_length(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| AppError::Encoding(format!("field too large for wire format: {len}")))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn put_string(out: &mut Vec<u8>, data: &[u8]) -> Result<()> {
    put_length(out, data.len())?;
    out.extend_from_slice(data);
    Ok(())
}

fn put_mpint(out: &mut Vec<u8>, body: &[u8]) -> Result<()> {
    if needs_pad(body) {
        put_length(out, body.len() + 1)?;
        out.push(0);
    } else {
        put_length(out, body.len())?;
    }
    out.extend_from_slice(body);
    Ok(())
}
