//! SHA-256 fingerprints of OpenSSH public key lines.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::openssh::split_wire_fields;

/// Returned instead of a digest when the key line cannot be decoded.
pub const FINGERPRINT_ERROR: &str = "SHA256:ERROR";

const FINGERPRINT_PREFIX: &str = "SHA256:";

/// Fingerprint an `ssh-<type> <base64> [comment]` line.
///
/// The digest is taken over the decoded wire blob and rendered as `SHA256:`
/// followed by 32 colon-separated lowercase hex pairs. Any
/// malformed input yields `FINGERPRINT_ERROR`; this function never fails.
pub fn fingerprint(openssh_line: &str) -> String {
    match decode_blob(openssh_line) {
        Some(blob) => format!("{FINGERPRINT_PREFIX}{}", colon_hex(&Sha256::digest(&blob))),
        None => {
            warn!("Cannot fingerprint malformed public key line");
            FINGERPRINT_ERROR.to_string()
        }
    }
}

pub fn is_error_fingerprint(fingerprint: &str) -> bool {
    fingerprint == FINGERPRINT_ERROR
}

fn decode_blob(line: &str) -> Option<Vec<u8>> {
    let mut tokens = line.trim().split(' ');
    let key_type = tokens.next()?;
    let token = tokens.next()?;
    if !key_type.starts_with("ssh-") || token.is_empty() {
        return None;
    }

    let blob = STANDARD.decode(token).ok()?;
    let fields = split_wire_fields(&blob)?;
    match fields.first() {
        Some(name) if name.starts_with(b"ssh-") => Some(blob),
        _ => None,
    }
}

fn colon_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh::keygen::generate_key_pair;
    use crate::ssh::openssh::{encode_public_key_pem, rsa_wire_blob};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn synthetic_line() -> (String, Vec<u8>) {
        let blob = rsa_wire_blob(&[0x01, 0x00, 0x01], &[0xc3; 16]).unwrap();
        (format!("ssh-rsa {} test", STANDARD.encode(&blob)), blob)
    }

    #[test]
    fn digest_is_colon_separated_hex() {
        let (line, blob) = synthetic_line();
        let fp = fingerprint(&line);
        let hex = fp.strip_prefix("SHA256:").unwrap();

        assert_eq!(hex.len(), 95);
        assert_eq!(hex.split(':').count(), 32);
        assert!(hex.split(':').all(|pair| pair.len() == 2));
        assert_eq!(hex, colon_hex(&Sha256::digest(&blob)));
        assert_eq!(hex, hex.to_lowercase());
    }

    #[test]
    fn comment_does_not_affect_fingerprint() {
        let (line, _) = synthetic_line();
        let without_comment = line.trim_end_matches(" test");
        assert_eq!(fingerprint(&line), fingerprint(without_comment));
        assert_eq!(fingerprint(&line), fingerprint(&format!("  {line}\n")));
    }

    #[test]
    fn malformed_lines_yield_sentinel() {
        let (line, blob) = synthetic_line();
        let encoded = STANDARD.encode(&blob);
        let truncated = format!("ssh-rsa {}", &encoded[..encoded.len() - 8]);

        assert_eq!(fingerprint(""), FINGERPRINT_ERROR);
        assert_eq!(fingerprint("ssh-rsa"), FINGERPRINT_ERROR);
        assert_eq!(fingerprint("ssh-rsa !!!notbase64!!! c"), FINGERPRINT_ERROR);
        assert_eq!(fingerprint(&truncated), FINGERPRINT_ERROR);
        assert_eq!(fingerprint(&line.replacen("ssh-rsa", "rsa", 1)), FINGERPRINT_ERROR);
        assert!(is_error_fingerprint(&fingerprint("garbage")));
    }

    #[test]
    fn matches_ssh_key_crate_fingerprint() {
        let mut rng = StdRng::seed_from_u64(11);
        let pair = generate_key_pair(&mut rng, 2048, "fp", "").unwrap();
        let line = encode_public_key_pem(&pair.public_pem, "fp").unwrap();

        let parsed = ssh_key::PublicKey::from_openssh(&line).unwrap();
        let expected = parsed.fingerprint(ssh_key::HashAlg::Sha256);
        assert_eq!(
            fingerprint(&line),
            format!("SHA256:{}", colon_hex(expected.as_bytes()))
        );
    }
}
