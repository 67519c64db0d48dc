use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 over the exact payload bytes. Callers serialize
/// JSON payloads once and sign the same bytes they transmit.
pub fn sign(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

pub fn verify(secret: &[u8], payload: &[u8], provided: &str) -> bool {
    let expected = sign(secret, payload);
    secure_eq(expected.as_bytes(), provided.trim().as_bytes())
}

/// Constant-time comparison; length mismatch short-circuits.
pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Server-side signing key for a webhook endpoint. Returned to the merchant
/// exactly once, at creation.
pub fn generate_endpoint_secret() -> String {
    let mut bytes = [0_u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let payload = br#"{"event":"payment.updated","resource_id":"abc"}"#;
        let signature = sign(b"secret-a", payload);
        assert!(verify(b"secret-a", payload, &signature));
    }

    #[test]
    fn verify_fails_across_secrets() {
        let payload = br#"{"event":"payment.updated"}"#;
        let signature = sign(b"secret-a", payload);
        assert!(!verify(b"secret-b", payload, &signature));
    }

    #[test]
    fn verify_fails_on_tampered_payload() {
        let signature = sign(b"secret-a", b"{\"amount\":100}");
        assert!(!verify(b"secret-a", b"{\"amount\":999}", &signature));
    }

    #[test]
    fn secure_eq_rejects_length_mismatch() {
        assert!(secure_eq(b"abc", b"abc"));
        assert!(!secure_eq(b"abc", b"abcd"));
        assert!(!secure_eq(b"abc", b"abd"));
    }

    #[test]
    fn endpoint_secrets_are_unique_hex() {
        let a = generate_endpoint_secret();
        let b = generate_endpoint_secret();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
