use crate::error::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex encoded HMAC-SHA256 of `body` keyed with `secret`.
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(format!("Invalid signing key: {}", e)))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn secrets_match(provided: &str, expected: &str) -> bool {
    ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_stable_hex() {
        let body = br#"{"state":"closed"}"#;
        let a = sign_payload("whsec_test", body).unwrap();
        let b = sign_payload("whsec_test", body).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, sign_payload("other", body).unwrap());
    }

    #[test]
    fn secrets_compare_exactly() {
        assert!(secrets_match("whsec_test", "whsec_test"));
        assert!(!secrets_match("whsec_tes", "whsec_test"));
        assert!(!secrets_match("", "whsec_test"));
    }
}
