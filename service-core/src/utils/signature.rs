use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Generate a hex HMAC-SHA256 signature of `value`.
pub fn generate_signature(secret: &str, value: &str) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    mac.update(value.as_bytes());
    let result = mac.finalize();

    Ok(hex::encode(result.into_bytes()))
}

/// Verify a hex HMAC-SHA256 signature using constant-time comparison.
pub fn verify_signature(secret: &str, value: &str, signature: &str) -> Result<bool, anyhow::Error> {
    let expected_signature = generate_signature(secret, value)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}

/// Produce `<value>.<signature>`, the format used for signed cookies.
pub fn sign_value(secret: &str, value: &str) -> Result<String, anyhow::Error> {
    Ok(format!("{}.{}", value, generate_signature(secret, value)?))
}

/// Split a `<value>.<signature>` token and return the value if the signature holds.
pub fn unsign_value(secret: &str, token: &str) -> Option<String> {
    let (value, signature) = token.rsplit_once('.')?;
    if value.is_empty() {
        return None;
    }

    match verify_signature(secret, value, signature) {
        Ok(true) => Some(value.to_string()),
        _ => None,
    }
}
