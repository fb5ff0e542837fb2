use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::RngCore;

/// Entropy per session token. 32 bytes encode to 43 url-safe characters.
pub const TOKEN_BYTES: usize = 32;

/// Generate an opaque session token: random bytes, base64url, no padding.
/// The token itself carries no claims; authority lives in the
/// `auth_tokens` table row it maps to.
pub fn generate_auth_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Cheap shape check for inputs that claim to be tokens. Real validity is
/// always decided by the database lookup.
pub fn has_token_shape(token: &str) -> bool {
    token.len() >= 40
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
