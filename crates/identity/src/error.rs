//! Errors from the identity platform layer.

/// Errors returned by an [`IdentityProvider`](crate::IdentityProvider).
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("Identity request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform answered with a non-2xx status.
    #[error("Identity API error ({status}): {message}")]
    Api {
        status: u16,
        /// Human-readable message extracted from the response body.
        message: String,
    },

    /// The caller supplied a value the platform API cannot address.
    #[error("Invalid identity request: {0}")]
    InvalidInput(String),

    /// The call needs credentials the service was not given.
    #[error("Identity admin API is not configured: {0}")]
    NotConfigured(&'static str),
}

impl IdentityError {
    /// HTTP status reported by the platform, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            IdentityError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pull the most useful message out of a GoTrue error body.
///
/// GoTrue versions disagree on the key, so `msg`, `message`,
/// `error_description` and `error` are tried in that order. Bodies that are
/// not JSON are returned as-is.
pub fn extract_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}
