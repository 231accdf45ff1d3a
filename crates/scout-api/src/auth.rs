//! Admin credential check for the cache endpoints.
//!
//! The configured key is kept only as a BLAKE3 digest. A presented key is
//! digested and compared with `blake3::Hash`'s constant-time equality.

use axum::http::HeaderMap;

use crate::error::ApiError;

/// Header carrying the admin key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The configured admin credential, if any.
#[derive(Clone, Default)]
pub struct AdminKey {
    digest: Option<blake3::Hash>,
}

impl std::fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminKey")
            .field("configured", &self.digest.is_some())
            .finish()
    }
}

impl AdminKey {
    /// Admin access disabled: every admin request is forbidden.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Accept requests presenting `key`. An empty key disables admin access.
    pub fn new(key: impl AsRef<str>) -> Self {
        let key = key.as_ref();
        if key.is_empty() {
            return Self::disabled();
        }
        Self {
            digest: Some(blake3::hash(key.as_bytes())),
        }
    }

    /// Whether a key is configured.
    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    /// Check request headers.
    ///
    /// Missing header is `Unauthorized`; a wrong key, or any key when none is
    /// configured, is `Forbidden`.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let presented = headers
            .get(API_KEY_HEADER)
            .ok_or(ApiError::Unauthorized)?
            .as_bytes();
        let expected = self.digest.ok_or(ApiError::Forbidden)?;
        if blake3::hash(presented) == expected {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}
