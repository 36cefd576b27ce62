//! Credential snapshot supplied by the external credential source.

use std::fmt;

use crate::ids::UserId;

/// An immutable credential snapshot.
///
/// The snapshot is replaced as a whole when the external token source
/// rotates — never mutated field-by-field, so a handshake reading it
/// mid-rotation observes either the old pair or the new pair, nothing in
/// between. The refresh token is local-only and never leaves the process
/// over the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Identifier of the authenticated user.
    pub user_id: UserId,
    /// Access token presented during the auth handshake.
    pub access_token: String,
    /// Refresh token, if the credential source issued one.
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Create a new credential snapshot.
    #[must_use]
    pub fn new(
        user_id: impl Into<UserId>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Build the snapshot that supersedes this one after a token rotation.
    ///
    /// The user identity is preserved; only the token pair changes.
    #[must_use]
    pub fn rotated(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            user_id: self.user_id.clone(),
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Whether `other` carries the same token pair.
    #[must_use]
    pub fn same_tokens(&self, other: &Self) -> bool {
        self.access_token == other.access_token && self.refresh_token == other.refresh_token
    }
}

// Token material must not leak into logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
