use std::fmt;

use serde::Deserialize;

/// Token kind assumed when the server omits `token_type`.
pub const DEFAULT_TOKEN_KIND: &str = "bearer";

/// An access token together with its scheme label.
///
/// Both halves live in one value so they can only be set or cleared together.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    kind: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind: kind.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::new(token, DEFAULT_TOKEN_KIND)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The `Authorization` header value: `"<kind> <token>"`.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.kind, self.token)
    }
}

// Keep tokens out of logs and panic messages
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Token payload returned by login, OAuth callback and refresh.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

impl From<TokenResponse> for Credential {
    fn from(response: TokenResponse) -> Self {
        let kind = response
            .token_type
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_KIND.to_string());
        Credential::new(response.access_token, kind)
    }
}

/// What the user presents to obtain a credential.
#[derive(Clone)]
pub enum IdentityProof {
    Password { email: String, password: String },
    /// Authorization code handed back by the Google OAuth redirect
    OAuthCode(String),
}

impl fmt::Debug for IdentityProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityProof::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
            IdentityProof::OAuthCode(_) => f.write_str("OAuthCode(..)"),
        }
    }
}
