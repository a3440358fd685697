//! The API token used to authenticate against the remote vault.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bearer token for the vault service, read from `RC_API_SECRET_TOKEN` or the
/// `api_token` adapter argument.
///
/// Formatting never shows the token. Debug output carries only its length,
/// which is enough to tell an empty or truncated token from a real one.
/// The buffer is wiped on drop. [`ApiToken::expose`] is for the
/// `Authorization` header and nothing else.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiToken(<{} bytes hidden>)", self.0.len())
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<api token>")
    }
}

impl From<String> for ApiToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}
