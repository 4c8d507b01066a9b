use crate::error::Error;
use std::time::{Duration, SystemTime};

/// Tokens are considered expired this long before their actual expiry, so
/// a request started with a token doesn't reach the server after it lapsed.
pub const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Represents an access token as returned by `OAuth2` servers.
///
/// * It is produced by both the assertion and the metadata flow.
/// * It authenticates outbound API calls, and must be refreshed once it has
///  reached its expiry date.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    /// used when authenticating calls to oauth2 enabled services.
    pub access_token: String,
    /// The token type as string - usually 'Bearer'.
    pub token_type: String,
    /// Absolute point in time at which the token stops being accepted.
    pub expiry: SystemTime,
}

impl Token {
    /// Returns true if we are expired, or will be within [`EXPIRY_MARGIN`].
    #[inline]
    pub fn has_expired(&self) -> bool {
        if self.access_token.is_empty() {
            return true;
        }

        match self.expiry.checked_sub(EXPIRY_MARGIN) {
            Some(refresh_at) => refresh_at <= SystemTime::now(),
            None => true,
        }
    }

    /// The value for an `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl std::convert::TryFrom<&Token> for http::header::HeaderValue {
    type Error = Error;

    fn try_from(token: &Token) -> Result<Self, Error> {
        let mut value = http::header::HeaderValue::from_str(&token.header_value())
            .map_err(|e| Error::from(http::Error::from(e)))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Both the token endpoint and the metadata server answer with JSON
/// responses with this schema.
#[derive(serde::Deserialize, Debug)]
pub(crate) struct TokenResponse {
    /// The actual token
    access_token: Option<String>,
    /// The token type, pretty much always Bearer
    token_type: Option<String>,
    /// The time until the token expires and a new one needs to be requested
    expires_in: Option<u64>,
}

impl TokenResponse {
    pub(crate) fn parse(body: &[u8]) -> Result<Token, Error> {
        let response: Self = serde_json::from_slice(body)?;
        response.into_token(SystemTime::now())
    }

    fn into_token(self, now: SystemTime) -> Result<Token, Error> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingField("access_token"))?;
        let token_type = self
            .token_type
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingField("token_type"))?;
        let expires_in = self
            .expires_in
            .ok_or(Error::MissingField("expires_in"))?;
        let expiry = now
            .checked_add(Duration::from_secs(expires_in))
            .ok_or(Error::InvalidField("expires_in"))?;

        Ok(Token {
            access_token,
            token_type,
            expiry,
        })
    }
}
