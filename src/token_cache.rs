use crate::{error::Error, token::Token};
use log::debug;
use std::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestReason {
    /// No token has been acquired yet
    Unloaded,
    /// An existing token has expired, or is about to
    Expired,
}

impl std::fmt::Display for RequestReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unloaded => "no token",
            Self::Expired => "token expired",
        })
    }
}

pub enum TokenOrRequestReason {
    Token(Token),
    RequestReason(RequestReason),
}

/// Holds the single token of a provider. Reads never wait on a refresh in
/// progress unless the cached token is unusable, and concurrent refreshes
/// collapse into one.
pub(crate) struct TokenCache {
    token: RwLock<Option<Token>>,
    refresh: Mutex<()>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self {
            token: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Result<TokenOrRequestReason, Error> {
        let cached = self.token.read().map_err(|_e| Error::Poisoned)?;

        let reason = match cached.as_ref() {
            Some(token) if !token.has_expired() => {
                return Ok(TokenOrRequestReason::Token(token.clone()));
            }
            Some(_) => RequestReason::Expired,
            None => RequestReason::Unloaded,
        };

        Ok(TokenOrRequestReason::RequestReason(reason))
    }

    pub fn insert(&self, token: Token) -> Result<(), Error> {
        let mut cached = self.token.write().map_err(|_e| Error::Poisoned)?;
        *cached = Some(token);
        Ok(())
    }

    /// Returns the cached token if it's still valid, otherwise calls
    /// `refresh` to acquire a new one. Only one caller refreshes at a time,
    /// callers that were waiting on it use the token it stored.
    pub fn get_or_refresh<F>(&self, refresh: F) -> Result<Token, Error>
    where
        F: FnOnce(RequestReason) -> Result<Token, Error>,
    {
        if let TokenOrRequestReason::Token(token) = self.get()? {
            return Ok(token);
        }

        let _refreshing = self.refresh.lock().map_err(|_e| Error::Poisoned)?;

        // Someone else may have refreshed while we waited for the lock
        let reason = match self.get()? {
            TokenOrRequestReason::Token(token) => {
                debug!("using token refreshed by a concurrent caller");
                return Ok(token);
            }
            TokenOrRequestReason::RequestReason(reason) => reason,
        };

        let token = refresh(reason)?;
        self.insert(token.clone())?;
        Ok(token)
    }
}
