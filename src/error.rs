use std::{error::Error as Err, fmt};

#[derive(Debug)]
pub enum Error {
    /// The private_key field of the credentials file is not a PEM encoded
    /// PKCS#8 key
    InvalidKeyFormat,
    /// Unable to decode the base64 body of the PEM encoded key
    Base64Decode(data_encoding::DecodeError),
    /// An error occurred trying to build an HTTP request
    Http(http::Error),
    /// The HTTP client failed to send a request or read its response, this
    /// includes connection failures and timeouts
    Transport(reqwest::Error),
    /// Failed to retrieve an oauth token, and were unable to deserialize a
    /// more exact reason from the error response
    HttpStatus(http::StatusCode),
    /// Failed to de/serialize JSON
    Json(serde_json::Error),
    /// A token response was missing a required field, or had it empty
    MissingField(&'static str),
    /// A token response had a field with a value we can't use
    InvalidField(&'static str),
    /// The token endpoint rejected our request
    Auth(AuthError),
    /// The system clock is set before the unix epoch
    Time(std::time::SystemTimeError),
    /// The RSA key seems valid, but is unable to sign a payload
    InvalidRsaKey(ring::error::Unspecified),
    /// The RSA key is invalid and cannot be used to sign
    InvalidRsaKeyRejected(ring::error::KeyRejected),
    /// A mutex has been poisoned due to a panic while a lock was held
    Poisoned,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #![allow(clippy::enum_glob_use)]
        use Error::*;

        match self {
            InvalidKeyFormat => f.write_str("The key format is invalid or unknown"),
            Base64Decode(err) => write!(f, "{}", err),
            Http(err) => write!(f, "{}", err),
            Transport(err) => write!(f, "HTTP request failed: {}", err),
            HttpStatus(sc) => write!(f, "HTTP error status: {}", sc),
            Json(err) => write!(f, "{}", err),
            MissingField(name) => write!(f, "token response is missing '{}'", name),
            InvalidField(name) => write!(f, "token response has an invalid '{}'", name),
            Auth(err) => write!(f, "{}", err),
            Time(err) => write!(f, "{}", err),
            InvalidRsaKey(_err) => f.write_str("RSA key is invalid"),
            InvalidRsaKeyRejected(err) => write!(f, "RSA key is invalid: {}", err),
            Poisoned => f.write_str("A mutex is poisoned"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn Err + 'static)> {
        use Error::{Auth, Base64Decode, Http, Json, Time, Transport};

        match self {
            Base64Decode(err) => Some(err as &dyn Err),
            Http(err) => Some(err as &dyn Err),
            Transport(err) => Some(err as &dyn Err),
            Json(err) => Some(err as &dyn Err),
            Auth(err) => Some(err as &dyn Err),
            Time(err) => Some(err as &dyn Err),
            _ => None,
        }
    }
}

impl From<data_encoding::DecodeError> for Error {
    fn from(e: data_encoding::DecodeError) -> Self {
        Error::Base64Decode(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::Http(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<std::time::SystemTimeError> for Error {
    fn from(e: std::time::SystemTimeError) -> Self {
        Error::Time(e)
    }
}

#[derive(serde::Deserialize, Debug)]
pub struct AuthError {
    /// Top level error type
    pub error: Option<String>,
    /// More specific details on the error
    pub error_description: Option<String>,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref err) = self.error {
            write!(f, "{}", err)?;

            if let Some(ref desc) = self.error_description {
                write!(f, " desc: {}", desc)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for AuthError {}
