use crate::{
    error::Error,
    jwt::{self, Claims, Header},
};
use ring::signature;
use serde::Serialize;

/// The RSA algorithms supported for signing
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum Algorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    #[default]
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,

    /// RSASSA-PSS using SHA-256
    PS256,
    /// RSASSA-PSS using SHA-384
    PS384,
    /// RSASSA-PSS using SHA-512
    PS512,
}

/// The supported RSA key formats, see the documentation for [`ring::signature::RsaKeyPair`]
/// for more information
pub enum Key<'a> {
    /// An unencrypted PKCS#8-encoded key.
    Pkcs8(&'a [u8]),
}

/// The actual RSA signing + encoding
/// Taken from Ring doc <https://briansmith.org/rustdoc/ring/signature/index.html>
fn sign_rsa(
    alg: &'static dyn signature::RsaEncoding,
    key: Key<'_>,
    signing_input: &str,
) -> Result<String, Error> {
    let key_pair = match key {
        Key::Pkcs8(bytes) => {
            signature::RsaKeyPair::from_pkcs8(bytes).map_err(Error::InvalidRsaKeyRejected)?
        }
    };

    let mut signature = vec![0; key_pair.public().modulus_len()];
    let rng = ring::rand::SystemRandom::new();
    key_pair
        .sign(alg, &rng, signing_input.as_bytes(), &mut signature)
        .map_err(Error::InvalidRsaKey)?;

    Ok(data_encoding::BASE64URL_NOPAD.encode(&signature))
}

/// Take the payload of a JWT, sign it using the algorithm given and return
/// the base64 url safe encoded of the result.
pub fn sign(signing_input: &str, key: Key<'_>, algorithm: Algorithm) -> Result<String, Error> {
    match algorithm {
        Algorithm::RS256 => sign_rsa(&signature::RSA_PKCS1_SHA256, key, signing_input),
        Algorithm::RS384 => sign_rsa(&signature::RSA_PKCS1_SHA384, key, signing_input),
        Algorithm::RS512 => sign_rsa(&signature::RSA_PKCS1_SHA512, key, signing_input),

        Algorithm::PS256 => sign_rsa(&signature::RSA_PSS_SHA256, key, signing_input),
        Algorithm::PS384 => sign_rsa(&signature::RSA_PSS_SHA384, key, signing_input),
        Algorithm::PS512 => sign_rsa(&signature::RSA_PSS_SHA512, key, signing_input),
    }
}

/// Decodes the DER bytes of a PEM encoded private key, as found in the
/// `private_key` field of service account credentials
pub fn decode_pem(private_key: &str) -> Result<Vec<u8>, Error> {
    let key_string = private_key
        .split("-----")
        .nth(2)
        .ok_or(Error::InvalidKeyFormat)?;

    // Strip out all of the newlines
    let key_string = key_string.split_whitespace().fold(
        String::with_capacity(key_string.len()),
        |mut s, line| {
            s.push_str(line);
            s
        },
    );

    Ok(data_encoding::BASE64.decode(key_string.as_bytes())?)
}

/// Turns assertion claims into a signed JWT. The token provider only ever
/// talks to this trait, so the key handling and the algorithm can be
/// swapped out without touching flow selection.
pub trait JwtSigner: Send + Sync {
    fn sign(&self, claims: &Claims, private_key: &str) -> Result<String, Error>;
}

/// Signs with a PEM encoded PKCS#8 RSA key
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaSigner {
    algorithm: Algorithm,
}

impl RsaSigner {
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }
}

impl JwtSigner for RsaSigner {
    fn sign(&self, claims: &Claims, private_key: &str) -> Result<String, Error> {
        let key_bytes = decode_pem(private_key)?;
        jwt::encode(&Header::new(self.algorithm), claims, Key::Pkcs8(&key_bytes))
    }
}
