//! Acquisition of OAuth2 access tokens for outbound API calls.
//!
//! If the environment has service account credentials, a signed JWT
//! assertion is exchanged at the token endpoint. Otherwise the instance's
//! default service account token is requested from the metadata server.

use crate::{
    environment::Environment,
    error::{AuthError, Error},
    jwt::Claims,
    sign::{JwtSigner, RsaSigner},
    token::{Token, TokenResponse},
    token_cache::{RequestReason, TokenCache},
};
use log::{info, warn};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v3/token";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Deadline for a single token request
pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const METADATA_TOKEN_PATH: &str = "instance/service-accounts/default/token";

/// Lifetime requested for assertions, with some wiggle room near the hour mark
const ASSERTION_LIFETIME_SECS: i64 = 3600 - 5;

/// Produces `Authorization` header values for the identity of an
/// [`Environment`], caching the token until it's about to expire.
pub struct OAuth2 {
    environment: Arc<Environment>,
    token_endpoint: String,
    scopes: Option<Vec<String>>,
    signer: Box<dyn JwtSigner>,
    client: reqwest::blocking::Client,
    cache: TokenCache,
}

impl OAuth2 {
    pub fn new(environment: Arc<Environment>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!("failed to build token client, using defaults: {}", err);
                reqwest::blocking::Client::new()
            });

        Self {
            environment,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_owned(),
            scopes: None,
            signer: Box::new(RsaSigner::default()),
            client,
            cache: TokenCache::new(),
        }
    }

    /// Sends assertions to `endpoint` instead of the default token endpoint
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    /// Requests tokens for these scopes rather than the defaults
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_signer(mut self, signer: impl JwtSigner + 'static) -> Self {
        self.signer = Box::new(signer);
        self
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// Returns a valid token, only going to the network if the cached one
    /// has expired. Failures to acquire a token are always reported.
    pub fn get_token(&self) -> Result<Token, Error> {
        self.cache.get_or_refresh(|reason| self.request_token(reason))
    }

    /// Returns `"Bearer <access_token>"` for a valid token
    pub fn get_auth_header_value(&self) -> Result<String, Error> {
        Ok(self.get_token()?.header_value())
    }

    fn request_token(&self, reason: RequestReason) -> Result<Token, Error> {
        let credentials = self.environment.credentials();

        let (flow, token) = if credentials.is_usable() {
            let token = self.token_from_assertion(&credentials.client_email, &credentials.private_key)?;
            ("service account assertion", token)
        } else {
            ("metadata server", self.token_from_metadata_server()?)
        };

        info!(
            "acquired a new access token from the {} ({}), valid for {}s",
            flow,
            reason,
            token
                .expiry
                .duration_since(SystemTime::now())
                .unwrap_or_default()
                .as_secs()
        );

        Ok(token)
    }

    fn token_from_assertion(&self, client_email: &str, private_key: &str) -> Result<Token, Error> {
        let issued_at = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)?
            .as_secs() as i64;

        let scope = match &self.scopes {
            Some(scopes) => scopes.join(" "),
            None => DEFAULT_SCOPE.to_owned(),
        };

        let claims = Claims {
            issuer: client_email.to_owned(),
            audience: self.token_endpoint.clone(),
            expiration: issued_at + ASSERTION_LIFETIME_SECS,
            issued_at,
            subject: None,
            scope,
        };

        let assertion = self.signer.sign(&claims, private_key)?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", GRANT_TYPE)
            .append_pair("assertion", &assertion)
            .finish();

        let response = self
            .client
            .post(&self.token_endpoint)
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()?;

        parse_token_response(response)
    }

    fn token_from_metadata_server(&self) -> Result<Token, Error> {
        let metadata_server = self.environment.metadata_server();

        let mut url = metadata_server.url(METADATA_TOKEN_PATH);

        // If we have any scopes, pass them along in the querystring.
        if let Some(scopes) = &self.scopes {
            if !scopes.is_empty() {
                url.push_str("?scopes=");
                url.push_str(&scopes.join(","));
            }
        }

        let response = self
            .client
            .get(url)
            .header("Metadata-Flavor", "Google")
            .send()?;

        parse_token_response(response)
    }
}

impl std::fmt::Debug for OAuth2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2")
            .field("token_endpoint", &self.token_endpoint)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

fn parse_token_response(response: reqwest::blocking::Response) -> Result<Token, Error> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let body = response.bytes()?;

    if !status.is_success() {
        if is_json {
            if let Ok(auth_error) = serde_json::from_slice::<AuthError>(&body) {
                if auth_error.error.is_some() {
                    return Err(Error::Auth(auth_error));
                }
            }
        }

        return Err(Error::HttpStatus(status));
    }

    TokenResponse::parse(&body)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{config::Configuration, metadata_server::MetadataServerClient};
    use httptest::{all_of, matchers::*, responders::*, Expectation, Server};
    use std::io::Write;

    const TOKEN_BODY: &str =
        r#"{"access_token": "the-access-token", "token_type": "Bearer", "expires_in": 3600}"#;

    fn credentials_file() -> tempfile::NamedTempFile {
        let contents = serde_json::json!({
            "client_email": "user@my-project.iam.gserviceaccount.com",
            "private_key": crate::sign::test::test_pem(),
        });

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.to_string().as_bytes()).unwrap();
        file
    }

    fn environment(server: &Server, config: Configuration) -> Arc<Environment> {
        Arc::new(Environment::with_metadata_server(
            config,
            MetadataServerClient::new(Some(server.url_str("/"))),
        ))
    }

    #[test]
    fn assertion_is_signed_with_credentials() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/oauth2/v3/token"),
                request::headers(contains((
                    "content-type",
                    "application/x-www-form-urlencoded"
                ))),
                request::body(url_decoded(contains(("grant_type", GRANT_TYPE)))),
                request::body(url_decoded(contains(key("assertion")))),
            ])
            .respond_with(
                status_code(200)
                    .insert_header("Content-Type", "application/json; charset=utf-8")
                    .body(TOKEN_BODY),
            ),
        );

        let creds = credentials_file();
        let config =
            Configuration::new().with_credentials_file(creds.path().to_string_lossy());
        let auth = OAuth2::new(environment(&server, config))
            .with_token_endpoint(server.url_str("/oauth2/v3/token"));

        assert_eq!(auth.get_auth_header_value().unwrap(), "Bearer the-access-token");
        // Served from the cache, the server only expects one request
        assert_eq!(auth.get_auth_header_value().unwrap(), "Bearer the-access-token");
    }

    #[test]
    fn unusable_key_fails() {
        let server = Server::run();

        let mut creds = tempfile::NamedTempFile::new().unwrap();
        creds
            .write_all(br#"{"client_email":"user@example.com","private_key":"some_key"}"#)
            .unwrap();
        let config =
            Configuration::new().with_credentials_file(creds.path().to_string_lossy());
        let auth = OAuth2::new(environment(&server, config))
            .with_token_endpoint(server.url_str("/oauth2/v3/token"));

        assert!(matches!(
            auth.get_auth_header_value(),
            Err(Error::InvalidKeyFormat)
        ));
    }

    #[test]
    fn metadata_flow_passes_explicit_scopes() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("GET", "/instance/service-accounts/default/token"),
                request::headers(contains(("metadata-flavor", "Google"))),
                request::query(url_decoded(contains(("scopes", "scope1,scope2")))),
            ])
            .respond_with(status_code(200).body(TOKEN_BODY)),
        );

        let auth = OAuth2::new(environment(&server, Configuration::new()))
            .with_scopes(["scope1", "scope2"]);

        let token = auth.get_token().unwrap();
        assert_eq!(token.access_token, "the-access-token");
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn auth_errors_are_reported() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/oauth2/v3/token")).respond_with(
                status_code(400)
                    .insert_header("Content-Type", "application/json; charset=utf-8")
                    .body(r#"{"error": "invalid_grant", "error_description": "Invalid JWT Signature."}"#),
            ),
        );

        let creds = credentials_file();
        let config =
            Configuration::new().with_credentials_file(creds.path().to_string_lossy());
        let auth = OAuth2::new(environment(&server, config))
            .with_token_endpoint(server.url_str("/oauth2/v3/token"));

        match auth.get_auth_header_value() {
            Err(Error::Auth(err)) => {
                assert_eq!(err.error.as_deref(), Some("invalid_grant"));
            }
            other => panic!("expected an auth error, got {:?}", other),
        }
    }
}
