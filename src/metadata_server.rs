use crate::error::Error;
use log::{debug, warn};
use std::time::Duration;

/// The root of the metadata service on GCE and GKE nodes
pub const DEFAULT_METADATA_SERVER_URL: &str = "http://metadata.google.internal/computeMetadata/v1/";

/// Default deadline for a single metadata lookup
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimal client for the instance metadata service.
#[derive(Clone, Debug)]
pub struct MetadataServerClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl MetadataServerClient {
    /// Creates a client for the given base URL, or the well known link-local
    /// metadata server if `None`
    pub fn new(base_url: Option<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: Option<String>, timeout: Duration) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_METADATA_SERVER_URL.to_owned());

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!("failed to build metadata client, using defaults: {}", err);
                reqwest::blocking::Client::new()
            });

        Self { base_url, client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins a path relative to the metadata root onto the base URL
    pub(crate) fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Fetches the raw body at `path`, failing on transport errors and
    /// non-2xx responses.
    pub fn fetch(&self, path: &str) -> Result<String, Error> {
        let response = self
            .client
            .get(self.url(path))
            // To get responses from GCE, we must pass along the
            // Metadata-Flavor header with a value of "Google".
            .header("Metadata-Flavor", "Google")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus(status));
        }

        Ok(response.text()?)
    }

    /// Fetches the body at `path`, returning an empty string if the metadata
    /// server can't be reached or doesn't know the path.
    pub fn get_metadata_string(&self, path: &str) -> String {
        match self.fetch(path) {
            Ok(body) => body,
            Err(err) => {
                debug!("metadata lookup of '{}' failed: {}", path, err);
                String::new()
            }
        }
    }
}

impl Default for MetadataServerClient {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_base_url() {
        let client = MetadataServerClient::new(None);
        assert_eq!(client.base_url(), DEFAULT_METADATA_SERVER_URL);
        assert_eq!(
            client.url("instance/id"),
            "http://metadata.google.internal/computeMetadata/v1/instance/id"
        );
    }

    #[test]
    fn joins_paths_regardless_of_slashes() {
        let client = MetadataServerClient::new(Some("http://127.0.0.1:8080".to_owned()));
        assert_eq!(client.url("/project/project-id"), "http://127.0.0.1:8080/project/project-id");

        let client = MetadataServerClient::new(Some("http://127.0.0.1:8080/".to_owned()));
        assert_eq!(client.url("project/project-id"), "http://127.0.0.1:8080/project/project-id");
    }

    #[test]
    fn unreachable_server_is_empty() {
        // Nothing listens on the discard port
        let client = MetadataServerClient::with_timeout(
            Some("http://127.0.0.1:9/".to_owned()),
            Duration::from_millis(500),
        );
        assert_eq!(client.get_metadata_string("instance/id"), "");
        assert!(client.fetch("instance/id").is_err());
    }
}
