use crate::error::Error;
use log::{debug, warn};
use std::{path::Path, sync::OnceLock};

const NEW_STYLE_DOMAIN: &str = ".iam.gserviceaccount.com";

/// Minimal parts needed from a service account key, as found in the JSON
/// key file downloaded from the cloud console.
#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// The unique id used as the issuer of the JWT claim
    #[serde(default)]
    pub client_email: String,
    /// The PEM encoded private key we use to sign
    #[serde(default)]
    pub private_key: String,
    /// The project the key was created in, not present in older keys
    #[serde(default)]
    pub project_id: Option<String>,
}

impl Credentials {
    /// Deserializes credentials from a byte slice. This data is typically
    /// acquired by reading a service account JSON file from disk
    pub fn deserialize<T>(key_data: T) -> Result<Self, Error>
    where
        T: AsRef<[u8]>,
    {
        let credentials: Self = serde_json::from_slice(key_data.as_ref())?;
        Ok(credentials)
    }

    /// True if there is enough here to sign a token assertion
    pub fn is_usable(&self) -> bool {
        !self.client_email.is_empty() && !self.private_key.is_empty()
    }

    /// The project these credentials belong to, either stated explicitly in
    /// the key file or inferred from the account's email. Legacy
    /// `developer.gserviceaccount.com` accounts carry no project.
    pub fn project_id(&self) -> String {
        match self.project_id.as_deref() {
            Some(project_id) if !project_id.is_empty() => project_id.to_owned(),
            _ => project_id_from_email(&self.client_email),
        }
    }
}

/// Extracts `<project-id>` from `<name>@<project-id>.iam.gserviceaccount.com`
fn project_id_from_email(email: &str) -> String {
    email
        .split_once('@')
        .and_then(|(_, domain)| domain.strip_suffix(NEW_STYLE_DOMAIN))
        .filter(|project| !project.is_empty() && !project.contains('.'))
        .unwrap_or_default()
        .to_owned()
}

/// Loads a credentials file the first time it is asked for, and hands out
/// that same value for as long as the store lives.
#[derive(Debug, Default)]
pub struct CredentialStore {
    credentials: OnceLock<Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the credentials in `path`, reading the file only on the first
    /// call. A missing path, unreadable file or malformed JSON all result in
    /// empty credentials.
    pub fn load(&self, path: Option<&Path>) -> &Credentials {
        self.credentials.get_or_init(|| match path {
            Some(path) => read_credentials(path),
            None => Credentials::default(),
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.credentials.get().is_some()
    }
}

fn read_credentials(path: &Path) -> Credentials {
    let key_data = match std::fs::read(path) {
        Ok(kd) => kd,
        Err(err) => {
            debug!("unable to read credentials {}: {}", path.display(), err);
            return Credentials::default();
        }
    };

    match Credentials::deserialize(key_data) {
        Ok(credentials) => {
            debug!(
                "loaded credentials for {} from {}",
                credentials.client_email,
                path.display()
            );
            credentials
        }
        Err(err) => {
            warn!("ignoring malformed credentials {}: {}", path.display(), err);
            Credentials::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn creds(email: &str, project_id: Option<&str>) -> Credentials {
        Credentials {
            client_email: email.to_owned(),
            private_key: "some_key".to_owned(),
            project_id: project_id.map(str::to_owned),
        }
    }

    #[test]
    fn project_id_inference() {
        assert_eq!(
            creds("user@my-project.iam.gserviceaccount.com", None).project_id(),
            "my-project"
        );
        assert_eq!(
            creds("12345-hash@developer.gserviceaccount.com", None).project_id(),
            ""
        );
        assert_eq!(creds("user@example.com", None).project_id(), "");
        assert_eq!(creds("", None).project_id(), "");
    }

    #[test]
    fn explicit_project_id_wins() {
        assert_eq!(
            creds("user@email-project.iam.gserviceaccount.com", Some("my-project")).project_id(),
            "my-project"
        );
        assert_eq!(
            creds("user@email-project.iam.gserviceaccount.com", Some("")).project_id(),
            "email-project"
        );
    }

    #[test]
    fn missing_path_is_empty() {
        let store = CredentialStore::new();
        assert_eq!(store.load(None), &Credentials::default());
        assert!(store.is_loaded());

        let store = CredentialStore::new();
        let creds = store.load(Some(Path::new("/nonexistent/creds.json")));
        assert!(!creds.is_usable());
    }

    #[test]
    fn malformed_file_is_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"client_email\": ").unwrap();

        let store = CredentialStore::new();
        assert_eq!(store.load(Some(file.path())), &Credentials::default());
    }

    #[test]
    fn loads_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"client_email":"user@example.com","private_key":"some_key","type":"service_account"}"#)
            .unwrap();

        let store = CredentialStore::new();
        assert!(!store.is_loaded());
        assert_eq!(store.load(Some(file.path())).client_email, "user@example.com");

        std::fs::write(
            file.path(),
            r#"{"client_email":"changed@example.com","private_key":"12345"}"#,
        )
        .unwrap();

        let creds = store.load(Some(file.path()));
        assert_eq!(creds.client_email, "user@example.com");
        assert_eq!(creds.private_key, "some_key");
    }
}
