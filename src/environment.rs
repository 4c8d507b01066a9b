//! Discovery of the deployment context the agent runs in.
//!
//! Every property is resolved from the [`Configuration`] first, and only
//! falls back to the metadata server when nothing is configured. Metadata
//! lookups are repeated on each call, only the credentials file is cached.

use crate::{
    config::{non_empty, Configuration},
    credentials::{CredentialStore, Credentials},
    kube_env,
    metadata_server::MetadataServerClient,
    resource::MonitoredResource,
};
use std::path::Path;

/// Used when the resource type isn't configured
pub const DEFAULT_INSTANCE_RESOURCE_TYPE: &str = "gce_instance";

pub struct Environment {
    config: Configuration,
    metadata_server: MetadataServerClient,
    credentials: CredentialStore,
}

impl Environment {
    pub fn new(config: Configuration) -> Self {
        Self::with_metadata_server(config, MetadataServerClient::default())
    }

    /// Creates an environment that talks to the given metadata server
    /// instead of the default one
    pub fn with_metadata_server(config: Configuration, metadata_server: MetadataServerClient) -> Self {
        Self {
            config,
            metadata_server,
            credentials: CredentialStore::new(),
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn metadata_server(&self) -> &MetadataServerClient {
        &self.metadata_server
    }

    /// See [`MetadataServerClient::get_metadata_string`]
    pub fn get_metadata_string(&self, path: &str) -> String {
        self.metadata_server.get_metadata_string(path)
    }

    /// The service account credentials from the configured credentials file,
    /// read on first use
    pub fn credentials(&self) -> &Credentials {
        let path = non_empty(&self.config.credentials_file).map(Path::new);
        self.credentials.load(path)
    }

    pub fn credentials_client_email(&self) -> &str {
        &self.credentials().client_email
    }

    pub fn credentials_private_key(&self) -> &str {
        &self.credentials().private_key
    }

    pub fn instance_id(&self) -> String {
        self.configured_or(&self.config.instance_id, || {
            self.get_metadata_string("instance/id")
        })
    }

    pub fn instance_resource_type(&self) -> String {
        self.configured_or(&self.config.instance_resource_type, || {
            DEFAULT_INSTANCE_RESOURCE_TYPE.to_owned()
        })
    }

    pub fn instance_zone(&self) -> String {
        self.configured_or(&self.config.instance_zone, || {
            // The metadata server answers with "projects/<num>/zones/<zone>"
            last_segment(&self.get_metadata_string("instance/zone"))
        })
    }

    pub fn project_id(&self) -> String {
        self.configured_or(&self.config.project_id, || {
            let project_id = self.credentials().project_id();
            if !project_id.is_empty() {
                return project_id;
            }

            self.get_metadata_string("project/project-id")
        })
    }

    /// The numeric project id, which only the metadata server knows about.
    /// Empty if the server is unavailable or answers with a non-number.
    pub fn numeric_project_id(&self) -> String {
        let value = self.get_metadata_string("project/numeric-project-id");
        let value = value.trim();

        match value.parse::<u64>() {
            Ok(_) => value.to_owned(),
            Err(_) => String::new(),
        }
    }

    pub fn kubernetes_cluster_name(&self) -> String {
        self.configured_or(&self.config.kubernetes_cluster_name, || {
            self.get_metadata_string("instance/attributes/cluster-name")
        })
    }

    pub fn kubernetes_cluster_location(&self) -> String {
        self.configured_or(&self.config.kubernetes_cluster_location, || {
            let location = self.get_metadata_string("instance/attributes/cluster-location");
            if !location.is_empty() {
                return last_segment(&location);
            }

            // Older clusters only record their zone in the bootstrap env
            kube_env::extract_zone(&self.get_metadata_string("instance/attributes/kube-env"))
        })
    }

    /// The monitored resource describing the instance the agent runs on
    pub fn instance_resource(&self) -> MonitoredResource {
        MonitoredResource::new(
            self.instance_resource_type(),
            [
                ("instance_id", self.instance_id()),
                ("zone", self.instance_zone()),
            ],
        )
    }

    fn configured_or<F>(&self, configured: &Option<String>, fallback: F) -> String
    where
        F: FnOnce() -> String,
    {
        match non_empty(configured) {
            Some(value) => value.to_owned(),
            None => fallback(),
        }
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("config", &self.config)
            .field("metadata_server", &self.metadata_server.base_url())
            .finish_non_exhaustive()
    }
}

fn last_segment(value: &str) -> String {
    value
        .trim()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_owned()
}
