//! The resolved key/value settings the identity core consumes from the
//! agent's configuration.

/// Keys recognized by [`Configuration::from_pairs`]
pub const INSTANCE_ID: &str = "InstanceId";
pub const INSTANCE_RESOURCE_TYPE: &str = "InstanceResourceType";
pub const INSTANCE_ZONE: &str = "InstanceZone";
pub const PROJECT_ID: &str = "ProjectId";
pub const KUBERNETES_CLUSTER_LOCATION: &str = "KubernetesClusterLocation";
pub const KUBERNETES_CLUSTER_NAME: &str = "KubernetesClusterName";
pub const CREDENTIALS_FILE: &str = "CredentialsFile";

/// Explicitly configured identity values. Every field is optional, and an
/// empty value is treated exactly like an absent one.
#[derive(serde::Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase", default)]
pub struct Configuration {
    pub instance_id: Option<String>,
    pub instance_resource_type: Option<String>,
    pub instance_zone: Option<String>,
    pub project_id: Option<String>,
    pub kubernetes_cluster_location: Option<String>,
    pub kubernetes_cluster_name: Option<String>,
    /// Path to a service account JSON key
    pub credentials_file: Option<String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from already parsed `Key: value` pairs. Keys
    /// this crate doesn't consume are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();

        for (key, value) in pairs {
            let slot = match key.as_ref() {
                INSTANCE_ID => &mut config.instance_id,
                INSTANCE_RESOURCE_TYPE => &mut config.instance_resource_type,
                INSTANCE_ZONE => &mut config.instance_zone,
                PROJECT_ID => &mut config.project_id,
                KUBERNETES_CLUSTER_LOCATION => &mut config.kubernetes_cluster_location,
                KUBERNETES_CLUSTER_NAME => &mut config.kubernetes_cluster_name,
                CREDENTIALS_FILE => &mut config.credentials_file,
                _ => continue,
            };

            *slot = Some(value.into());
        }

        config
    }

    pub fn with_instance_id(mut self, value: impl Into<String>) -> Self {
        self.instance_id = Some(value.into());
        self
    }

    pub fn with_instance_resource_type(mut self, value: impl Into<String>) -> Self {
        self.instance_resource_type = Some(value.into());
        self
    }

    pub fn with_instance_zone(mut self, value: impl Into<String>) -> Self {
        self.instance_zone = Some(value.into());
        self
    }

    pub fn with_project_id(mut self, value: impl Into<String>) -> Self {
        self.project_id = Some(value.into());
        self
    }

    pub fn with_kubernetes_cluster_location(mut self, value: impl Into<String>) -> Self {
        self.kubernetes_cluster_location = Some(value.into());
        self
    }

    pub fn with_kubernetes_cluster_name(mut self, value: impl Into<String>) -> Self {
        self.kubernetes_cluster_name = Some(value.into());
        self
    }

    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }
}

/// Returns the configured value, unless it is missing or empty
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
