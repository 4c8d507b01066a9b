use crate::{
    environment::Environment, error::Error, oauth2::OAuth2, resource::ResourceMetadata,
};
use log::debug;
use std::sync::Arc;

/// Everything a [`ResourceSource`] needs to run one authenticated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    /// Value for the `Authorization` header, eg `Bearer ya29...`
    pub auth_header: String,
    pub project_id: String,
    pub cluster_name: String,
    pub cluster_location: String,
    pub instance_zone: String,
}

/// The API client that enumerates cluster objects and turns them into
/// [`ResourceMetadata`] records.
pub trait ResourceSource {
    fn query(&self, context: &QueryContext) -> Result<Vec<ResourceMetadata>, Error>;
}

impl<F> ResourceSource for F
where
    F: Fn(&QueryContext) -> Result<Vec<ResourceMetadata>, Error>,
{
    fn query(&self, context: &QueryContext) -> Result<Vec<ResourceMetadata>, Error> {
        self(context)
    }
}

/// Runs the per-cycle Kubernetes metadata query with fresh credentials.
pub struct KubernetesReader<S> {
    environment: Arc<Environment>,
    auth: OAuth2,
    source: S,
}

impl<S: ResourceSource> KubernetesReader<S> {
    pub fn new(environment: Arc<Environment>, source: S) -> Self {
        let auth = OAuth2::new(environment.clone());
        Self::with_auth(auth, source)
    }

    /// Uses an already configured token provider, and its environment
    pub fn with_auth(auth: OAuth2, source: S) -> Self {
        Self {
            environment: auth.environment().clone(),
            auth,
            source,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// One metadata query cycle. Fails without querying if no valid
    /// authorization can be obtained.
    pub fn metadata_query(&self) -> Result<Vec<ResourceMetadata>, Error> {
        let auth_header = self.auth.get_auth_header_value()?;

        let context = QueryContext {
            auth_header,
            project_id: self.environment.project_id(),
            cluster_name: self.environment.kubernetes_cluster_name(),
            cluster_location: self.environment.kubernetes_cluster_location(),
            instance_zone: self.environment.instance_zone(),
        };

        let resources = self.source.query(&context)?;
        debug!(
            "kubernetes query for cluster '{}' returned {} resources",
            context.cluster_name,
            resources.len()
        );

        Ok(resources)
    }
}
