#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

//! Identity and credentials for a metadata agent running on a cloud
//! instance, optionally as part of a Kubernetes cluster.
//!
//! [`Environment`] answers questions like "which project and zone am I in"
//! from configuration or the instance metadata server, and [`OAuth2`] turns
//! the resulting identity into `Authorization` headers.

pub mod config;
pub mod credentials;
pub mod environment;
pub mod jwt;
pub mod kube_env;
pub mod kubernetes;
pub mod metadata_server;
pub mod oauth2;
pub mod resource;
pub mod sign;

mod error;
mod token;
mod token_cache;

pub use config::Configuration;
pub use credentials::{CredentialStore, Credentials};
pub use environment::Environment;
pub use error::{AuthError, Error};
pub use kubernetes::{KubernetesReader, QueryContext, ResourceSource};
pub use metadata_server::MetadataServerClient;
pub use oauth2::OAuth2;
pub use resource::{MonitoredResource, ResourceMetadata};
pub use sign::{JwtSigner, RsaSigner};
pub use token::Token;
pub use token_cache::RequestReason;
