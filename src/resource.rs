use std::{collections::BTreeMap, time::SystemTime};

/// A typed, labelled reference to a monitored entity, eg a `gce_instance`
/// with its `instance_id` and `zone`.
#[derive(serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub labels: BTreeMap<String, String>,
}

impl MonitoredResource {
    pub fn new<I, K, V>(kind: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind: kind.into(),
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One record produced by a metadata query cycle
#[derive(serde::Serialize, Debug, Clone, PartialEq)]
pub struct ResourceMetadata {
    /// Local resource ids this record can be looked up by
    pub ids: Vec<String>,
    pub resource: MonitoredResource,
    /// The raw object describing the resource
    pub metadata: serde_json::Value,
    #[serde(skip)]
    pub collected_at: SystemTime,
}
