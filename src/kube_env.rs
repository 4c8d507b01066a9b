//! Decoding of the `kube-env` instance attribute, a flat `KEY: value` blob
//! written by the cluster bootstrap.

const ZONE_KEY: &str = "ZONE";

/// Returns the value of the `ZONE` entry in a kube-env blob, or an empty
/// string if there isn't one.
pub fn extract_zone(kube_env: &str) -> String {
    lookup(kube_env, ZONE_KEY).unwrap_or_default()
}

/// Finds the scalar value for `key`. Lines that aren't `KEY: value` pairs
/// are skipped.
pub(crate) fn lookup(kube_env: &str, key: &str) -> Option<String> {
    kube_env.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        if k.trim() != key {
            return None;
        }

        Some(unquote(v.trim()).to_owned())
    })
}

fn unquote(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }

    value
}
