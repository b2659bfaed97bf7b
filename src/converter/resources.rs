//! Top-level network and volume declarations

use indexmap::IndexSet;
use serde_yaml::Value;

use super::model::{NetworkDecl, Service};

/// Area networks in area order, then every other network a service names
pub fn collect_networks(area_ids: &[&str], services: &[Service]) -> Vec<NetworkDecl> {
    let mut networks: Vec<NetworkDecl> = area_ids
        .iter()
        .map(|id| NetworkDecl {
            name: crate::loader::area_network(id),
            area: Some(id.to_string()),
        })
        .collect();

    let mut seen: IndexSet<String> = networks.iter().map(|n| n.name.clone()).collect();
    for service in services {
        for name in entry_names(service.fields.get("networks")) {
            if seen.insert(name.clone()) {
                networks.push(NetworkDecl { name, area: None });
            }
        }
    }

    networks
}

/// Named volumes, in first-use order
///
/// Host bind mounts and anonymous volumes are not declared.
pub fn collect_volumes(services: &[Service]) -> Vec<String> {
    let mut volumes = IndexSet::new();
    for service in services {
        if let Some(Value::Sequence(entries)) = service.fields.get("volumes") {
            for entry in entries {
                if let Some(label) = volume_label(entry) {
                    volumes.insert(label);
                }
            }
        }
    }
    volumes.into_iter().collect()
}

/// Label of a named volume mount, if `entry` is one
///
/// Short form `SOURCE:TARGET[:MODE]` names a volume when SOURCE is not a
/// path; long form does when `type` is `volume`.
pub fn volume_label(entry: &Value) -> Option<String> {
    match entry {
        Value::String(spec) => {
            let (source, _) = spec.split_once(':')?;
            is_label(source).then(|| source.to_string())
        }
        Value::Mapping(map) => {
            let kind = map.get("type").and_then(Value::as_str);
            let source = map.get("source").and_then(Value::as_str)?;
            (kind == Some("volume") && is_label(source)).then(|| source.to_string())
        }
        _ => None,
    }
}

fn is_label(source: &str) -> bool {
    !source.is_empty()
        && !source.contains('/')
        && !source.starts_with('.')
        && !source.starts_with('~')
        && !source.starts_with('$')
}

/// Names in a list-or-mapping field
fn entry_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::Mapping(map)) => map
            .keys()
            .filter_map(|key| key.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
