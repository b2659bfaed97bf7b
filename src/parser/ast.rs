//! Raw document types, as authored in the configuration file
//!
//! These mirror the YAML structure one-to-one. Nothing here is validated
//! beyond YAML typing; required fields are `Option` so the loader can report
//! exactly which one is missing.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

/// Opaque pass-through fields, in declaration order
pub type Fields = IndexMap<String, Value>;

/// Root of a configuration document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDocument {
    pub areas: Option<Vec<RawArea>>,
    #[serde(default)]
    pub robots: Vec<RawRobot>,
    #[serde(default)]
    pub images: Vec<RawImage>,
    #[serde(default)]
    pub packages: Vec<RawPackage>,
    #[serde(default)]
    pub globals: Vec<RawGlobal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawArea {
    pub id: Option<String>,
    pub robots: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRobot {
    pub id: Option<String>,
    pub ros: Option<String>,
    pub images: Option<Vec<String>>,
    pub packages: Option<Vec<String>>,
    pub vars: Option<RawVars>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// User variables on a robot
///
/// Accepted either as a list of single-entry mappings (`- NAME: value`),
/// which preserves duplicates, or as a plain mapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawVars {
    List(Vec<IndexMap<String, Value>>),
    Map(IndexMap<String, Value>),
}

impl RawVars {
    /// Flatten into `(name, value)` pairs in declaration order
    pub fn entries(&self) -> Vec<(&str, &Value)> {
        match self {
            RawVars::List(items) => items
                .iter()
                .flat_map(|item| item.iter().map(|(k, v)| (k.as_str(), v)))
                .collect(),
            RawVars::Map(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    pub id: Option<String>,
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPackage {
    pub id: Option<String>,
    pub path: Option<String>,
    pub command: Option<String>,
    pub apt: Option<Vec<String>>,
    pub git: Option<Vec<String>>,
    pub rosinstall: Option<String>,
    pub ssh: Option<Vec<String>>,
    pub files: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Fields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGlobal {
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Fields,
}

/// Render a scalar YAML value as the text a template variable expands to
///
/// Returns None for sequences, mappings and null.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vars_list_form_keeps_order_and_duplicates() {
        let vars: RawVars = serde_yaml::from_str("- A: 1\n- B: two\n- A: 3\n").unwrap();
        let entries: Vec<_> = vars
            .entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), scalar_text(v).unwrap()))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two".to_string()),
                ("A".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_vars_map_form() {
        let vars: RawVars = serde_yaml::from_str("UR_VERSION: 10\nGUI: false\n").unwrap();
        let entries = vars.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "UR_VERSION");
        assert_eq!(scalar_text(entries[1].1), Some("false".to_string()));
    }

    #[test]
    fn test_extra_fields_preserve_order() {
        let image: RawImage =
            serde_yaml::from_str("id: cam\nimage: ros\nvolumes: [a:/a]\nenvironment: [X=1]\nprivileged: true\n")
                .unwrap();
        let keys: Vec<_> = image.extra.keys().cloned().collect();
        assert_eq!(keys, vec!["volumes", "environment", "privileged"]);
    }

    #[test]
    fn test_scalar_text_rejects_collections() {
        assert_eq!(scalar_text(&Value::Null), None);
        assert_eq!(scalar_text(&Value::Sequence(vec![])), None);
        assert_eq!(scalar_text(&Value::from(1.5)), Some("1.5".to_string()));
    }
}
