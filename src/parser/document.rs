//! YAML document parsing

use tracing::debug;

use super::ast::RawDocument;
use crate::error::ParseError;

/// Parse a configuration document from YAML source
pub fn parse(source: &str) -> Result<RawDocument, ParseError> {
    if source.trim().is_empty() {
        return Ok(RawDocument::default());
    }

    let doc: RawDocument =
        serde_yaml::from_str(source).map_err(|e| ParseError::from_yaml(e, source))?;

    debug!(
        areas = doc.areas.as_ref().map_or(0, Vec::len),
        robots = doc.robots.len(),
        images = doc.images.len(),
        packages = doc.packages.len(),
        globals = doc.globals.len(),
        "parsed configuration document"
    );

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_document() {
        let source = r#"
areas:
  - id: warehouse
    robots: [my-robot]
robots:
  - id: my-robot
    ros: melodic
    packages: [universal_robot]
    vars:
      - UR_VERSION: 10
packages:
  - id: universal_robot
    path: ./packages
    apt: [ros-melodic-universal-robot]
    command: roslaunch ur_gazebo ur{{UR_VERSION}}.launch gui:=false
globals:
  - id: portainer
    image: portainer/portainer
"#;
        let doc = parse(source).expect("Should parse");
        let areas = doc.areas.expect("areas present");
        assert_eq!(areas.len(), 1);
        assert_eq!(areas[0].robots.as_deref(), Some(&["my-robot".to_string()][..]));
        assert_eq!(doc.robots[0].ros.as_deref(), Some("melodic"));
        assert_eq!(doc.packages[0].apt.as_ref().map(Vec::len), Some(1));
        assert!(doc.globals[0].extra.contains_key("image"));
    }

    #[test]
    fn test_empty_document_has_no_areas() {
        let doc = parse("   \n").expect("Should parse");
        assert!(doc.areas.is_none());
    }

    #[test]
    fn test_unknown_top_level_section_rejected() {
        let result = parse("areas: []\nrobot: []\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let result = parse("areas:\n  - id: [unclosed\n");
        assert!(matches!(result, Err(ParseError::Syntax { .. })));
    }
}
