//! Error types for the entity loader

use std::fmt;

use thiserror::Error;

/// Kinds of entity in the configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Document,
    Area,
    Robot,
    Image,
    Package,
    Global,
    Service,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Document => "document",
            EntityKind::Area => "area",
            EntityKind::Robot => "robot",
            EntityKind::Image => "image",
            EntityKind::Package => "package",
            EntityKind::Global => "global",
            EntityKind::Service => "service",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while building the entity graph
#[derive(Debug, Error)]
pub enum LoadError {
    /// A mandatory field is absent or empty
    #[error("{kind}{} is missing required field '{field}'", describe_id(.id))]
    MissingRequiredField {
        kind: EntityKind,
        id: Option<String>,
        field: String,
    },

    /// An id repeats within its namespace
    #[error("duplicate {kind} id '{id}'{}", describe_within(.within))]
    DuplicateId {
        kind: EntityKind,
        id: String,
        within: Option<String>,
    },

    /// A reference names an entity that was never declared
    #[error("{from_kind} '{from_id}' references unknown {kind} '{id}'{}", describe_suggestions(.suggestions))]
    UnresolvedReference {
        from_kind: EntityKind,
        from_id: String,
        kind: EntityKind,
        id: String,
        suggestions: Vec<String>,
    },

    /// A robot's `ros` field is not `DISTRO[:METADATA]`
    #[error("robot '{robot}' has invalid ros value '{value}': {reason}")]
    InvalidRosFormat {
        robot: String,
        value: String,
        reason: String,
    },

    /// Declarations that cannot hold together
    #[error("{kind} '{id}': {reason}")]
    ConflictingDeclaration {
        kind: EntityKind,
        id: String,
        reason: String,
    },
}

fn describe_id(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" '{}'", id),
        None => String::new(),
    }
}

fn describe_within(within: &Option<String>) -> String {
    match within {
        Some(scope) => format!(" within {}", scope),
        None => String::new(),
    }
}

fn describe_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

impl LoadError {
    pub fn missing(kind: EntityKind, id: Option<&str>, field: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            kind,
            id: id.map(str::to_string),
            field: field.into(),
        }
    }

    pub fn duplicate(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::DuplicateId {
            kind,
            id: id.into(),
            within: None,
        }
    }

    pub fn duplicate_within(
        kind: EntityKind,
        id: impl Into<String>,
        within: impl Into<String>,
    ) -> Self {
        Self::DuplicateId {
            kind,
            id: id.into(),
            within: Some(within.into()),
        }
    }

    pub fn conflicting(kind: EntityKind, id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConflictingDeclaration {
            kind,
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_ros(
        robot: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRosFormat {
            robot: robot.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Get suggestions if available
    pub fn suggestions(&self) -> Option<&[String]> {
        match self {
            Self::UnresolvedReference { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = LoadError::missing(EntityKind::Package, Some("ur"), "command");
        assert_eq!(
            err.to_string(),
            "package 'ur' is missing required field 'command'"
        );

        let err = LoadError::missing(EntityKind::Robot, None, "id");
        assert_eq!(err.to_string(), "robot is missing required field 'id'");
    }

    #[test]
    fn test_unresolved_reference_display() {
        let err = LoadError::UnresolvedReference {
            from_kind: EntityKind::Area,
            from_id: "warehouse".to_string(),
            kind: EntityKind::Robot,
            id: "my-robo".to_string(),
            suggestions: vec!["my-robot".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("unknown robot 'my-robo'"));
        assert!(msg.contains("did you mean: my-robot?"));
        assert_eq!(err.suggestions(), Some(&["my-robot".to_string()][..]));
    }

    #[test]
    fn test_duplicate_within_display() {
        let err = LoadError::duplicate_within(EntityKind::Image, "cam", "robot 'r1'");
        assert_eq!(err.to_string(), "duplicate image id 'cam' within robot 'r1'");
    }
}
