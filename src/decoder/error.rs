//! Error types for variable decoding

use thiserror::Error;

use crate::loader::EntityKind;

/// Errors that can occur while decoding template variables
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A placeholder names a variable that is not in the entity's scope
    #[error("unresolved template variable '{token}' in {kind} '{id}' field '{field}' (robot '{robot}')")]
    UnresolvedVariable {
        /// Placeholder text as written
        token: String,
        /// Variable name inside the braces
        name: String,
        kind: EntityKind,
        id: String,
        /// Path to the field, e.g. `environment[1]`
        field: String,
        /// Robot whose scope was used
        robot: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_variable_display() {
        let err = DecodeError::UnresolvedVariable {
            token: "{{UR}}".to_string(),
            name: "UR".to_string(),
            kind: EntityKind::Package,
            id: "ur".to_string(),
            field: "command".to_string(),
            robot: "r1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'{{UR}}'"));
        assert!(msg.contains("package 'ur'"));
        assert!(msg.contains("field 'command'"));
        assert!(matches!(err, DecodeError::UnresolvedVariable { ref name, .. } if name == "UR"));
    }
}
