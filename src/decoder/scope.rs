//! Variable scopes
//!
//! A [`Scope`] is built once per robot and never changes afterwards. The
//! robot's images and packages borrow the very same scope, so a child entity
//! always sees exactly the variables of the robot that references it.

use indexmap::IndexMap;

use super::lexer::{segments, Segment};
use crate::loader::Robot;
use crate::settings::RosFamily;

pub const AREA_ID: &str = "AREA_ID";
pub const ROBOT_ID: &str = "ROBOT_ID";
pub const ROBOT_ROS_DISTRO: &str = "ROBOT_ROS_DISTRO";
pub const ROBOT_ROS_METADATA: &str = "ROBOT_ROS_METADATA";
pub const ROBOT_ROS_PORT: &str = "ROBOT_ROS_PORT";
pub const ROBOT_ROS_DOMAIN: &str = "ROBOT_ROS_DOMAIN";

/// A placeholder that has no value in scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub name: String,
    /// Placeholder text as written, e.g. `{{ UR_VERSION }}`
    pub raw: String,
}

/// Resolved name → value bindings for one robot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    vars: IndexMap<String, String>,
}

impl Scope {
    /// Build the scope for a robot owned by `area_id`
    ///
    /// System variables come first; the robot's own `vars` are applied on top
    /// in declaration order, so a later declaration replaces an earlier one
    /// and a user variable may shadow a system one.
    pub fn for_robot(area_id: &str, robot: &Robot) -> Self {
        let mut vars = IndexMap::new();
        vars.insert(AREA_ID.to_string(), area_id.to_string());
        vars.insert(ROBOT_ID.to_string(), robot.id.clone());
        vars.insert(ROBOT_ROS_DISTRO.to_string(), robot.ros.distro.clone());
        vars.insert(ROBOT_ROS_METADATA.to_string(), robot.ros.metadata.to_string());
        let alias = match robot.ros.family {
            RosFamily::Ros1 => ROBOT_ROS_PORT,
            RosFamily::Ros2 => ROBOT_ROS_DOMAIN,
        };
        vars.insert(alias.to_string(), robot.ros.metadata.to_string());

        for (name, value) in &robot.vars {
            vars.insert(name.clone(), value.clone());
        }

        Self { vars }
    }

    /// Build a scope from explicit bindings
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a variable's value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Variable names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Replace every placeholder in `input` with its value
    ///
    /// Substitution is a single pass: a value that itself contains `{{...}}`
    /// is inserted as literal text and never expanded again.
    pub fn substitute(&self, input: &str) -> Result<String, Unresolved> {
        let mut out = String::with_capacity(input.len());
        for segment in segments(input) {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable { name, raw } => match self.vars.get(&name) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(Unresolved {
                            name,
                            raw: raw.to_string(),
                        })
                    }
                },
            }
        }
        Ok(out)
    }
}
