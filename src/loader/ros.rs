//! Parsing of the robot `ros` field (`DISTRO[:METADATA]`)

use serde::Serialize;

use super::error::LoadError;
use crate::settings::{RosFamily, Settings};

/// A robot's ROS installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosSpec {
    /// Distribution name, e.g. `melodic`
    pub distro: String,
    pub family: RosFamily,
    /// Master port (ROS1) or domain id (ROS2), defaulted when omitted
    pub metadata: u32,
    /// Whether `metadata` was written in the document
    pub explicit_metadata: bool,
}

impl RosSpec {
    /// Parse a `ros` value for the given robot
    pub fn parse(robot: &str, value: &str, settings: &Settings) -> Result<Self, LoadError> {
        let invalid = |reason: &str| LoadError::invalid_ros(robot, value, reason);

        let (distro, metadata) = match value.split_once(':') {
            Some((distro, metadata)) => (distro.trim(), Some(metadata.trim())),
            None => (value.trim(), None),
        };

        if distro.is_empty() {
            return Err(invalid("distribution name is empty"));
        }

        let family = settings
            .family_of(distro)
            .ok_or_else(|| invalid("unsupported ROS distribution"))?;

        let (metadata, explicit_metadata) = match metadata {
            None => (settings.default_metadata(family), false),
            Some("") => return Err(invalid("metadata after ':' is empty")),
            Some(text) => {
                if !text.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid("metadata must be a non-negative integer"));
                }
                let parsed = text
                    .parse::<u32>()
                    .map_err(|_| invalid("metadata is out of range"))?;
                (parsed, true)
            }
        };

        Ok(Self {
            distro: distro.to_string(),
            family,
            metadata,
            explicit_metadata,
        })
    }

    /// Path of the workspace setup script relative to the workspace root
    pub fn workspace_setup(&self) -> &'static str {
        match self.family {
            RosFamily::Ros1 => "devel/setup.bash",
            RosFamily::Ros2 => "install/setup.bash",
        }
    }

    /// Command that builds a workspace for this distribution
    pub fn build_tool(&self) -> &'static str {
        match self.family {
            RosFamily::Ros1 => "catkin_make",
            RosFamily::Ros2 => "colcon build",
        }
    }
}
