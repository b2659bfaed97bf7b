//! Generator settings
//!
//! Settings control which ROS distributions are recognized and the defaults
//! injected into generated services. A TOML file may override any subset of
//! the built-in values; missing keys fall back to the defaults.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("distro '{distro}' is listed as both ROS1 and ROS2")]
    AmbiguousDistro { distro: String },
}

/// The two ROS generations, which differ in how robots discover each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RosFamily {
    /// ROS1: a master node on a TCP port
    Ros1,
    /// ROS2: DDS discovery partitioned by domain id
    Ros2,
}

/// Generator settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Distributions treated as ROS1
    pub ros1_distros: Vec<String>,
    /// Distributions treated as ROS2
    pub ros2_distros: Vec<String>,
    /// Master port used when a ROS1 robot omits one
    pub ros1_master_port: u32,
    /// Domain id used when a ROS2 robot omits one
    pub ros2_domain_id: u32,
    /// Restart policy injected into services that do not declare one
    pub restart: String,
    /// Workspace root inside built package images
    pub workspace: String,
    /// Compose file format version written to the manifest
    pub compose_version: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlSettings {
    distros: Option<TomlDistros>,
    defaults: Option<TomlDefaults>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlDistros {
    ros1: Option<Vec<String>>,
    ros2: Option<Vec<String>>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlDefaults {
    ros1_master_port: Option<u32>,
    ros2_domain_id: Option<u32>,
    restart: Option<String>,
    workspace: Option<String>,
    compose_version: Option<String>,
}

const ROS1_DISTROS: &[&str] = &["kinetic", "lunar", "melodic", "noetic"];

const ROS2_DISTROS: &[&str] = &[
    "ardent", "bouncy", "crystal", "dashing", "eloquent", "foxy", "galactic", "humble", "iron",
    "jazzy", "rolling",
];

impl Default for Settings {
    fn default() -> Self {
        Self {
            ros1_distros: ROS1_DISTROS.iter().map(|d| d.to_string()).collect(),
            ros2_distros: ROS2_DISTROS.iter().map(|d| d.to_string()).collect(),
            ros1_master_port: 11311,
            ros2_domain_id: 42,
            restart: "always".to_string(),
            workspace: "/ros_workspace".to_string(),
            compose_version: Some("3.8".to_string()),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string, overlaying the defaults
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let parsed: TomlSettings = toml::from_str(content)?;
        let mut settings = Settings::default();

        if let Some(distros) = parsed.distros {
            if let Some(ros1) = distros.ros1 {
                settings.ros1_distros = ros1;
            }
            if let Some(ros2) = distros.ros2 {
                settings.ros2_distros = ros2;
            }
        }

        if let Some(defaults) = parsed.defaults {
            if let Some(port) = defaults.ros1_master_port {
                settings.ros1_master_port = port;
            }
            if let Some(domain) = defaults.ros2_domain_id {
                settings.ros2_domain_id = domain;
            }
            if let Some(restart) = defaults.restart {
                settings.restart = restart;
            }
            if let Some(workspace) = defaults.workspace {
                settings.workspace = workspace.trim_end_matches('/').to_string();
            }
            if let Some(version) = defaults.compose_version {
                settings.compose_version = if version.is_empty() { None } else { Some(version) };
            }
        }

        if let Some(distro) = settings
            .ros1_distros
            .iter()
            .find(|d| settings.ros2_distros.contains(d))
        {
            return Err(SettingsError::AmbiguousDistro {
                distro: distro.clone(),
            });
        }

        Ok(settings)
    }

    /// Classify a distribution name
    pub fn family_of(&self, distro: &str) -> Option<RosFamily> {
        if self.ros1_distros.iter().any(|d| d == distro) {
            Some(RosFamily::Ros1)
        } else if self.ros2_distros.iter().any(|d| d == distro) {
            Some(RosFamily::Ros2)
        } else {
            None
        }
    }

    /// Metadata applied when a robot's `ros` field omits it
    pub fn default_metadata(&self, family: RosFamily) -> u32 {
        match family {
            RosFamily::Ros1 => self.ros1_master_port,
            RosFamily::Ros2 => self.ros2_domain_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.family_of("melodic"), Some(RosFamily::Ros1));
        assert_eq!(settings.family_of("noetic"), Some(RosFamily::Ros1));
        assert_eq!(settings.family_of("foxy"), Some(RosFamily::Ros2));
        assert_eq!(settings.family_of("unknown"), None);
        assert_eq!(settings.default_metadata(RosFamily::Ros1), 11311);
        assert_eq!(settings.default_metadata(RosFamily::Ros2), 42);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let toml_str = r#"
[defaults]
restart = "unless-stopped"
workspace = "/catkin_ws/"
"#;
        let settings = Settings::from_str(toml_str).expect("Should parse");
        assert_eq!(settings.restart, "unless-stopped");
        assert_eq!(settings.workspace, "/catkin_ws");
        assert_eq!(settings.ros1_master_port, 11311);
        assert_eq!(settings.family_of("foxy"), Some(RosFamily::Ros2));
    }

    #[test]
    fn test_custom_distro_lists() {
        let toml_str = r#"
[distros]
ros1 = ["melodic"]
ros2 = ["humble"]
"#;
        let settings = Settings::from_str(toml_str).expect("Should parse");
        assert_eq!(settings.family_of("noetic"), None);
        assert_eq!(settings.family_of("humble"), Some(RosFamily::Ros2));
    }

    #[test]
    fn test_empty_compose_version_disables_header() {
        let settings = Settings::from_str("[defaults]\ncompose_version = \"\"\n").unwrap();
        assert_eq!(settings.compose_version, None);
    }

    #[test]
    fn test_ambiguous_distro_rejected() {
        let toml_str = r#"
[distros]
ros1 = ["melodic"]
ros2 = ["melodic"]
"#;
        let result = Settings::from_str(toml_str);
        assert!(matches!(result, Err(SettingsError::AmbiguousDistro { .. })));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = Settings::from_str("[defaults]\nrestrat = \"no\"\n");
        assert!(matches!(result, Err(SettingsError::ParseError(_))));
    }
}
