//! ROS Composer - compose files for multi-robot ROS deployments
//!
//! Reads a YAML description of areas, robots, images and packages and
//! produces a docker-compose manifest plus one Dockerfile per package
//! instance. The pipeline runs parse → load → decode → convert → render,
//! each stage consuming the previous stage's output without mutating it.
//!
//! # Example
//!
//! ```rust
//! use ros_composer::generate;
//!
//! let artifacts = generate(r#"
//! areas:
//!   - id: warehouse
//!     robots: [my-robot]
//! robots:
//!   - id: my-robot
//!     ros: melodic
//!     images: [ros-development]
//! images:
//!   - id: ros-development
//!     image: ros
//! "#).unwrap();
//!
//! assert!(artifacts.manifest.contains("ros:melodic"));
//! ```

pub mod converter;
pub mod decoder;
pub mod error;
pub mod loader;
pub mod output;
pub mod parser;
pub mod renderer;
pub mod settings;

pub use converter::{ComposeModel, ConvertError};
pub use decoder::{DecodeError, DecodedGraph};
pub use error::ParseError;
pub use loader::{EntityGraph, LoadError};
pub use output::{write_artifacts, OutputError};
pub use parser::parse;
pub use renderer::{Artifacts, RenderError};
pub use settings::{Settings, SettingsError};

use thiserror::Error;
use tracing::info;

/// Errors that can occur during generation
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Convert(#[from] ConvertError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),
}

/// Configuration for the generation pipeline
#[derive(Debug, Clone, Default)]
pub struct GenerateConfig {
    pub settings: Settings,
}

impl GenerateConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the generator settings
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the restart policy for services that declare none
    pub fn with_restart(mut self, restart: impl Into<String>) -> Self {
        self.settings.restart = restart.into();
        self
    }

    /// Set the workspace root inside package images
    pub fn with_workspace(mut self, workspace: impl Into<String>) -> Self {
        self.settings.workspace = workspace.into().trim_end_matches('/').to_string();
        self
    }

    /// Set or clear the manifest `version:` line
    pub fn with_compose_version(mut self, version: Option<String>) -> Self {
        self.settings.compose_version = version;
        self
    }
}

/// Run the pipeline up to the intermediate model
pub fn compile_model(source: &str, config: &GenerateConfig) -> Result<ComposeModel, GenerateError> {
    let doc = parse(source)?;
    let graph = loader::load(&doc, &config.settings)?;
    let decoded = decoder::decode(&graph)?;
    let model = converter::convert(&decoded, &config.settings)?;

    info!(
        services = model.services.len(),
        dockerfiles = model.builds.len(),
        "compiled model"
    );

    Ok(model)
}

/// Generate all artifacts with the default configuration
pub fn generate(source: &str) -> Result<Artifacts, GenerateError> {
    generate_with_config(source, &GenerateConfig::default())
}

/// Generate all artifacts with a custom configuration
pub fn generate_with_config(
    source: &str,
    config: &GenerateConfig,
) -> Result<Artifacts, GenerateError> {
    let model = compile_model(source, config)?;
    Ok(renderer::render(&model)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
areas:
  - id: warehouse
    robots: [my-robot]
robots:
  - id: my-robot
    ros: melodic
    images: [ros-development]
images:
  - id: ros-development
    image: ros
"#;

    #[test]
    fn test_generate_manifest() {
        let artifacts = generate(SOURCE).unwrap();
        assert!(artifacts.manifest.contains("  my-robot-ros-development:\n"));
        assert!(artifacts.manifest.contains("  roscore-my-robot:\n"));
        assert!(artifacts.dockerfiles.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = GenerateConfig::new()
            .with_restart("unless-stopped")
            .with_workspace("/ws/")
            .with_compose_version(None);
        assert_eq!(config.settings.restart, "unless-stopped");
        assert_eq!(config.settings.workspace, "/ws");

        let model = compile_model(SOURCE, &config).unwrap();
        assert_eq!(model.version, None);
        assert_eq!(
            model.service("my-robot-ros-development").unwrap().fields["restart"],
            serde_yaml::Value::String("unless-stopped".to_string())
        );
    }

    #[test]
    fn test_stage_errors_are_wrapped() {
        assert!(matches!(generate("areas: [1"), Err(GenerateError::Parse(_))));
        assert!(matches!(generate("robots: []"), Err(GenerateError::Load(_))));
        let unresolved = SOURCE.replace("image: ros", "image: \"ros:{{TAG}}\"");
        assert!(matches!(generate(&unresolved), Err(GenerateError::Decode(_))));
    }
}
