//! Text renderer for the compose manifest and Dockerfiles
//!
//! Takes a [`ComposeModel`] and fills in the bundled Tera templates. Service
//! bodies are serialized with serde_yaml so pass-through values of any shape
//! come out as valid YAML. Network and volume declarations go through the
//! same path, so ids never reach the manifest unquoted.

use indexmap::IndexMap;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::debug;

use serde_yaml::{Mapping, Value};

use crate::converter::{Asset, BuildSpec, ComposeModel, NetworkDecl, Service};

const MANIFEST_TEMPLATE: &str = "docker-compose.yml";
const DOCKERFILE_TEMPLATE: &str = "Dockerfile";

/// Errors that can occur while rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("failed to serialize service '{service}': {source}")]
    Service {
        service: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to serialize the {section} section: {source}")]
    Section {
        section: &'static str,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A rendered Dockerfile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dockerfile {
    pub service: String,
    /// Path relative to the manifest directory
    pub path: String,
    pub content: String,
}

/// Everything a run produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub manifest: String,
    pub dockerfiles: Vec<Dockerfile>,
    /// Host files to copy next to the Dockerfiles
    pub assets: Vec<Asset>,
}

pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (
                MANIFEST_TEMPLATE,
                include_str!("templates/docker-compose.yml.tera"),
            ),
            (DOCKERFILE_TEMPLATE, include_str!("templates/Dockerfile.tera")),
        ])?;
        Ok(Self { tera })
    }

    /// Render the compose manifest
    pub fn manifest(&self, model: &ComposeModel) -> Result<String, RenderError> {
        let services = model
            .services
            .iter()
            .map(service_block)
            .collect::<Result<Vec<_>, _>>()?;

        let mut context = Context::new();
        context.insert("version", &model.version);
        context.insert("services", &services);
        context.insert("networks", &networks_block(&model.networks)?);
        context.insert("volumes", &volumes_block(&model.volumes)?);

        Ok(self.tera.render(MANIFEST_TEMPLATE, &context)?)
    }

    /// Render the Dockerfile for one package instance
    pub fn dockerfile(&self, build: &BuildSpec) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("build", build);
        Ok(self.tera.render(DOCKERFILE_TEMPLATE, &context)?)
    }

    /// Render every artifact of a model
    pub fn render(&self, model: &ComposeModel) -> Result<Artifacts, RenderError> {
        let manifest = self.manifest(model)?;
        let dockerfiles = model
            .builds
            .iter()
            .map(|build| {
                Ok(Dockerfile {
                    service: build.service.clone(),
                    path: format!("{}/Dockerfile", build.context),
                    content: self.dockerfile(build)?,
                })
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        let assets = model
            .builds
            .iter()
            .flat_map(|build| build.assets.iter().cloned())
            .collect();

        debug!(dockerfiles = dockerfiles.len(), "rendered artifacts");

        Ok(Artifacts {
            manifest,
            dockerfiles,
            assets,
        })
    }
}

/// Render a model with the bundled templates
pub fn render(model: &ComposeModel) -> Result<Artifacts, RenderError> {
    Renderer::new()?.render(model)
}

/// A service as an indented YAML block, ready to sit under `services:`
fn service_block(service: &Service) -> Result<String, RenderError> {
    let mut entry = IndexMap::new();
    entry.insert(service.name.as_str(), &service.fields);
    let yaml = serde_yaml::to_string(&entry).map_err(|source| RenderError::Service {
        service: service.name.clone(),
        source,
    })?;
    Ok(indent(&yaml))
}

/// Top-level network declarations; area networks use the bridge driver
fn networks_block(networks: &[NetworkDecl]) -> Result<String, RenderError> {
    let mut entries = IndexMap::new();
    for network in networks {
        let mut body = Mapping::new();
        if network.area.is_some() {
            body.insert("driver".into(), "bridge".into());
        }
        entries.insert(network.name.as_str(), Value::Mapping(body));
    }
    section_block("networks", &entries)
}

/// Top-level named volume declarations, each with an empty body
fn volumes_block(volumes: &[String]) -> Result<String, RenderError> {
    if volumes.is_empty() {
        return Ok(String::new());
    }
    let entries: IndexMap<&str, Mapping> = volumes
        .iter()
        .map(|volume| (volume.as_str(), Mapping::new()))
        .collect();
    section_block("volumes", &entries)
}

fn section_block<T: serde::Serialize>(
    section: &'static str,
    entries: &T,
) -> Result<String, RenderError> {
    let yaml = serde_yaml::to_string(entries)
        .map_err(|source| RenderError::Section { section, source })?;
    Ok(indent(&yaml))
}

fn indent(yaml: &str) -> String {
    let mut block = String::with_capacity(yaml.len() * 2);
    for line in yaml.lines() {
        if !line.is_empty() {
            block.push_str("  ");
        }
        block.push_str(line);
        block.push('\n');
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{NetworkDecl, ServiceKind};

    fn model() -> ComposeModel {
        ComposeModel {
            version: Some("3.8".to_string()),
            services: vec![Service {
                name: "r1-cam".to_string(),
                kind: ServiceKind::Image,
                robot: Some("r1".to_string()),
                fields: serde_yaml::from_str("image: usb_cam\nnetworks: [warehouse-network]")
                    .unwrap(),
            }],
            networks: vec![
                NetworkDecl {
                    name: "warehouse-network".to_string(),
                    area: Some("warehouse".to_string()),
                },
                NetworkDecl {
                    name: "monitoring".to_string(),
                    area: None,
                },
            ],
            volumes: vec!["maps".to_string()],
            builds: vec![],
            robots: vec![],
        }
    }

    #[test]
    fn test_service_block_is_indented() {
        let block = service_block(&model().services[0]).unwrap();
        assert!(block.starts_with("  r1-cam:\n    image: usb_cam\n"));
    }

    #[test]
    fn test_manifest_sections() {
        let manifest = Renderer::new().unwrap().manifest(&model()).unwrap();
        assert!(manifest.starts_with("version: \"3.8\"\nservices:\n  r1-cam:\n"));
        assert!(manifest.contains("networks:\n  warehouse-network:\n    driver: bridge\n  monitoring: {}\n"));
        assert!(manifest.ends_with("volumes:\n  maps: {}\n"));
    }

    #[test]
    fn test_manifest_is_valid_yaml() {
        let manifest = Renderer::new().unwrap().manifest(&model()).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&manifest).unwrap();
        assert_eq!(
            parsed["services"]["r1-cam"]["networks"][0],
            serde_yaml::Value::String("warehouse-network".to_string())
        );
        assert!(parsed["volumes"]["maps"].is_mapping());
    }

    #[test]
    fn test_manifest_without_version_or_volumes() {
        let mut model = model();
        model.version = None;
        model.volumes.clear();
        let manifest = Renderer::new().unwrap().manifest(&model).unwrap();
        assert!(manifest.starts_with("services:\n"));
        assert!(!manifest.contains("volumes:"));
    }

    #[test]
    fn test_declaration_names_are_quoted() {
        let mut model = model();
        model.networks[0].name = "zone #1-network".to_string();
        model.networks[1].name = "ops: main".to_string();
        model.volumes = vec!["null".to_string(), "maps".to_string()];

        let manifest = Renderer::new().unwrap().manifest(&model).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&manifest).unwrap();
        let networks = parsed["networks"].as_mapping().unwrap();
        assert_eq!(
            networks.get("zone #1-network").unwrap()["driver"],
            serde_yaml::Value::String("bridge".to_string())
        );
        assert!(networks.get("ops: main").unwrap().is_mapping());
        let volumes = parsed["volumes"].as_mapping().unwrap();
        assert!(volumes.get("null").unwrap().is_mapping());
        assert_eq!(volumes.len(), 2);
    }
}
