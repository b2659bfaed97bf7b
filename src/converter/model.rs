//! The render-ready intermediate model
//!
//! Everything the templates need is computed here; rendering is a pure
//! formatting step. The model serializes to JSON for `--emit-model`.

use indexmap::IndexMap;
use serde::Serialize;

use crate::loader::RosSpec;
use crate::parser::ast::Fields;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposeModel {
    /// Manifest `version:` line, if any
    pub version: Option<String>,
    pub services: Vec<Service>,
    pub networks: Vec<NetworkDecl>,
    /// Named volumes referenced by label
    pub volumes: Vec<String>,
    pub builds: Vec<BuildSpec>,
    pub robots: Vec<RobotEntry>,
}

impl ComposeModel {
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn build(&self, service: &str) -> Option<&BuildSpec> {
        self.builds.iter().find(|b| b.service == service)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// `roscore` for a ROS1 robot
    Master,
    Image,
    Package,
    Global,
}

/// One entry under `services:`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub name: String,
    pub kind: ServiceKind,
    /// Owning robot; None for globals
    pub robot: Option<String>,
    /// Compose fields in output order
    pub fields: Fields,
}

/// One entry under `networks:`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDecl {
    pub name: String,
    /// Set for the private network of an area
    pub area: Option<String>,
}

/// Per-robot summary, not rendered but useful when inspecting the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotEntry {
    pub id: String,
    pub area: String,
    pub network: String,
    pub ros: RosSpec,
    pub master: Option<String>,
    pub services: Vec<String>,
    /// The robot's resolved variable scope
    pub vars: IndexMap<String, String>,
}

/// Parameters of one generated Dockerfile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSpec {
    pub service: String,
    pub robot: String,
    pub package: String,
    /// Build context, relative to the manifest directory
    pub context: String,
    pub base_image: String,
    pub distro: String,
    /// Fetch sources in a throwaway stage and copy only the source tree
    pub two_stage: bool,
    pub apt: Vec<String>,
    /// Extra apt packages the fetch stage needs
    pub fetch_packages: Vec<String>,
    pub fetch_commands: Vec<String>,
    /// Rosinstall file name inside the build context
    pub rosinstall: Option<String>,
    /// Deploy key file names under `<context>/ssh/`
    pub ssh_keys: Vec<String>,
    pub workspace: String,
    pub workspace_setup: String,
    pub build_tool: String,
    /// Everything after `CMD` in the Dockerfile
    pub run: String,
    /// Host files to place next to the Dockerfile
    pub assets: Vec<Asset>,
}

/// A host file copied into a build context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Path as written in the document
    pub source: String,
    /// Destination relative to the manifest directory
    pub target: String,
}
