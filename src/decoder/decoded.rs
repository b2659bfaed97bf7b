//! The decoded entity graph
//!
//! Each robot owns its own resolved copies of the images and packages it
//! references. An image used by two robots therefore appears twice, once per
//! robot, each decoded against that robot's scope.

use std::rc::Rc;

use super::scope::{Scope, ROBOT_ROS_DISTRO};
use crate::loader::{instance_service, master_service, Global, RosSpec};
use crate::parser::ast::Fields;

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGraph {
    pub areas: Vec<DecodedArea>,
    /// Globals never go through substitution
    pub globals: Vec<Global>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedArea {
    pub id: String,
    pub robots: Vec<DecodedRobot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRobot {
    pub id: String,
    pub area_id: String,
    pub ros: RosSpec,
    pub scope: Rc<Scope>,
    pub extra: Fields,
    pub images: Vec<DecodedImage>,
    pub packages: Vec<DecodedPackage>,
}

impl DecodedRobot {
    pub fn master_service(&self) -> String {
        master_service(&self.id)
    }

    /// The distro as seen by the robot's variables
    ///
    /// A user variable named `ROBOT_ROS_DISTRO` overrides the declared one, so
    /// default tags and base images agree with substituted fields.
    pub fn distro(&self) -> &str {
        self.scope
            .get(ROBOT_ROS_DISTRO)
            .unwrap_or(self.ros.distro.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub id: String,
    /// Service name, `<robot>-<image>`
    pub service: String,
    pub image: String,
    pub extra: Fields,
    pub scope: Rc<Scope>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPackage {
    pub id: String,
    /// Service name, `<robot>-<package>`
    pub service: String,
    pub path: String,
    pub command: String,
    pub apt: Vec<String>,
    pub git: Vec<String>,
    pub rosinstall: Option<String>,
    pub ssh: Vec<String>,
    pub files: Vec<String>,
    pub extra: Fields,
    pub scope: Rc<Scope>,
}

impl DecodedGraph {
    /// All robots in area order
    pub fn robots(&self) -> impl Iterator<Item = &DecodedRobot> {
        self.areas.iter().flat_map(|a| a.robots.iter())
    }

    pub fn find_robot(&self, id: &str) -> Option<&DecodedRobot> {
        self.robots().find(|r| r.id == id)
    }
}

pub(super) fn service_name(robot: &str, entity: &str) -> String {
    instance_service(robot, entity)
}
