//! The typed, cross-referenced entity graph

use super::ros::RosSpec;
use crate::parser::ast::Fields;

/// Index into [`EntityGraph::areas`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AreaIdx(pub usize);

/// Index into [`EntityGraph::robots`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RobotIdx(pub usize);

/// Index into [`EntityGraph::images`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageIdx(pub usize);

/// Index into [`EntityGraph::packages`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageIdx(pub usize);

/// A physical area whose robots share a private network
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub id: String,
    pub robots: Vec<RobotIdx>,
}

impl Area {
    /// Id of the area's private network
    pub fn network(&self) -> String {
        area_network(&self.id)
    }
}

/// Network id for an area
pub fn area_network(area_id: &str) -> String {
    format!("{}-network", area_id)
}

/// A robot running ROS, owned by exactly one area
#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    pub id: String,
    pub ros: RosSpec,
    pub area: AreaIdx,
    pub images: Vec<ImageIdx>,
    pub packages: Vec<PackageIdx>,
    /// User variables in declaration order; later entries win
    pub vars: Vec<(String, String)>,
    pub extra: Fields,
}

impl Robot {
    /// Name of the ROS1 master service for this robot
    pub fn master_service(&self) -> String {
        master_service(&self.id)
    }
}

/// Name of the ROS1 master service for a robot id
pub fn master_service(robot_id: &str) -> String {
    format!("roscore-{}", robot_id)
}

/// Service name of an image or package instance attached to a robot
pub fn instance_service(robot_id: &str, entity_id: &str) -> String {
    format!("{}-{}", robot_id, entity_id)
}

/// A pre-built container image
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub id: String,
    /// `IMAGE[:TAG]` as written
    pub image: String,
    pub extra: Fields,
}

/// Source packages built into an image on the fly
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: String,
    /// Directory under which the build context is generated
    pub path: String,
    pub command: String,
    pub apt: Vec<String>,
    /// `URL[:BRANCH]` entries
    pub git: Vec<String>,
    pub rosinstall: Option<String>,
    /// Deploy key files available to the fetch stage only
    pub ssh: Vec<String>,
    /// `HOST:CONTAINER` files bundled with the build context
    pub files: Vec<String>,
    pub extra: Fields,
}

/// An orchestration service outside the robot hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub id: String,
    pub fields: Fields,
}

/// The loaded configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityGraph {
    pub areas: Vec<Area>,
    pub robots: Vec<Robot>,
    pub images: Vec<Image>,
    pub packages: Vec<Package>,
    pub globals: Vec<Global>,
}

impl EntityGraph {
    pub fn area(&self, idx: AreaIdx) -> &Area {
        &self.areas[idx.0]
    }

    pub fn robot(&self, idx: RobotIdx) -> &Robot {
        &self.robots[idx.0]
    }

    pub fn image(&self, idx: ImageIdx) -> &Image {
        &self.images[idx.0]
    }

    pub fn package(&self, idx: PackageIdx) -> &Package {
        &self.packages[idx.0]
    }

    /// Robots of an area, in the area's declaration order
    pub fn robots_of<'a>(&'a self, area: &'a Area) -> impl Iterator<Item = &'a Robot> + 'a {
        area.robots.iter().map(move |idx| self.robot(*idx))
    }

    /// Look up a robot by id
    pub fn find_robot(&self, id: &str) -> Option<&Robot> {
        self.robots.iter().find(|r| r.id == id)
    }
}
