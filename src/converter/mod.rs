//! Model converter
//!
//! Flattens the decoded graph into a [`ComposeModel`]. Services are emitted
//! robot by robot in declaration order (master, images, packages), followed
//! by the globals.

pub mod build;
pub mod error;
pub mod model;
pub mod resources;
pub mod service;

pub use error::ConvertError;
pub use model::*;

use tracing::debug;

use crate::decoder::DecodedGraph;
use crate::loader::area_network;
use crate::settings::{RosFamily, Settings};

/// Convert a decoded graph into the render-ready model
pub fn convert(graph: &DecodedGraph, settings: &Settings) -> Result<ComposeModel, ConvertError> {
    let mut services = Vec::new();
    let mut builds = Vec::new();
    let mut robots = Vec::new();

    for robot in graph.robots() {
        let mut names = Vec::new();

        let master = service::master_service(robot, settings);
        if let Some(master) = master.as_ref() {
            names.push(master.name.clone());
        }
        services.extend(master);

        for image in &robot.images {
            let service = service::image_service(robot, image, settings);
            names.push(service.name.clone());
            services.push(service);
        }

        for package in &robot.packages {
            let build = build::package_build(robot, package, &settings.workspace)?;
            let service = service::package_service(
                robot,
                &package.service,
                &package.extra,
                &build.spec.context,
                &build.volumes,
                settings,
            );
            names.push(service.name.clone());
            services.push(service);
            builds.push(build.spec);
        }

        robots.push(RobotEntry {
            id: robot.id.clone(),
            area: robot.area_id.clone(),
            network: area_network(&robot.area_id),
            ros: robot.ros.clone(),
            master: (robot.ros.family == RosFamily::Ros1)
                .then(|| robot.master_service()),
            services: names,
            vars: robot
                .scope
                .names()
                .filter_map(|name| {
                    robot
                        .scope
                        .get(name)
                        .map(|value| (name.to_string(), value.to_string()))
                })
                .collect(),
        });
    }

    services.extend(graph.globals.iter().map(service::global_service));

    let area_ids: Vec<&str> = graph.areas.iter().map(|a| a.id.as_str()).collect();
    let networks = resources::collect_networks(&area_ids, &services);
    let volumes = resources::collect_volumes(&services);

    debug!(
        services = services.len(),
        builds = builds.len(),
        networks = networks.len(),
        volumes = volumes.len(),
        "converted model"
    );

    Ok(ComposeModel {
        version: settings.compose_version.clone(),
        services,
        networks,
        volumes,
        builds,
        robots,
    })
}
