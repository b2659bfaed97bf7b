//! Variable decoder
//!
//! Builds one immutable [`Scope`] per robot and substitutes every `{{NAME}}`
//! placeholder in the string fields of the robot, its images and its
//! packages. Globals pass through untouched. The input graph is only read;
//! the result is a fresh [`DecodedGraph`].

pub mod decoded;
pub mod error;
pub mod lexer;
pub mod scope;

pub use decoded::*;
pub use error::DecodeError;
pub use scope::Scope;

use std::rc::Rc;

use serde_yaml::Value;
use tracing::debug;

use crate::loader::{EntityGraph, EntityKind, Image, Package, Robot};
use crate::parser::ast::Fields;

/// Decode every robot-owned entity in the graph
pub fn decode(graph: &EntityGraph) -> Result<DecodedGraph, DecodeError> {
    let mut areas = Vec::with_capacity(graph.areas.len());

    for area in &graph.areas {
        let mut robots = Vec::with_capacity(area.robots.len());
        for robot in graph.robots_of(area) {
            robots.push(decode_robot(graph, &area.id, robot)?);
        }
        areas.push(DecodedArea {
            id: area.id.clone(),
            robots,
        });
    }

    let decoded = DecodedGraph {
        areas,
        globals: graph.globals.clone(),
    };
    debug!(robots = decoded.robots().count(), "decoded template variables");
    Ok(decoded)
}

fn decode_robot(
    graph: &EntityGraph,
    area_id: &str,
    robot: &Robot,
) -> Result<DecodedRobot, DecodeError> {
    let scope = Rc::new(Scope::for_robot(area_id, robot));
    let ctx = Context {
        scope: &scope,
        robot: &robot.id,
        kind: EntityKind::Robot,
        id: &robot.id,
    };
    let extra = ctx.fields(&robot.extra)?;

    let images = robot
        .images
        .iter()
        .map(|idx| decode_image(graph.image(*idx), robot, &scope))
        .collect::<Result<Vec<_>, _>>()?;
    let packages = robot
        .packages
        .iter()
        .map(|idx| decode_package(graph.package(*idx), robot, &scope))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(robot = %robot.id, vars = scope.names().count(), "resolved robot scope");

    Ok(DecodedRobot {
        id: robot.id.clone(),
        area_id: area_id.to_string(),
        ros: robot.ros.clone(),
        scope,
        extra,
        images,
        packages,
    })
}

fn decode_image(
    image: &Image,
    robot: &Robot,
    scope: &Rc<Scope>,
) -> Result<DecodedImage, DecodeError> {
    let ctx = Context {
        scope,
        robot: &robot.id,
        kind: EntityKind::Image,
        id: &image.id,
    };
    Ok(DecodedImage {
        id: image.id.clone(),
        service: service_name(&robot.id, &image.id),
        image: ctx.text(&image.image, "image")?,
        extra: ctx.fields(&image.extra)?,
        scope: Rc::clone(scope),
    })
}

fn decode_package(
    package: &Package,
    robot: &Robot,
    scope: &Rc<Scope>,
) -> Result<DecodedPackage, DecodeError> {
    let ctx = Context {
        scope,
        robot: &robot.id,
        kind: EntityKind::Package,
        id: &package.id,
    };
    Ok(DecodedPackage {
        id: package.id.clone(),
        service: service_name(&robot.id, &package.id),
        path: ctx.text(&package.path, "path")?,
        command: ctx.text(&package.command, "command")?,
        apt: ctx.list(&package.apt, "apt")?,
        git: ctx.list(&package.git, "git")?,
        rosinstall: package
            .rosinstall
            .as_deref()
            .map(|r| ctx.text(r, "rosinstall"))
            .transpose()?,
        ssh: ctx.list(&package.ssh, "ssh")?,
        files: ctx.list(&package.files, "files")?,
        extra: ctx.fields(&package.extra)?,
        scope: Rc::clone(scope),
    })
}

/// The entity being decoded, for error reporting
struct Context<'a> {
    scope: &'a Scope,
    robot: &'a str,
    kind: EntityKind,
    id: &'a str,
}

impl Context<'_> {
    fn text(&self, input: &str, field: &str) -> Result<String, DecodeError> {
        self.scope
            .substitute(input)
            .map_err(|unresolved| DecodeError::UnresolvedVariable {
                token: unresolved.raw,
                name: unresolved.name,
                kind: self.kind,
                id: self.id.to_string(),
                field: field.to_string(),
                robot: self.robot.to_string(),
            })
    }

    fn list(&self, values: &[String], field: &str) -> Result<Vec<String>, DecodeError> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| self.text(v, &format!("{}[{}]", field, i)))
            .collect()
    }

    fn fields(&self, fields: &Fields) -> Result<Fields, DecodeError> {
        let mut out = Fields::with_capacity(fields.len());
        for (key, value) in fields {
            out.insert(key.clone(), self.value(value, key)?);
        }
        Ok(out)
    }

    /// Decode strings anywhere inside a pass-through value
    ///
    /// Mapping keys and non-string scalars are kept as they are.
    fn value(&self, value: &Value, path: &str) -> Result<Value, DecodeError> {
        Ok(match value {
            Value::String(s) => Value::String(self.text(s, path)?),
            Value::Sequence(items) => Value::Sequence(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.value(item, &format!("{}[{}]", path, i)))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(map) => {
                let mut out = serde_yaml::Mapping::with_capacity(map.len());
                for (key, item) in map {
                    let child = match key.as_str() {
                        Some(k) => format!("{}.{}", path, k),
                        None => format!("{}.?", path),
                    };
                    out.insert(key.clone(), self.value(item, &child)?);
                }
                Value::Mapping(out)
            }
            Value::Tagged(tagged) => Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                tag: tagged.tag.clone(),
                value: self.value(&tagged.value, path)?,
            })),
            other => other.clone(),
        })
    }
}
