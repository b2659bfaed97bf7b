//! Entity loader
//!
//! Turns the raw document into an [`EntityGraph`]: every required field is
//! checked, ids are checked for uniqueness within their namespace, and every
//! reference (area → robot, robot → image/package) is resolved into an index.
//! Robots that no area references are validated but left out of the graph.

pub mod error;
pub mod graph;
pub mod ros;

pub use error::{EntityKind, LoadError};
pub use graph::*;
pub use ros::RosSpec;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::parser::ast::{
    scalar_text, Fields, RawArea, RawDocument, RawGlobal, RawImage, RawPackage, RawRobot,
};
use crate::settings::{RosFamily, Settings};

/// A robot whose fields are valid but whose owning area is not known yet
struct ParsedRobot {
    id: String,
    ros: RosSpec,
    images: Vec<ImageIdx>,
    packages: Vec<PackageIdx>,
    vars: Vec<(String, String)>,
    extra: Fields,
}

/// Build the entity graph from a parsed document
pub fn load(doc: &RawDocument, settings: &Settings) -> Result<EntityGraph, LoadError> {
    let raw_areas = match &doc.areas {
        Some(areas) if !areas.is_empty() => areas,
        _ => return Err(LoadError::missing(EntityKind::Document, None, "areas")),
    };

    let images = load_images(&doc.images)?;
    let packages = load_packages(&doc.packages)?;
    let globals = load_globals(&doc.globals, &images, &packages)?;

    let image_ids: IndexMap<&str, ImageIdx> = images
        .iter()
        .enumerate()
        .map(|(i, image)| (image.id.as_str(), ImageIdx(i)))
        .collect();
    let package_ids: IndexMap<&str, PackageIdx> = packages
        .iter()
        .enumerate()
        .map(|(i, package)| (package.id.as_str(), PackageIdx(i)))
        .collect();

    let mut parsed_robots: IndexMap<String, ParsedRobot> = IndexMap::new();
    for raw in &doc.robots {
        let robot = parse_robot(raw, settings, &image_ids, &package_ids)?;
        if parsed_robots.contains_key(&robot.id) {
            return Err(LoadError::duplicate(EntityKind::Robot, robot.id));
        }
        parsed_robots.insert(robot.id.clone(), robot);
    }

    let (area_ids, owners) = resolve_areas(raw_areas, &parsed_robots)?;

    // Robots keep document order; only owned robots make it into the graph.
    let mut robots = Vec::new();
    let mut robot_idx: HashMap<String, RobotIdx> = HashMap::new();
    for (id, parsed) in parsed_robots {
        let Some(area) = owners.get(&id) else {
            warn!(robot = %id, "robot is not referenced by any area and will not be generated");
            continue;
        };
        robot_idx.insert(id, RobotIdx(robots.len()));
        robots.push(Robot {
            id: parsed.id,
            ros: parsed.ros,
            area: *area,
            images: parsed.images,
            packages: parsed.packages,
            vars: parsed.vars,
            extra: parsed.extra,
        });
    }

    let areas = area_ids
        .into_iter()
        .map(|(id, members)| Area {
            robots: members.iter().map(|m| robot_idx[m.as_str()]).collect(),
            id,
        })
        .collect();

    let graph = EntityGraph {
        areas,
        robots,
        images,
        packages,
        globals,
    };

    check_ros_endpoints(&graph)?;
    check_service_names(&graph)?;
    warn_unreferenced(&graph);

    debug!(
        areas = graph.areas.len(),
        robots = graph.robots.len(),
        images = graph.images.len(),
        packages = graph.packages.len(),
        globals = graph.globals.len(),
        "loaded entity graph"
    );

    Ok(graph)
}

/// Require a non-empty string field
fn required<'a>(
    value: &'a Option<String>,
    kind: EntityKind,
    id: Option<&str>,
    field: &str,
) -> Result<&'a str, LoadError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LoadError::missing(kind, id, field)),
    }
}

fn load_images(raw: &[RawImage]) -> Result<Vec<Image>, LoadError> {
    let mut seen = HashSet::new();
    let mut images = Vec::with_capacity(raw.len());

    for raw in raw {
        let id = required(&raw.id, EntityKind::Image, None, "id")?;
        let image = required(&raw.image, EntityKind::Image, Some(id), "image")?;
        if !seen.insert(id.to_string()) {
            return Err(LoadError::duplicate(EntityKind::Image, id));
        }
        images.push(Image {
            id: id.to_string(),
            image: image.to_string(),
            extra: raw.extra.clone(),
        });
    }

    Ok(images)
}

fn load_packages(raw: &[RawPackage]) -> Result<Vec<Package>, LoadError> {
    let mut seen = HashSet::new();
    let mut packages = Vec::with_capacity(raw.len());

    for raw in raw {
        let id = required(&raw.id, EntityKind::Package, None, "id")?;
        let path = required(&raw.path, EntityKind::Package, Some(id), "path")?;
        let command = required(&raw.command, EntityKind::Package, Some(id), "command")?;
        if !seen.insert(id.to_string()) {
            return Err(LoadError::duplicate(EntityKind::Package, id));
        }

        let apt = non_empty_entries(raw.apt.as_deref(), id, "apt")?;
        let git = non_empty_entries(raw.git.as_deref(), id, "git")?;
        let rosinstall = raw
            .rosinstall
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        if apt.is_empty() && git.is_empty() && rosinstall.is_none() {
            return Err(LoadError::conflicting(
                EntityKind::Package,
                id,
                "declares none of 'apt', 'git' or 'rosinstall'",
            ));
        }

        let ssh = non_empty_entries(raw.ssh.as_deref(), id, "ssh")?;
        let files = non_empty_entries(raw.files.as_deref(), id, "files")?;
        for entry in &files {
            match entry.split_once(':') {
                Some((host, container)) if !host.trim().is_empty() && !container.trim().is_empty() => {}
                _ => {
                    return Err(LoadError::conflicting(
                        EntityKind::Package,
                        id,
                        format!("file entry '{}' is not HOST:CONTAINER", entry),
                    ))
                }
            }
        }
        check_file_names(id, "ssh", ssh.iter().map(String::as_str))?;
        check_file_names(
            id,
            "files",
            files.iter().filter_map(|f| f.split_once(':')).map(|(host, _)| host),
        )?;

        packages.push(Package {
            id: id.to_string(),
            path: path.to_string(),
            command: command.to_string(),
            apt,
            git,
            rosinstall,
            ssh,
            files,
            extra: raw.extra.clone(),
        });
    }

    Ok(packages)
}

/// Collect a list field, rejecting blank entries
fn non_empty_entries(
    values: Option<&[String]>,
    package: &str,
    field: &str,
) -> Result<Vec<String>, LoadError> {
    let values = values.unwrap_or_default();
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let v = v.trim();
            if v.is_empty() {
                Err(LoadError::missing(
                    EntityKind::Package,
                    Some(package),
                    format!("{}[{}]", field, i),
                ))
            } else {
                Ok(v.to_string())
            }
        })
        .collect()
}

/// Files copied into one build directory must have distinct names
fn check_file_names<'a>(
    package: &str,
    field: &str,
    paths: impl Iterator<Item = &'a str>,
) -> Result<(), LoadError> {
    let mut names = HashSet::new();
    for path in paths {
        let name = path.trim().trim_end_matches('/').rsplit('/').next().unwrap_or_default();
        if !names.insert(name) {
            return Err(LoadError::conflicting(
                EntityKind::Package,
                package,
                format!("two '{}' entries are both named '{}'", field, name),
            ));
        }
    }
    Ok(())
}

fn load_globals(
    raw: &[RawGlobal],
    images: &[Image],
    packages: &[Package],
) -> Result<Vec<Global>, LoadError> {
    let mut seen = HashSet::new();
    let mut globals = Vec::with_capacity(raw.len());

    for raw in raw {
        let id = required(&raw.id, EntityKind::Global, None, "id")?;
        if !seen.insert(id.to_string()) {
            return Err(LoadError::duplicate(EntityKind::Global, id));
        }
        if images.iter().any(|i| i.id == id) || packages.iter().any(|p| p.id == id) {
            return Err(LoadError::duplicate_within(
                EntityKind::Global,
                id,
                "the namespace shared with images and packages",
            ));
        }
        globals.push(Global {
            id: id.to_string(),
            fields: raw.extra.clone(),
        });
    }

    Ok(globals)
}

fn parse_robot(
    raw: &RawRobot,
    settings: &Settings,
    image_ids: &IndexMap<&str, ImageIdx>,
    package_ids: &IndexMap<&str, PackageIdx>,
) -> Result<ParsedRobot, LoadError> {
    let id = required(&raw.id, EntityKind::Robot, None, "id")?;
    let ros_value = required(&raw.ros, EntityKind::Robot, Some(id), "ros")?;
    let ros = RosSpec::parse(id, ros_value, settings)?;

    let images = resolve_refs(
        id,
        raw.images.as_deref(),
        EntityKind::Image,
        "images",
        image_ids,
    )?;
    let packages = resolve_refs(
        id,
        raw.packages.as_deref(),
        EntityKind::Package,
        "packages",
        package_ids,
    )?;

    if images.is_empty() && packages.is_empty() {
        return Err(LoadError::conflicting(
            EntityKind::Robot,
            id,
            "declares neither images nor packages",
        ));
    }

    let mut vars = Vec::new();
    if let Some(raw_vars) = &raw.vars {
        for (name, value) in raw_vars.entries() {
            if !is_identifier(name) {
                return Err(LoadError::conflicting(
                    EntityKind::Robot,
                    id,
                    format!("variable name '{}' is not an identifier", name),
                ));
            }
            let text = scalar_text(value).ok_or_else(|| {
                LoadError::conflicting(
                    EntityKind::Robot,
                    id,
                    format!("variable '{}' must have a scalar value", name),
                )
            })?;
            vars.push((name.to_string(), text));
        }
    }

    Ok(ParsedRobot {
        id: id.to_string(),
        ros,
        images,
        packages,
        vars,
        extra: raw.extra.clone(),
    })
}

/// Resolve a robot's image or package references into indices
fn resolve_refs<I: Copy>(
    robot: &str,
    refs: Option<&[String]>,
    kind: EntityKind,
    field: &str,
    known: &IndexMap<&str, I>,
) -> Result<Vec<I>, LoadError> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for (i, reference) in refs.unwrap_or_default().iter().enumerate() {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(LoadError::missing(
                EntityKind::Robot,
                Some(robot),
                format!("{}[{}]", field, i),
            ));
        }
        if !seen.insert(reference) {
            return Err(LoadError::duplicate_within(
                kind,
                reference,
                format!("robot '{}'", robot),
            ));
        }
        let idx = known
            .get(reference)
            .ok_or_else(|| LoadError::UnresolvedReference {
                from_kind: EntityKind::Robot,
                from_id: robot.to_string(),
                kind,
                id: reference.to_string(),
                suggestions: find_similar(known.keys().copied(), reference, 2),
            })?;
        resolved.push(*idx);
    }

    Ok(resolved)
}

type AreaMembers = Vec<(String, Vec<String>)>;

/// Validate areas and work out which area owns each robot
fn resolve_areas(
    raw_areas: &[RawArea],
    robots: &IndexMap<String, ParsedRobot>,
) -> Result<(AreaMembers, HashMap<String, AreaIdx>), LoadError> {
    let mut areas: AreaMembers = Vec::new();
    let mut owners: HashMap<String, AreaIdx> = HashMap::new();

    for raw in raw_areas {
        let id = required(&raw.id, EntityKind::Area, None, "id")?;
        if areas.iter().any(|(existing, _)| existing == id) {
            return Err(LoadError::duplicate(EntityKind::Area, id));
        }

        let refs = match raw.robots.as_deref() {
            Some(refs) if !refs.is_empty() => refs,
            _ => return Err(LoadError::missing(EntityKind::Area, Some(id), "robots")),
        };

        let area_idx = AreaIdx(areas.len());
        let mut members = Vec::with_capacity(refs.len());
        for (i, robot) in refs.iter().enumerate() {
            let robot = robot.trim();
            if robot.is_empty() {
                return Err(LoadError::missing(
                    EntityKind::Area,
                    Some(id),
                    format!("robots[{}]", i),
                ));
            }
            if members.iter().any(|m| m == robot) {
                return Err(LoadError::duplicate_within(
                    EntityKind::Robot,
                    robot,
                    format!("area '{}'", id),
                ));
            }
            if !robots.contains_key(robot) {
                return Err(LoadError::UnresolvedReference {
                    from_kind: EntityKind::Area,
                    from_id: id.to_string(),
                    kind: EntityKind::Robot,
                    id: robot.to_string(),
                    suggestions: find_similar(robots.keys().map(String::as_str), robot, 2),
                });
            }
            if let Some(owner) = owners.get(robot) {
                return Err(LoadError::conflicting(
                    EntityKind::Robot,
                    robot,
                    format!(
                        "listed in both area '{}' and area '{}'",
                        areas[owner.0].0, id
                    ),
                ));
            }
            owners.insert(robot.to_string(), area_idx);
            members.push(robot.to_string());
        }

        areas.push((id.to_string(), members));
    }

    Ok((areas, owners))
}

/// Robots of the same ROS generation must not share a master port or domain
fn check_ros_endpoints(graph: &EntityGraph) -> Result<(), LoadError> {
    let mut used: HashMap<(RosFamily, u32), &str> = HashMap::new();

    for robot in &graph.robots {
        let key = (robot.ros.family, robot.ros.metadata);
        if let Some(other) = used.get(&key) {
            let what = match robot.ros.family {
                RosFamily::Ros1 => "ROS master port",
                RosFamily::Ros2 => "ROS domain id",
            };
            return Err(LoadError::conflicting(
                EntityKind::Robot,
                robot.id.as_str(),
                format!(
                    "{} {} is already used by robot '{}'",
                    what, robot.ros.metadata, other
                ),
            ));
        }
        used.insert(key, &robot.id);
    }

    Ok(())
}

/// Every generated service needs a distinct name
fn check_service_names(graph: &EntityGraph) -> Result<(), LoadError> {
    let mut names = HashSet::new();
    let mut claim = |name: String| {
        if names.insert(name.clone()) {
            Ok(())
        } else {
            Err(LoadError::duplicate(EntityKind::Service, name))
        }
    };

    for robot in &graph.robots {
        if robot.ros.family == RosFamily::Ros1 {
            claim(robot.master_service())?;
        }
        for idx in &robot.images {
            claim(instance_service(&robot.id, &graph.image(*idx).id))?;
        }
        for idx in &robot.packages {
            claim(instance_service(&robot.id, &graph.package(*idx).id))?;
        }
    }
    for global in &graph.globals {
        claim(global.id.clone())?;
    }

    Ok(())
}

fn warn_unreferenced(graph: &EntityGraph) {
    let used_images: HashSet<ImageIdx> = graph
        .robots
        .iter()
        .flat_map(|r| r.images.iter().copied())
        .collect();
    let used_packages: HashSet<PackageIdx> = graph
        .robots
        .iter()
        .flat_map(|r| r.packages.iter().copied())
        .collect();

    for (i, image) in graph.images.iter().enumerate() {
        if !used_images.contains(&ImageIdx(i)) {
            warn!(image = %image.id, "image is not used by any generated robot");
        }
    }
    for (i, package) in graph.packages.iter().enumerate() {
        if !used_packages.contains(&PackageIdx(i)) {
            warn!(package = %package.id, "package is not used by any generated robot");
        }
    }
}

/// Valid template variable name (letters, digits, underscore; not starting with a digit)
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Find similar ids within a maximum edit distance
fn find_similar<'a>(
    defined: impl Iterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut candidates: Vec<(String, usize)> = defined
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            if dist <= max_distance && dist > 0 {
                Some((name.to_string(), dist))
            } else {
                None
            }
        })
        .collect();

    candidates.sort_by_key(|(_, d)| *d);
    candidates
        .into_iter()
        .map(|(name, _)| name)
        .take(3)
        .collect()
}
