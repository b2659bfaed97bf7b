//! Compose service fragments
//!
//! Each fragment starts from the generated keys (`container_name`, `image`
//! or `build`), overlays the entity's pass-through fields, then receives the
//! ROS wiring: environment, the area network, the master dependency and the
//! default restart policy. Keys the user declared are never overwritten.

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use super::model::{Service, ServiceKind};
use crate::decoder::{DecodedImage, DecodedRobot};
use crate::loader::{area_network, Global};
use crate::parser::ast::Fields;
use crate::settings::{RosFamily, Settings};

/// A parsed container image reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRef<'a> {
    /// Repository, including any registry host and port
    pub name: &'a str,
    pub tag: Option<&'a str>,
    pub digest: Option<&'a str>,
}

impl<'a> ImageRef<'a> {
    pub fn parse(reference: &'a str) -> Self {
        let (rest, digest) = match reference.split_once('@') {
            Some((rest, digest)) => (rest, Some(digest)),
            None => (reference, None),
        };

        // A ':' before the last '/' belongs to a registry port
        let last_segment = rest.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match rest[last_segment..].rfind(':') {
            Some(i) => {
                let colon = last_segment + i;
                (&rest[..colon], Some(&rest[colon + 1..]))
            }
            None => (rest, None),
        };

        Self {
            name,
            tag: tag.filter(|t| !t.is_empty()),
            digest,
        }
    }

    /// Whether the reference pins a tag or a digest
    pub fn is_pinned(&self) -> bool {
        self.tag.is_some() || self.digest.is_some()
    }

    /// Full reference, using `default_tag` when neither tag nor digest is set
    pub fn with_default_tag(&self, default_tag: &str) -> String {
        let mut out = self.name.to_string();
        match (self.tag, self.digest) {
            (None, None) => {
                out.push(':');
                out.push_str(default_tag);
            }
            (tag, digest) => {
                if let Some(tag) = tag {
                    out.push(':');
                    out.push_str(tag);
                }
                if let Some(digest) = digest {
                    out.push('@');
                    out.push_str(digest);
                }
            }
        }
        out
    }
}

/// The `roscore` service of a ROS1 robot; None for ROS2
pub fn master_service(robot: &DecodedRobot, settings: &Settings) -> Option<Service> {
    if robot.ros.family != RosFamily::Ros1 {
        return None;
    }

    let name = robot.master_service();
    let port = robot.ros.metadata;

    let mut fields = Fields::new();
    fields.insert("container_name".into(), name.clone().into());
    fields.insert("image".into(), format!("ros:{}", robot.distro()).into());
    fields.insert("command".into(), format!("roscore --port {}", port).into());
    fields.insert(
        "ports".into(),
        Value::Sequence(vec![format!("{}:{}", port, port).into()]),
    );
    overlay(&mut fields, &robot.extra);
    wire(&mut fields, robot, &name, settings, false);

    Some(Service {
        name,
        kind: ServiceKind::Master,
        robot: Some(robot.id.clone()),
        fields,
    })
}

/// Service for an image instance on a robot
pub fn image_service(robot: &DecodedRobot, image: &DecodedImage, settings: &Settings) -> Service {
    let reference = ImageRef::parse(&image.image);
    if !reference.is_pinned() {
        debug!(
            service = %image.service,
            tag = %robot.distro(),
            "image has no tag, using the robot's distro"
        );
    }

    let mut fields = Fields::new();
    fields.insert("container_name".into(), image.service.clone().into());
    fields.insert(
        "image".into(),
        reference.with_default_tag(robot.distro()).into(),
    );
    overlay(&mut fields, &image.extra);
    wire(&mut fields, robot, &image.service, settings, true);

    Service {
        name: image.service.clone(),
        kind: ServiceKind::Image,
        robot: Some(robot.id.clone()),
        fields,
    }
}

/// Service for a package instance built from `context`
///
/// `volumes` are bind mounts for files bundled with the build context.
pub fn package_service(
    robot: &DecodedRobot,
    service: &str,
    extra: &Fields,
    context: &str,
    volumes: &[String],
    settings: &Settings,
) -> Service {
    let mut fields = Fields::new();
    fields.insert("container_name".into(), service.into());
    fields.insert("build".into(), context.into());
    overlay(&mut fields, extra);
    for volume in volumes {
        append_entry(&mut fields, service, "volumes", volume, Value::Null);
    }
    wire(&mut fields, robot, service, settings, true);

    Service {
        name: service.to_string(),
        kind: ServiceKind::Package,
        robot: Some(robot.id.clone()),
        fields,
    }
}

/// Globals are copied verbatim
pub fn global_service(global: &Global) -> Service {
    Service {
        name: global.id.clone(),
        kind: ServiceKind::Global,
        robot: None,
        fields: global.fields.clone(),
    }
}

/// ROS environment for a service attached to `robot`
pub fn ros_environment(robot: &DecodedRobot, service: &str) -> Vec<(&'static str, String)> {
    match robot.ros.family {
        RosFamily::Ros1 => vec![
            ("ROS_HOSTNAME", service.to_string()),
            (
                "ROS_MASTER_URI",
                format!("http://{}:{}", robot.master_service(), robot.ros.metadata),
            ),
        ],
        RosFamily::Ros2 => vec![("ROS_DOMAIN_ID", robot.ros.metadata.to_string())],
    }
}

fn overlay(fields: &mut Fields, extra: &Fields) {
    for (key, value) in extra {
        fields.insert(key.clone(), value.clone());
    }
}

fn wire(
    fields: &mut Fields,
    robot: &DecodedRobot,
    service: &str,
    settings: &Settings,
    needs_master: bool,
) {
    for (key, value) in ros_environment(robot, service) {
        set_environment(fields, service, key, &value);
    }

    append_entry(
        fields,
        service,
        "networks",
        &area_network(&robot.area_id),
        Value::Null,
    );

    if needs_master && robot.ros.family == RosFamily::Ros1 {
        let mut condition = Mapping::new();
        condition.insert("condition".into(), "service_started".into());
        append_entry(
            fields,
            service,
            "depends_on",
            &robot.master_service(),
            Value::Mapping(condition),
        );
    }

    if !fields.contains_key("restart") {
        fields.insert("restart".into(), settings.restart.clone().into());
    }
}

/// Add `KEY=value` unless the service already sets `KEY`
///
/// Both the list form and the mapping form of `environment` are kept.
fn set_environment(fields: &mut Fields, service: &str, key: &str, value: &str) {
    let env = fields
        .entry("environment".to_string())
        .or_insert_with(|| Value::Sequence(Vec::new()));

    match env {
        Value::Null => *env = Value::Sequence(vec![format!("{}={}", key, value).into()]),
        Value::Sequence(items) => {
            let declared = items.iter().any(|item| {
                item.as_str()
                    .map(|s| s.split('=').next() == Some(key))
                    .unwrap_or(false)
            });
            if !declared {
                items.push(format!("{}={}", key, value).into());
            }
        }
        Value::Mapping(map) => {
            if !map.contains_key(key) {
                map.insert(key.into(), value.into());
            }
        }
        _ => warn!(service, "'environment' is neither a list nor a mapping; left as is"),
    }
}

/// Add `name` to a list-or-mapping field such as `networks` or `depends_on`
///
/// In the mapping form `name` becomes a key with `mapping_value`.
fn append_entry(fields: &mut Fields, service: &str, key: &str, name: &str, mapping_value: Value) {
    let entry = fields
        .entry(key.to_string())
        .or_insert_with(|| Value::Sequence(Vec::new()));

    match entry {
        Value::Null => *entry = Value::Sequence(vec![name.into()]),
        Value::Sequence(items) => {
            if !items.iter().any(|item| item.as_str() == Some(name)) {
                items.push(name.into());
            }
        }
        Value::Mapping(map) => {
            if !map.contains_key(name) {
                map.insert(name.into(), mapping_value);
            }
        }
        _ => warn!(service, field = key, "field is neither a list nor a mapping; left as is"),
    }
}
