//! Dockerfile parameters for package instances

use super::error::ConvertError;
use super::model::{Asset, BuildSpec};
use crate::decoder::{DecodedPackage, DecodedRobot};

/// Build parameters plus the bind mounts for bundled files
#[derive(Debug, Clone, PartialEq)]
pub struct PackageBuild {
    pub spec: BuildSpec,
    pub volumes: Vec<String>,
}

pub fn package_build(
    robot: &DecodedRobot,
    package: &DecodedPackage,
    workspace: &str,
) -> Result<PackageBuild, ConvertError> {
    let service = package.service.as_str();
    let distro = robot.distro();
    let context = build_context(&package.path, service);
    let two_stage = !package.git.is_empty() || package.rosinstall.is_some();

    let mut assets = Vec::new();
    let mut volumes = Vec::new();

    let mut fetch_commands: Vec<String> = package
        .git
        .iter()
        .map(|entry| git_fetch_command(entry, distro, workspace))
        .collect();

    let rosinstall = match &package.rosinstall {
        Some(path) => {
            // Kept in its own directory so it cannot replace the Dockerfile
            let relative = format!("rosinstall/{}", asset_name(service, path)?);
            fetch_commands.push(format!(
                "vcs import {ws}/src < {ws}/{file}",
                ws = workspace,
                file = relative
            ));
            assets.push(Asset {
                source: path.clone(),
                target: format!("{}/{}", context, relative),
            });
            Some(relative)
        }
        None => None,
    };

    let mut ssh_keys = Vec::with_capacity(package.ssh.len());
    for path in &package.ssh {
        let name = asset_name(service, path)?;
        claim(service, &ssh_keys, name)?;
        ssh_keys.push(name.to_string());
        assets.push(Asset {
            source: path.clone(),
            target: format!("{}/ssh/{}", context, name),
        });
    }

    let mut bundled: Vec<String> = Vec::with_capacity(package.files.len());
    for entry in &package.files {
        let (host, container) = entry
            .split_once(':')
            .ok_or_else(|| ConvertError::internal(service, format!("malformed file entry '{}'", entry)))?;
        let (host, container) = (host.trim(), container.trim());
        let name = asset_name(service, host)?;
        claim(service, &bundled, name)?;
        bundled.push(name.to_string());

        let target = format!("{}/files/{}", context, name);
        volumes.push(format!("{}:{}", target, container));
        assets.push(Asset {
            source: host.to_string(),
            target,
        });
    }

    let mut fetch_packages = Vec::new();
    if two_stage {
        fetch_packages.push("git".to_string());
    }
    if package.rosinstall.is_some() {
        fetch_packages.push("python3-vcstool".to_string());
    }
    if two_stage && !ssh_keys.is_empty() {
        fetch_packages.push("openssh-client".to_string());
    }

    let workspace_setup = robot.ros.workspace_setup();
    let run = if two_stage {
        let script = format!(
            "source /opt/ros/{}/setup.bash && source {}/{} && {}",
            distro, workspace, workspace_setup, package.command
        );
        serde_json::to_string(&["/bin/bash", "-c", script.as_str()])
            .map_err(|e| ConvertError::internal(service, e.to_string()))?
    } else {
        package.command.clone()
    };

    Ok(PackageBuild {
        spec: BuildSpec {
            service: service.to_string(),
            robot: robot.id.clone(),
            package: package.id.clone(),
            context,
            base_image: format!("ros:{}", distro),
            distro: distro.to_string(),
            two_stage,
            apt: package.apt.clone(),
            fetch_packages,
            fetch_commands,
            rosinstall,
            ssh_keys,
            workspace: workspace.to_string(),
            workspace_setup: workspace_setup.to_string(),
            build_tool: robot.ros.build_tool().to_string(),
            run,
            assets,
        },
        volumes,
    })
}

/// Build context directory for a package instance
///
/// Relative results always start with `.` so compose reads them as paths.
pub fn build_context(path: &str, service: &str) -> String {
    let base = path.trim().trim_end_matches('/');
    let joined = if base.is_empty() {
        service.to_string()
    } else {
        format!("{}/{}", base, service)
    };
    if joined.starts_with('/') || joined.starts_with('.') {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Clone command for a `URL[:BRANCH]` entry
///
/// The text after the last `:` is a branch only if it contains no `/` and is
/// not a `.git` repository name, so scp-style and port-qualified URLs keep
/// their colon.
pub fn git_fetch_command(entry: &str, default_branch: &str, workspace: &str) -> String {
    let (url, branch) = split_git_entry(entry);
    format!(
        "git -C {}/src clone -b {} {}",
        workspace,
        branch.unwrap_or(default_branch),
        url
    )
}

fn split_git_entry(entry: &str) -> (&str, Option<&str>) {
    match entry.rsplit_once(':') {
        Some((url, branch))
            if !url.is_empty()
                && !branch.is_empty()
                && !branch.contains('/')
                && !branch.ends_with(".git") =>
        {
            (url, Some(branch))
        }
        _ => (entry, None),
    }
}

fn asset_name<'a>(service: &str, path: &'a str) -> Result<&'a str, ConvertError> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .ok_or_else(|| ConvertError::internal(service, format!("'{}' does not name a file", path)))
}

fn claim(service: &str, taken: &[String], name: &str) -> Result<(), ConvertError> {
    if taken.iter().any(|t| t == name) {
        return Err(ConvertError::internal(
            service,
            format!("two bundled files are both named '{}'", name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Scope;
    use crate::loader::RosSpec;
    use crate::settings::Settings;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn robot(ros: &str) -> DecodedRobot {
        DecodedRobot {
            id: "r1".to_string(),
            area_id: "warehouse".to_string(),
            ros: RosSpec::parse("r1", ros, &Settings::default()).unwrap(),
            scope: Rc::new(Scope::from_pairs([("ROBOT_ID", "r1")])),
            extra: Default::default(),
            images: vec![],
            packages: vec![],
        }
    }

    fn package() -> DecodedPackage {
        DecodedPackage {
            id: "ur".to_string(),
            service: "r1-ur".to_string(),
            path: "./packages/".to_string(),
            command: "roslaunch ur_gazebo ur10.launch".to_string(),
            apt: vec![],
            git: vec![],
            rosinstall: None,
            ssh: vec![],
            files: vec![],
            extra: Default::default(),
            scope: Rc::new(Scope::from_pairs([("ROBOT_ID", "r1")])),
        }
    }

    #[test]
    fn test_apt_only_runs_directly() {
        let mut pkg = package();
        pkg.apt = vec!["ros-melodic-universal-robot".to_string()];
        let build = package_build(&robot("melodic"), &pkg, "/ros_workspace").unwrap();

        assert!(!build.spec.two_stage);
        assert_eq!(build.spec.base_image, "ros:melodic");
        assert_eq!(build.spec.context, "./packages/r1-ur");
        assert_eq!(build.spec.run, "roslaunch ur_gazebo ur10.launch");
        assert!(build.spec.fetch_packages.is_empty());
        assert!(build.volumes.is_empty());
    }

    #[test]
    fn test_git_is_two_stage_and_wrapped() {
        let mut pkg = package();
        pkg.git = vec![
            "https://github.com/ros-industrial/universal_robot".to_string(),
            "git@github.com:org/driver.git:devel".to_string(),
        ];
        pkg.ssh = vec!["/home/me/.ssh/deploy_key".to_string()];
        let build = package_build(&robot("melodic"), &pkg, "/ros_workspace").unwrap();
        let spec = &build.spec;

        assert!(spec.two_stage);
        assert_eq!(
            spec.fetch_commands,
            vec![
                "git -C /ros_workspace/src clone -b melodic https://github.com/ros-industrial/universal_robot"
                    .to_string(),
                "git -C /ros_workspace/src clone -b devel git@github.com:org/driver.git".to_string(),
            ]
        );
        assert_eq!(
            spec.run,
            r#"["/bin/bash","-c","source /opt/ros/melodic/setup.bash && source /ros_workspace/devel/setup.bash && roslaunch ur_gazebo ur10.launch"]"#
        );
        assert_eq!(spec.ssh_keys, vec!["deploy_key".to_string()]);
        assert_eq!(spec.fetch_packages, vec!["git".to_string(), "openssh-client".to_string()]);
        assert_eq!(
            spec.assets,
            vec![Asset {
                source: "/home/me/.ssh/deploy_key".to_string(),
                target: "./packages/r1-ur/ssh/deploy_key".to_string(),
            }]
        );
    }

    #[test]
    fn test_rosinstall_on_ros2() {
        let mut pkg = package();
        pkg.rosinstall = Some("config/robot.rosinstall".to_string());
        let build = package_build(&robot("foxy"), &pkg, "/ws").unwrap();
        let spec = &build.spec;

        assert!(spec.two_stage);
        assert_eq!(spec.rosinstall.as_deref(), Some("rosinstall/robot.rosinstall"));
        assert_eq!(
            spec.fetch_commands,
            vec!["vcs import /ws/src < /ws/rosinstall/robot.rosinstall".to_string()]
        );
        assert_eq!(spec.build_tool, "colcon build");
        assert!(spec.run.contains("source /ws/install/setup.bash"));
    }

    #[test]
    fn test_files_become_assets_and_volumes() {
        let mut pkg = package();
        pkg.apt = vec!["ros-foxy-demo-nodes-cpp".to_string()];
        pkg.files = vec!["conf/params.yaml:/etc/params.yaml".to_string()];
        let build = package_build(&robot("foxy"), &pkg, "/ros_workspace").unwrap();

        assert_eq!(
            build.volumes,
            vec!["./packages/r1-ur/files/params.yaml:/etc/params.yaml".to_string()]
        );
        assert_eq!(build.spec.assets[0].source, "conf/params.yaml");
    }

    #[test]
    fn test_clashing_file_names() {
        let mut pkg = package();
        pkg.apt = vec!["x".to_string()];
        pkg.files = vec!["a/params.yaml:/a".to_string(), "b/params.yaml:/b".to_string()];
        assert!(matches!(
            package_build(&robot("foxy"), &pkg, "/ros_workspace"),
            Err(ConvertError::Internal { .. })
        ));
    }

    #[test]
    fn test_split_git_entry() {
        assert_eq!(split_git_entry("https://host/repo"), ("https://host/repo", None));
        assert_eq!(split_git_entry("https://host/repo:main"), ("https://host/repo", Some("main")));
        assert_eq!(split_git_entry("git@host:repo.git"), ("git@host:repo.git", None));
        assert_eq!(split_git_entry("https://host:8443/repo"), ("https://host:8443/repo", None));
    }

    #[test]
    fn test_build_context() {
        assert_eq!(build_context("packages", "r1-ur"), "./packages/r1-ur");
        assert_eq!(build_context("/srv/out/", "r1-ur"), "/srv/out/r1-ur");
        assert_eq!(build_context("", "r1-ur"), "./r1-ur");
    }

    #[test]
    fn test_rosinstall_named_dockerfile_does_not_shadow_it() {
        let mut pkg = package();
        pkg.rosinstall = Some("deps/Dockerfile".to_string());
        let build = package_build(&robot("noetic"), &pkg, "/ws").unwrap();

        assert_eq!(build.spec.assets.len(), 1);
        assert_eq!(build.spec.assets[0].target, "./packages/r1-ur/rosinstall/Dockerfile");
        assert_ne!(build.spec.assets[0].target, format!("{}/Dockerfile", build.spec.context));
    }
}
