//! Writing generated artifacts to a directory

use std::fs;

use ros_composer::{generate, write_artifacts, OutputError};

const SOURCE: &str = r#"
areas:
  - id: lab
    robots: [arm]
robots:
  - id: arm
    ros: humble
    packages: [driver]
packages:
  - id: driver
    path: out
    apt: [ros-humble-ur-robot-driver]
    files: ["config/params.yaml:/etc/driver/params.yaml"]
    command: ros2 launch ur_robot_driver ur_control.launch.py
"#;

#[test]
fn test_writes_manifest_dockerfile_and_files() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    fs::create_dir(src.path().join("config")).unwrap();
    fs::write(src.path().join("config/params.yaml"), "rate: 500\n").unwrap();

    let artifacts = generate(SOURCE).unwrap();
    let manifest = out.path().join("docker-compose.yml");
    let written = write_artifacts(&artifacts, &manifest, src.path()).unwrap();

    let compose: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&manifest).unwrap()).unwrap();
    assert_eq!(
        compose["services"]["arm-driver"]["volumes"][0],
        serde_yaml::Value::String(
            "./out/arm-driver/files/params.yaml:/etc/driver/params.yaml".to_string()
        )
    );

    let dockerfile = fs::read_to_string(out.path().join("out/arm-driver/Dockerfile")).unwrap();
    assert!(dockerfile.contains("FROM ros:humble\n"));
    assert_eq!(
        fs::read_to_string(out.path().join("out/arm-driver/files/params.yaml")).unwrap(),
        "rate: 500\n"
    );
    assert_eq!(written.dockerfiles.len(), 1);
}

#[test]
fn test_missing_file_aborts_before_writing() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let artifacts = generate(SOURCE).unwrap();
    let manifest = out.path().join("docker-compose.yml");
    let err = write_artifacts(&artifacts, &manifest, src.path()).unwrap_err();

    assert!(matches!(err, OutputError::MissingAsset { .. }));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}
