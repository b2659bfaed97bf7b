//! Writing rendered artifacts to disk
//!
//! Every asset source is checked before the first byte is written, so a
//! missing key or config file leaves the output directory untouched.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::renderer::Artifacts;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("file '{}' does not exist", path.display())]
    MissingAsset { path: PathBuf },

    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Paths written by [`write_artifacts`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Written {
    pub manifest: PathBuf,
    pub dockerfiles: Vec<PathBuf>,
    pub assets: Vec<PathBuf>,
}

/// Write the manifest to `manifest_path` and everything else next to it
///
/// Relative asset sources are resolved against `source_dir`, the directory
/// of the configuration document.
pub fn write_artifacts(
    artifacts: &Artifacts,
    manifest_path: &Path,
    source_dir: &Path,
) -> Result<Written, OutputError> {
    let out_dir = match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut copies = Vec::with_capacity(artifacts.assets.len());
    for asset in &artifacts.assets {
        let source = source_dir.join(&asset.source);
        if !source.is_file() {
            return Err(OutputError::MissingAsset { path: source });
        }
        copies.push((source, out_dir.join(&asset.target)));
    }

    let mut written = Written::default();

    for dockerfile in &artifacts.dockerfiles {
        let path = out_dir.join(&dockerfile.path);
        write_file(&path, &dockerfile.content)?;
        debug!(path = %path.display(), "wrote Dockerfile");
        written.dockerfiles.push(path);
    }

    for (source, target) in copies {
        create_parent(&target)?;
        fs::copy(&source, &target).map_err(|source_err| OutputError::Io {
            path: target.clone(),
            source: source_err,
        })?;
        written.assets.push(target);
    }

    write_file(manifest_path, &artifacts.manifest)?;
    written.manifest = manifest_path.to_path_buf();

    info!(
        manifest = %manifest_path.display(),
        dockerfiles = written.dockerfiles.len(),
        assets = written.assets.len(),
        "wrote artifacts"
    );

    Ok(written)
}

fn write_file(path: &Path, content: &str) -> Result<(), OutputError> {
    create_parent(path)?;
    fs::write(path, content).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create_parent(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| OutputError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::Asset;
    use crate::renderer::Dockerfile;

    fn artifacts(asset_source: &str) -> Artifacts {
        Artifacts {
            manifest: "services: {}\n".to_string(),
            dockerfiles: vec![Dockerfile {
                service: "r1-ur".to_string(),
                path: "./packages/r1-ur/Dockerfile".to_string(),
                content: "FROM ros:melodic\n".to_string(),
            }],
            assets: vec![Asset {
                source: asset_source.to_string(),
                target: "./packages/r1-ur/files/params.yaml".to_string(),
            }],
        }
    }

    #[test]
    fn test_writes_everything() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(src.path().join("params.yaml"), "rate: 10\n").unwrap();

        let manifest = out.path().join("docker-compose.yml");
        let written = write_artifacts(&artifacts("params.yaml"), &manifest, src.path()).unwrap();

        assert_eq!(fs::read_to_string(&manifest).unwrap(), "services: {}\n");
        assert_eq!(
            fs::read_to_string(out.path().join("packages/r1-ur/Dockerfile")).unwrap(),
            "FROM ros:melodic\n"
        );
        assert_eq!(
            fs::read_to_string(out.path().join("packages/r1-ur/files/params.yaml")).unwrap(),
            "rate: 10\n"
        );
        assert_eq!(written.dockerfiles.len(), 1);
        assert_eq!(written.assets.len(), 1);
    }

    #[test]
    fn test_missing_asset_writes_nothing() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let manifest = out.path().join("docker-compose.yml");

        let err = write_artifacts(&artifacts("missing.yaml"), &manifest, src.path()).unwrap_err();

        assert!(matches!(err, OutputError::MissingAsset { .. }));
        assert!(!manifest.exists());
        assert!(!out.path().join("packages").exists());
    }
}
