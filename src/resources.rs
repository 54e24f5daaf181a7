//! Resource file enumeration.
//!
//! Every file under the resource root becomes a [`CopyRule`] whose destination
//! is the file's directory relative to the root, so the tree is mirrored under
//! the project's output directory. This is the only module that reads the
//! filesystem during a run; the driver receives the result as plain data.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::configuration::CopyRule;
use crate::driver::ResourceManifests;
use crate::error::MatrixError;
use crate::registry::Registry;
use crate::settings::GeneratorSettings;

/// Enumerate `root` recursively in path order. A missing root yields nothing.
pub fn scan(root: &Path) -> Result<Vec<CopyRule>, MatrixError> {
    if !root.exists() {
        tracing::debug!(root = %root.display(), "resource root missing, no resources");
        return Ok(Vec::new());
    }
    let root = std::path::absolute(root).map_err(|e| MatrixError::IoError {
        path: root.to_path_buf(),
        source: e,
    })?;

    let mut rules = Vec::new();
    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.map_err(|e| MatrixError::IoError {
            path: e.path().map_or_else(|| root.clone(), Path::to_path_buf),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let destination = entry
            .path()
            .strip_prefix(&root)
            .ok()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        rules.push(CopyRule::new(entry.path(), destination));
    }

    tracing::debug!(root = %root.display(), files = rules.len(), "resources scanned");
    Ok(rules)
}

/// Scan `root` once and hand the manifest to `projects`, or to every declared
/// project when `projects` is empty.
pub fn collect(
    registry: &Registry,
    root: &Path,
    projects: &[String],
) -> Result<ResourceManifests, MatrixError> {
    for name in projects {
        if registry.project(name).is_none() {
            return Err(MatrixError::UnknownProject {
                name: name.clone(),
                referenced_by: "resources.projects".into(),
            });
        }
    }

    let manifest = scan(root)?;
    let mut manifests = ResourceManifests::new();
    if manifest.is_empty() {
        return Ok(manifests);
    }
    for project in registry.projects() {
        if projects.is_empty() || projects.iter().any(|p| p == project.name()) {
            manifests.insert(project.name().to_string(), manifest.clone());
        }
    }
    Ok(manifests)
}

/// The resource root for `settings`, relative to the registry's definition
/// directory unless configured as an absolute path.
pub fn resource_root(registry: &Registry, settings: &GeneratorSettings) -> PathBuf {
    Path::new(registry.definition_dir()).join(&settings.resources.dir)
}

/// [`collect`] driven by settings.
pub fn manifests_for(
    registry: &Registry,
    settings: &GeneratorSettings,
) -> Result<ResourceManifests, MatrixError> {
    collect(
        registry,
        &resource_root(registry, settings),
        &settings.resources.projects,
    )
}
