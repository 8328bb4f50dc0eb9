use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pkgmux_backend::manifest::{self, DEPENDENCY_DIR};
use pkgmux_backend::{
    BackendError, Context, DependencyNode, PackageInfo, PackageManifest, ProjectAnalysis,
    ProjectInfo,
};
use pkgmux_platform::fs;

use crate::fanout::{absorb, fan_out};
use crate::packages::PackageService;
use crate::registry::BackendRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub total_projects: usize,
    pub multi_manager_projects: usize,
    pub by_manager: BTreeMap<String, usize>,
}

impl ProjectStats {
    #[must_use]
    pub fn from_projects(projects: &[ProjectInfo]) -> Self {
        let mut stats = Self {
            total_projects: projects.len(),
            ..Self::default()
        };
        for project in projects {
            if project.is_multi_manager() {
                stats.multi_manager_projects += 1;
            }
            for manager in &project.managers {
                *stats.by_manager.entry(manager.clone()).or_default() += 1;
            }
        }
        stats
    }
}

/// Combine records describing the same directory: managers are unioned and
/// the first lock file seen is kept. The result is ordered by the path's
/// text, so `/w/a-b` sorts before `/w/a/c`.
#[must_use]
pub fn merge_projects(projects: impl IntoIterator<Item = ProjectInfo>) -> Vec<ProjectInfo> {
    let mut merged: BTreeMap<PathBuf, ProjectInfo> = BTreeMap::new();

    for project in projects {
        match merged.get_mut(&project.path) {
            Some(existing) => {
                existing.managers.extend(project.managers);
                if existing.lock_file.is_none() {
                    existing.lock_file = project.lock_file;
                }
            }
            None => {
                merged.insert(project.path.clone(), project);
            }
        }
    }

    let mut projects: Vec<ProjectInfo> = merged.into_values().collect();
    projects.sort_by(|a, b| a.path.as_os_str().cmp(b.path.as_os_str()));
    projects
}

/// One-level tree of the manifest's declared dependencies, runtime ones
/// first, each group ordered by name.
#[must_use]
pub fn dependency_tree(manifest: &PackageManifest) -> DependencyNode {
    let runtime = manifest
        .dependencies
        .iter()
        .map(|(name, version)| DependencyNode::leaf(name.as_str(), version.as_str(), false, 1));
    let dev = manifest
        .dev_dependencies
        .iter()
        .map(|(name, version)| DependencyNode::leaf(name.as_str(), version.as_str(), true, 1));

    DependencyNode {
        dependencies: runtime.chain(dev).collect(),
        ..DependencyNode::leaf(manifest.name.as_str(), manifest.version.as_str(), false, 0)
    }
}

fn validate_root(root: &str) -> Result<PathBuf, BackendError> {
    if root.trim().is_empty() {
        return Err(BackendError::validation("root", root, "must not be empty"));
    }
    let path = fs::expand_path(root);
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => Ok(path),
        Ok(_) => Err(BackendError::validation("root", root, "not a directory")),
        Err(_) => Err(BackendError::validation("root", root, "path does not exist")),
    }
}

/// Non-empty project path with a leading `~` expanded.
fn validate_project_path(path: &Path) -> Result<PathBuf, BackendError> {
    let raw = path.to_string_lossy();
    if raw.trim().is_empty() {
        return Err(BackendError::validation(
            "project_path",
            raw.into_owned(),
            "project path cannot be empty",
        ));
    }
    Ok(fs::expand_path(&raw))
}

pub struct ProjectService {
    registry: Arc<BackendRegistry>,
    packages: PackageService,
}

impl ProjectService {
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            packages: PackageService::new(Arc::clone(&registry)),
            registry,
        }
    }

    /// Projects below `root` as reported by every available manager, one
    /// record per directory.
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] when `root` is empty, missing, or
    /// not a directory.
    pub async fn scan(&self, ctx: &Context, root: &str) -> Result<Vec<ProjectInfo>, BackendError> {
        let root = validate_root(root)?;
        ctx.check()?;

        let backends = self.registry.available(ctx).await;
        let root = root.as_path();
        let outcomes = fan_out(ctx, backends, |backend| async move {
            backend.discover_projects(ctx, root).await
        })
        .await;

        let projects = merge_projects(
            absorb("discover projects", outcomes, |_| false)
                .into_iter()
                .flat_map(|(_, projects)| projects),
        );
        debug!("Found {} projects under {}", projects.len(), root.display());
        Ok(projects)
    }

    /// # Errors
    /// Returns [`BackendError::Validation`] for an empty path,
    /// [`BackendError::ProjectNotFound`] when the project has no manifest, or
    /// an IO/parse error when it cannot be read.
    pub async fn analyze(
        &self,
        ctx: &Context,
        project_path: &Path,
    ) -> Result<ProjectAnalysis, BackendError> {
        let project_path = validate_project_path(project_path)?;
        let project_path = project_path.as_path();
        let manifest = PackageManifest::read_from_dir(project_path).await?;

        let managers = manifest::detect_managers(project_path);
        let lock_file = managers
            .first()
            .and_then(|manager| manifest::find_lock_file(project_path, manager));

        let name = if manifest.name.is_empty() {
            project_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            manifest.name.clone()
        };
        let mut project = ProjectInfo::new(name, project_path, manifest::DEFAULT_MANAGER);
        project.managers = managers.iter().map(|m| (*m).to_string()).collect();
        project.lock_file = lock_file;

        let packages = match self.packages.all_packages(ctx, project_path).await {
            Ok(packages) => packages,
            Err(e) => {
                warn!("Could not list packages of {}: {e}", project_path.display());
                Vec::new()
            }
        };

        let total_size = Self::dependency_size(project_path, &packages).await;

        Ok(ProjectAnalysis {
            project,
            package_count: packages.len(),
            dev_package_count: manifest.dev_dependencies.len(),
            total_size,
            outdated_packages: Vec::new(),
            vulnerabilities: Vec::new(),
            scripts: manifest.scripts,
        })
    }

    async fn dependency_size(project_path: &Path, packages: &[PackageInfo]) -> u64 {
        let modules = project_path.join(DEPENDENCY_DIR);
        if tokio::fs::metadata(&modules).await.is_ok_and(|m| m.is_dir()) {
            match tokio::task::spawn_blocking(move || fs::dir_stats(&modules)).await {
                Ok(Ok(stats)) => return stats.size,
                Ok(Err(e)) => warn!("Could not measure {DEPENDENCY_DIR}: {e}"),
                Err(e) => warn!("Measuring {DEPENDENCY_DIR} failed: {e}"),
            }
        }
        packages.iter().filter_map(|p| p.size).sum()
    }

    /// Declared dependencies of the project, read from its manifest only.
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] for an empty path and
    /// [`BackendError::ProjectNotFound`] when the project has no manifest.
    pub async fn dependencies(&self, project_path: &Path) -> Result<DependencyNode, BackendError> {
        let project_path = validate_project_path(project_path)?;
        let manifest = PackageManifest::read_from_dir(&project_path).await?;
        Ok(dependency_tree(&manifest))
    }

    /// # Errors
    /// Same as [`ProjectService::scan`].
    pub async fn stats(&self, ctx: &Context, root: &str) -> Result<ProjectStats, BackendError> {
        Ok(ProjectStats::from_projects(&self.scan(ctx, root).await?))
    }
}
