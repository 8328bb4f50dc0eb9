//! `package.json` parsing and the lock-file rule table shared by the
//! adapters and the project service.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::BackendError;

pub const MANIFEST_FILE: &str = "package.json";
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Manager assumed for a project that has a manifest but no lock file.
pub const DEFAULT_MANAGER: &str = "npm";

/// Lock file name → manager that writes it, in detection order.
pub const LOCK_FILE_RULES: &[(&str, &str)] = &[
    ("package-lock.json", "npm"),
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("bun.lockb", "bun"),
    ("bun.lock", "bun"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Parse a manifest from its JSON text.
    ///
    /// # Errors
    /// Returns [`BackendError::Parse`] when the text is not a valid manifest.
    pub fn parse(content: &str) -> Result<Self, BackendError> {
        serde_json::from_str(content).map_err(|e| BackendError::parse_from("package.json", e))
    }

    /// Read the manifest in `project_dir`.
    ///
    /// # Errors
    /// Returns [`BackendError::ProjectNotFound`] when the directory has no
    /// manifest, or an IO/parse error when it cannot be read.
    pub async fn read_from_dir(project_dir: &Path) -> Result<Self, BackendError> {
        let path = manifest_path(project_dir);
        if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) {
            return Err(BackendError::ProjectNotFound {
                path: project_dir.to_path_buf(),
            });
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Self::parse(&content)
    }
}

#[must_use]
pub fn manifest_path(project_dir: &Path) -> PathBuf {
    project_dir.join(MANIFEST_FILE)
}

#[must_use]
pub fn has_manifest(project_dir: &Path) -> bool {
    manifest_path(project_dir).is_file()
}

/// Lock files for `manager`, in rule order.
pub fn lock_files_for(manager: &str) -> impl Iterator<Item = &'static str> + '_ {
    LOCK_FILE_RULES
        .iter()
        .filter(move |(_, owner)| *owner == manager)
        .map(|(file, _)| *file)
}

/// First lock file of `manager` that exists in `project_dir`.
#[must_use]
pub fn find_lock_file(project_dir: &Path, manager: &str) -> Option<PathBuf> {
    lock_files_for(manager)
        .map(|file| project_dir.join(file))
        .find(|path| path.is_file())
}

/// Managers whose lock file is present in `project_dir`, each listed once in
/// rule order. Falls back to [`DEFAULT_MANAGER`] when only a manifest exists.
#[must_use]
pub fn detect_managers(project_dir: &Path) -> Vec<&'static str> {
    let mut managers: Vec<&'static str> = Vec::new();
    for (file, manager) in LOCK_FILE_RULES {
        if !managers.contains(manager) && project_dir.join(file).is_file() {
            managers.push(manager);
        }
    }

    if managers.is_empty() && has_manifest(project_dir) {
        managers.push(DEFAULT_MANAGER);
    }

    managers
}
