use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::manifest::{DEPENDENCY_DIR, MANIFEST_FILE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInfo {
    pub manager: String,
    pub path: PathBuf,
    pub size: u64,
    pub file_count: u64,
    /// `None` when the cache directory has never been written.
    pub last_updated: Option<DateTime<Utc>>,
}

impl CacheInfo {
    #[must_use]
    pub fn empty(manager: impl Into<String>, path: PathBuf) -> Self {
        Self {
            manager: manager.into(),
            path,
            size: 0,
            file_count: 0,
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub manager: String,
    pub is_global: bool,
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageInfo {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        manager: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            manager: manager.into(),
            is_global: false,
            path: PathBuf::new(),
            size: None,
            description: None,
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Identity used when collapsing duplicate reports.
    #[must_use]
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.name, &self.version, &self.manager)
    }

    /// Case-insensitive match on name or description; `needle` must already be lowercase.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub manager: String,
    pub registry: String,
    /// Empty when no proxy is configured.
    pub proxy: String,
    pub settings: BTreeMap<String, String>,
}

impl ManagerConfig {
    #[must_use]
    pub fn new(manager: impl Into<String>) -> Self {
        Self {
            manager: manager.into(),
            registry: String::new(),
            proxy: String::new(),
            settings: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn has_proxy(&self) -> bool {
        !self.proxy.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub path: PathBuf,
    pub managers: BTreeSet<String>,
    pub package_file: PathBuf,
    pub lock_file: Option<PathBuf>,
    pub node_modules: PathBuf,
}

impl ProjectInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, path: &Path, manager: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.to_path_buf(),
            managers: BTreeSet::from([manager.into()]),
            package_file: path.join(MANIFEST_FILE),
            lock_file: None,
            node_modules: path.join(DEPENDENCY_DIR),
        }
    }

    #[must_use]
    pub fn with_lock_file(mut self, lock_file: Option<PathBuf>) -> Self {
        self.lock_file = lock_file;
        self
    }

    #[must_use]
    pub fn is_multi_manager(&self) -> bool {
        self.managers.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub package: String,
    pub version: String,
    pub severity: String,
    pub title: String,
    pub description: String,
    pub fixed_in: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectAnalysis {
    #[serde(flatten)]
    pub project: ProjectInfo,
    pub package_count: usize,
    pub dev_package_count: usize,
    pub total_size: u64,
    pub outdated_packages: Vec<PackageInfo>,
    pub vulnerabilities: Vec<Vulnerability>,
    pub scripts: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyNode>,
    pub dev_dependency: bool,
    pub depth: u32,
}

impl DependencyNode {
    #[must_use]
    pub fn leaf(
        name: impl Into<String>,
        version: impl Into<String>,
        dev_dependency: bool,
        depth: u32,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
            dev_dependency,
            depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerStatus {
    pub name: String,
    pub available: bool,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::{CacheInfo, DependencyNode, PackageInfo, ProjectAnalysis, ProjectInfo};

    #[test]
    fn cache_info_serializes_expected_field_names() {
        let info = CacheInfo::empty("npm", "/home/u/.npm".into());

        let value = serde_json::to_value(&info).expect("cache info should serialize");

        assert_eq!(
            value,
            json!({
                "manager": "npm",
                "path": "/home/u/.npm",
                "size": 0,
                "file_count": 0,
                "last_updated": null,
            })
        );
    }

    #[test]
    fn package_search_matches_name_or_description_case_insensitively() {
        let pkg = PackageInfo::new("TypeScript", "5.4.0", "npm")
            .with_description("A typed superset of JavaScript");

        assert!(pkg.matches_lowercase("script"));
        assert!(pkg.matches_lowercase("superset"));
        assert!(!pkg.matches_lowercase("python"));
    }

    #[test]
    fn package_without_optional_fields_omits_them() {
        let value = serde_json::to_value(PackageInfo::new("lodash", "4.17.21", "npm").global())
            .expect("package should serialize");

        assert_eq!(value["is_global"], json!(true));
        assert!(value.get("size").is_none());
        assert!(value.get("dependencies").is_none());
    }

    #[test]
    fn project_info_derives_manifest_and_dependency_paths() {
        let project = ProjectInfo::new("app", Path::new("/work/app"), "yarn");

        assert_eq!(project.package_file, Path::new("/work/app/package.json"));
        assert_eq!(project.node_modules, Path::new("/work/app/node_modules"));
        assert!(project.managers.contains("yarn"));
        assert!(!project.is_multi_manager());
    }

    #[test]
    fn project_analysis_flattens_project_fields() {
        let analysis = ProjectAnalysis {
            project: ProjectInfo::new("app", Path::new("/work/app"), "npm"),
            package_count: 2,
            dev_package_count: 1,
            total_size: 10,
            outdated_packages: Vec::new(),
            vulnerabilities: Vec::new(),
            scripts: std::collections::BTreeMap::new(),
        };

        let value = serde_json::to_value(&analysis).expect("analysis should serialize");

        assert_eq!(value["name"], json!("app"));
        assert_eq!(value["managers"], json!(["npm"]));
        assert_eq!(value["package_count"], json!(2));
        assert_eq!(value["outdated_packages"], json!([]));
    }

    #[test]
    fn dependency_leaf_has_no_children() {
        let node = DependencyNode::leaf("react", "18.2.0", false, 1);

        let value = serde_json::to_value(&node).expect("node should serialize");

        assert!(value.get("dependencies").is_none());
        assert_eq!(value["depth"], json!(1));
    }
}
