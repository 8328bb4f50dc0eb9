use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pkgmux_backend::manifest::DEPENDENCY_DIR;
use pkgmux_backend::{BackendError, PackageInfo, PackageManifest};

use crate::tool::ListFormat;

#[derive(Debug, Default, Deserialize)]
struct ListedPackage {
    #[serde(default)]
    version: String,
    #[serde(default)]
    path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ListedProject {
    #[serde(default)]
    dependencies: BTreeMap<String, ListedPackage>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, ListedPackage>,
}

#[derive(Debug, Deserialize)]
struct YarnEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct YarnTrees {
    #[serde(default)]
    trees: Vec<YarnTree>,
}

#[derive(Debug, Deserialize)]
struct YarnTree {
    name: String,
}

/// Parse the `list --json` output of a tool into package records.
///
/// # Errors
/// Returns [`BackendError::Parse`] when the output is not in `format`.
pub fn parse_list(
    format: ListFormat,
    stdout: &str,
    manager: &str,
    global: bool,
) -> Result<Vec<PackageInfo>, BackendError> {
    let listed = match format {
        ListFormat::NpmTree => {
            let project: ListedProject = serde_json::from_str(stdout)
                .map_err(|e| BackendError::parse_from("npm list output", e))?;
            flatten(project)
        }
        ListFormat::PnpmArray => {
            let projects: Vec<ListedProject> = serde_json::from_str(stdout)
                .map_err(|e| BackendError::parse_from("pnpm list output", e))?;
            projects.into_iter().next().map(flatten).unwrap_or_default()
        }
        ListFormat::YarnLines => parse_yarn_lines(stdout),
    };

    Ok(listed
        .into_iter()
        .map(|(name, package)| {
            let mut info = PackageInfo::new(name, package.version, manager);
            if let Some(path) = package.path {
                info = info.with_path(path);
            }
            if global { info.global() } else { info }
        })
        .collect())
}

fn flatten(project: ListedProject) -> Vec<(String, ListedPackage)> {
    project
        .dependencies
        .into_iter()
        .chain(project.dev_dependencies)
        .collect()
}

fn parse_yarn_lines(stdout: &str) -> Vec<(String, ListedPackage)> {
    let mut packages = Vec::new();

    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Ok(event) = serde_json::from_str::<YarnEvent>(line) else {
            continue;
        };
        if event.kind != "tree" {
            continue;
        }
        let Ok(data) = serde_json::from_value::<YarnTrees>(event.data) else {
            continue;
        };
        for tree in data.trees {
            if let Some((name, version)) = split_name_version(&tree.name) {
                packages.push((
                    name.to_string(),
                    ListedPackage {
                        version: version.to_string(),
                        path: None,
                    },
                ));
            }
        }
    }

    packages
}

/// Split `name@version`, keeping the `@` of scoped names.
#[must_use]
pub fn split_name_version(entry: &str) -> Option<(&str, &str)> {
    let (name, version) = entry.rsplit_once('@')?;
    if name.is_empty() || version.is_empty() {
        return None;
    }
    Some((name, version))
}

/// Dependencies and dev-dependencies declared by a manifest, each pointing at
/// its expected install location under `project_dir`.
#[must_use]
pub fn manifest_packages(
    manifest: &PackageManifest,
    project_dir: &Path,
    manager: &str,
) -> Vec<PackageInfo> {
    let modules = project_dir.join(DEPENDENCY_DIR);
    manifest
        .dependencies
        .iter()
        .chain(&manifest.dev_dependencies)
        .map(|(name, version)| {
            PackageInfo::new(name.as_str(), version.as_str(), manager).with_path(modules.join(name))
        })
        .collect()
}

/// Trimmed `config get` output, treating the tools' placeholders for an
/// unset key as absent.
#[must_use]
pub fn config_value(stdout: &str) -> Option<String> {
    let value = stdout.trim();
    if value.is_empty() || value == "undefined" || value == "null" {
        None
    } else {
        Some(value.to_string())
    }
}
