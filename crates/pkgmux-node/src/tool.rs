use std::path::PathBuf;

/// The JavaScript package managers the adapters know how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTool {
    Npm,
    Pnpm,
    Yarn,
    Bun,
}

/// How a tool empties its cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearStrategy {
    Command(&'static [&'static str]),
    RemoveDir,
}

/// Shape of the JSON a tool prints for `list --json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `{"dependencies": {"name": {"version": ..}}}`
    NpmTree,
    /// `[{"dependencies": {..}, "devDependencies": {..}}]`
    PnpmArray,
    /// One JSON event per line, package names inside `tree` events.
    YarnLines,
}

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

impl NodeTool {
    pub const ALL: [NodeTool; 4] = [NodeTool::Npm, NodeTool::Pnpm, NodeTool::Yarn, NodeTool::Bun];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            NodeTool::Npm => "npm",
            NodeTool::Pnpm => "pnpm",
            NodeTool::Yarn => "yarn",
            NodeTool::Bun => "bun",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Command printing the cache location, when the tool has one.
    #[must_use]
    pub fn cache_dir_query(self) -> Option<&'static [&'static str]> {
        match self {
            NodeTool::Npm => Some(&["config", "get", "cache"]),
            NodeTool::Pnpm => Some(&["store", "path"]),
            NodeTool::Yarn => Some(&["cache", "dir"]),
            NodeTool::Bun => None,
        }
    }

    /// Where the tool keeps its cache when it has not been configured.
    #[must_use]
    pub fn default_cache_dir(self) -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        let relative = match self {
            NodeTool::Npm => ".npm",
            #[cfg(target_os = "macos")]
            NodeTool::Yarn => "Library/Caches/Yarn",
            #[cfg(not(target_os = "macos"))]
            NodeTool::Yarn => ".cache/yarn",
            #[cfg(target_os = "macos")]
            NodeTool::Pnpm => "Library/pnpm/store",
            #[cfg(not(target_os = "macos"))]
            NodeTool::Pnpm => ".local/share/pnpm/store",
            #[cfg(target_os = "macos")]
            NodeTool::Bun => "Library/Caches/bun",
            #[cfg(not(target_os = "macos"))]
            NodeTool::Bun => ".cache/bun",
        };
        Some(home.join(relative))
    }

    #[must_use]
    pub fn clear_strategy(self) -> ClearStrategy {
        match self {
            NodeTool::Npm => ClearStrategy::Command(&["cache", "clean", "--force"]),
            NodeTool::Pnpm => ClearStrategy::Command(&["store", "prune"]),
            NodeTool::Yarn => ClearStrategy::Command(&["cache", "clean"]),
            NodeTool::Bun => ClearStrategy::RemoveDir,
        }
    }

    /// Arguments listing the packages of the project in the working directory.
    /// `None` means the manifest is the only source.
    #[must_use]
    pub fn project_list(self) -> Option<(&'static [&'static str], ListFormat)> {
        match self {
            NodeTool::Pnpm => Some((&["list", "--json", "--depth=0"], ListFormat::PnpmArray)),
            NodeTool::Yarn => Some((&["list", "--json", "--depth=0"], ListFormat::YarnLines)),
            NodeTool::Npm | NodeTool::Bun => None,
        }
    }

    /// Arguments listing globally installed packages. `None` means the tool
    /// has no global install location.
    #[must_use]
    pub fn global_list(self) -> Option<(&'static [&'static str], ListFormat)> {
        match self {
            NodeTool::Npm => Some((&["list", "-g", "--depth=0", "--json"], ListFormat::NpmTree)),
            NodeTool::Pnpm => Some((&["list", "-g", "--depth=0", "--json"], ListFormat::PnpmArray)),
            NodeTool::Yarn => Some((
                &["global", "list", "--json", "--depth=0"],
                ListFormat::YarnLines,
            )),
            NodeTool::Bun => None,
        }
    }

    /// Whether registry and proxy can be read and written with `config get/set`.
    #[must_use]
    pub fn has_config_command(self) -> bool {
        !matches!(self, NodeTool::Bun)
    }

    /// Extra `config get` keys reported in [`pkgmux_backend::ManagerConfig::settings`].
    #[must_use]
    pub fn setting_keys(self) -> &'static [&'static str] {
        match self {
            NodeTool::Npm => &["cache", "prefix", "userconfig", "globalconfig"],
            NodeTool::Pnpm => &["cache-dir", "state-dir", "global-dir"],
            NodeTool::Yarn => &["cache-folder", "global-folder", "yarn-offline-mirror"],
            NodeTool::Bun => &[],
        }
    }

    /// Full argument list installing (or removing) `package`.
    #[must_use]
    pub fn package_args(self, install: bool, package: &str, global: bool) -> Vec<String> {
        let verb = match (self, install) {
            (NodeTool::Npm, true) => "install",
            (NodeTool::Npm, false) => "uninstall",
            (_, true) => "add",
            (_, false) => "remove",
        };

        let mut args = Vec::with_capacity(3);
        if global && self == NodeTool::Yarn {
            args.push("global".to_string());
        }
        args.push(verb.to_string());
        if global && self != NodeTool::Yarn {
            args.push("-g".to_string());
        }
        args.push(package.to_string());
        args
    }

    /// Locations checked when the binary is not on `PATH`.
    #[must_use]
    pub fn fallback_paths(self) -> Vec<PathBuf> {
        let binary = self.name();
        let mut paths = Vec::new();

        if let Some(home) = dirs::home_dir() {
            match self {
                NodeTool::Bun => paths.push(home.join(".bun").join("bin").join(binary)),
                NodeTool::Pnpm => {
                    paths.push(home.join(".local").join("share").join("pnpm").join(binary));
                }
                NodeTool::Yarn => paths.push(home.join(".yarn").join("bin").join(binary)),
                NodeTool::Npm => {}
            }
            paths.push(home.join(".local").join("bin").join(binary));
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/opt/homebrew/bin").join(binary));
        }

        #[cfg(unix)]
        {
            paths.push(PathBuf::from("/usr/local/bin").join(binary));
            paths.push(PathBuf::from("/usr/bin").join(binary));
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::{ClearStrategy, NodeTool};

    #[test]
    fn names_round_trip_through_from_name() {
        for tool in NodeTool::ALL {
            assert_eq!(NodeTool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(NodeTool::from_name("cargo"), None);
    }

    #[test]
    fn install_arguments_follow_each_tool_convention() {
        assert_eq!(NodeTool::Npm.package_args(true, "eslint", true), ["install", "-g", "eslint"]);
        assert_eq!(NodeTool::Npm.package_args(false, "eslint", false), ["uninstall", "eslint"]);
        assert_eq!(NodeTool::Pnpm.package_args(true, "eslint", false), ["add", "eslint"]);
        assert_eq!(NodeTool::Yarn.package_args(true, "eslint", true), ["global", "add", "eslint"]);
        assert_eq!(NodeTool::Bun.package_args(false, "eslint", true), ["remove", "-g", "eslint"]);
    }

    #[test]
    fn bun_is_cleared_by_removing_its_directory() {
        assert_eq!(NodeTool::Bun.clear_strategy(), ClearStrategy::RemoveDir);
        assert!(NodeTool::Bun.cache_dir_query().is_none());
        assert!(NodeTool::Bun.global_list().is_none());
        assert!(!NodeTool::Bun.has_config_command());
    }

    #[test]
    fn default_cache_dirs_live_under_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };

        for tool in NodeTool::ALL {
            let dir = tool.default_cache_dir().expect("home is known");
            assert!(dir.starts_with(&home), "{dir:?} outside {home:?}");
        }
    }
}
