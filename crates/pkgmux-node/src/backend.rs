use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use pkgmux_backend::manifest::{self, MANIFEST_FILE};
use pkgmux_backend::{
    BackendError, CacheInfo, Context, ManagerConfig, PackageBackend, PackageInfo, PackageManifest,
    ProjectInfo,
};
use pkgmux_platform::{fs, tool_command};

use crate::detection::{display_program, locate, parse_version};
use crate::listing::{config_value, manifest_packages, parse_list};
use crate::tool::{ClearStrategy, DEFAULT_REGISTRY, NodeTool};

/// Adapter driving one JavaScript package manager through its CLI.
#[derive(Debug, Clone)]
pub struct NodeBackend {
    tool: NodeTool,
    program: PathBuf,
    cache_dir_override: Option<PathBuf>,
}

impl NodeBackend {
    /// Adapter for `tool`, using the binary found on `PATH` or in a usual
    /// install location. The bare tool name is kept when nothing is found so
    /// that the availability probe reports it as missing.
    #[must_use]
    pub fn new(tool: NodeTool) -> Self {
        let program = locate(tool).unwrap_or_else(|| PathBuf::from(tool.name()));
        Self::with_program(tool, program)
    }

    #[must_use]
    pub fn with_program(tool: NodeTool, program: PathBuf) -> Self {
        Self {
            tool,
            program,
            cache_dir_override: None,
        }
    }

    /// Use `dir` as the cache location instead of asking the tool.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir_override = Some(dir);
        self
    }

    #[must_use]
    pub fn tool(&self) -> NodeTool {
        self.tool
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn build_command(&self, args: &[&str], cwd: Option<&Path>) -> Command {
        debug!(
            "Building {} command: {} {}",
            self.tool.name(),
            self.program.display(),
            args.join(" ")
        );

        let mut cmd = tool_command(&self.program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn execute_in(
        &self,
        ctx: &Context,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<String, BackendError> {
        info!("Executing {} command: {}", self.tool.name(), args.join(" "));

        let output = ctx
            .run(async {
                self.build_command(args, cwd)
                    .output()
                    .await
                    .map_err(BackendError::from)
            })
            .await?;

        debug!("{} command exit status: {:?}", self.tool.name(), output.status);
        trace!("{} stdout: {}", self.tool.name(), String::from_utf8_lossy(&output.stdout));

        if !output.stderr.is_empty() {
            trace!("{} stderr: {}", self.tool.name(), String::from_utf8_lossy(&output.stderr));
        }

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            debug!("{} command succeeded, output: {} bytes", self.tool.name(), stdout.len());
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                "{} command failed: args={args:?}, stderr='{stderr}'",
                self.tool.name()
            );
            Err(BackendError::CommandFailed {
                program: display_program(&self.program),
                code: output.status.code(),
                stderr,
            })
        }
    }

    async fn execute(&self, ctx: &Context, args: &[&str]) -> Result<String, BackendError> {
        self.execute_in(ctx, args, None).await
    }

    /// Installed version, or `None` when the tool cannot be run.
    pub async fn version(&self, ctx: &Context) -> Option<String> {
        match self.execute(ctx, &["--version"]).await {
            Ok(stdout) => parse_version(&stdout),
            Err(e) => {
                debug!("{} is not usable: {e}", self.tool.name());
                None
            }
        }
    }

    async fn cache_dir(&self, ctx: &Context) -> Result<PathBuf, BackendError> {
        if let Some(dir) = &self.cache_dir_override {
            return Ok(dir.clone());
        }

        if let Some(args) = self.tool.cache_dir_query() {
            match self.execute(ctx, args).await {
                Ok(stdout) => {
                    if let Some(dir) = config_value(&stdout) {
                        return Ok(fs::expand_path(&dir));
                    }
                }
                Err(BackendError::Cancelled) => return Err(BackendError::Cancelled),
                Err(BackendError::Timeout) => return Err(BackendError::Timeout),
                Err(e) => {
                    warn!(
                        "Could not query {} cache location, using default: {e}",
                        self.tool.name()
                    );
                }
            }
        }

        self.tool.default_cache_dir().ok_or_else(|| BackendError::Io {
            kind: std::io::ErrorKind::NotFound,
            message: "home directory unavailable".to_string(),
        })
    }

    async fn config_get(&self, ctx: &Context, key: &str) -> Result<Option<String>, BackendError> {
        let stdout = self.execute(ctx, &["config", "get", key]).await?;
        Ok(config_value(&stdout))
    }

    fn unsupported_config(&self, operation: &'static str, value: &str) -> BackendError {
        warn!("{} {operation} not supported (value '{value}')", self.tool.name());
        BackendError::Unsupported { operation }
    }

    async fn run_package_command(
        &self,
        ctx: &Context,
        install: bool,
        package: &str,
        global: bool,
    ) -> Result<(), BackendError> {
        let args = self.tool.package_args(install, package, global);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.execute(ctx, &args).await?;
        info!(
            "{} {} {package}{}",
            self.tool.name(),
            if install { "installed" } else { "removed" },
            if global { " globally" } else { "" }
        );
        Ok(())
    }
}

#[async_trait]
impl PackageBackend for NodeBackend {
    fn name(&self) -> &'static str {
        self.tool.name()
    }

    async fn is_available(&self, ctx: &Context) -> bool {
        self.version(ctx).await.is_some()
    }

    async fn cache_info(&self, ctx: &Context) -> Result<CacheInfo, BackendError> {
        let path = self.cache_dir(ctx).await?;

        if !tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
            debug!("{} cache {} does not exist", self.tool.name(), path.display());
            return Ok(CacheInfo::empty(self.tool.name(), path));
        }

        let walk_root = path.clone();
        let (stats, modified) = ctx
            .run(async move {
                tokio::task::spawn_blocking(move || {
                    (fs::dir_stats(&walk_root), fs::modified_time(&walk_root))
                })
                .await
                .map_err(join_error)
            })
            .await?;

        let stats = stats.unwrap_or_else(|e| {
            warn!("Failed to measure {} cache {}: {e}", self.tool.name(), path.display());
            fs::DirStats::default()
        });

        Ok(CacheInfo {
            manager: self.tool.name().to_string(),
            path,
            size: stats.size,
            file_count: stats.file_count,
            last_updated: modified.map(DateTime::<Utc>::from),
        })
    }

    async fn clear_cache(&self, ctx: &Context) -> Result<(), BackendError> {
        match self.tool.clear_strategy() {
            ClearStrategy::Command(args) => {
                self.execute(ctx, args).await?;
            }
            ClearStrategy::RemoveDir => {
                let path = self.cache_dir(ctx).await?;
                if tokio::fs::metadata(&path).await.is_ok() {
                    ctx.run(async {
                        tokio::fs::remove_dir_all(&path)
                            .await
                            .map_err(BackendError::from)
                    })
                    .await?;
                }
            }
        }

        info!("{} cache cleared", self.tool.name());
        Ok(())
    }

    async fn installed_packages(
        &self,
        ctx: &Context,
        project_path: &Path,
    ) -> Result<Vec<PackageInfo>, BackendError> {
        let manifest = PackageManifest::read_from_dir(project_path).await?;

        if let Some((args, format)) = self.tool.project_list() {
            match self.execute_in(ctx, args, Some(project_path)).await {
                Ok(stdout) => match parse_list(format, &stdout, self.tool.name(), false) {
                    Ok(packages) => return Ok(packages),
                    Err(e) => debug!(
                        "{} list output unusable, reading manifest: {e}",
                        self.tool.name()
                    ),
                },
                Err(BackendError::Cancelled) => return Err(BackendError::Cancelled),
                Err(BackendError::Timeout) => return Err(BackendError::Timeout),
                Err(e) => debug!("{} list failed, reading manifest: {e}", self.tool.name()),
            }
        }

        Ok(manifest_packages(&manifest, project_path, self.tool.name()))
    }

    async fn global_packages(&self, ctx: &Context) -> Result<Vec<PackageInfo>, BackendError> {
        let Some((args, format)) = self.tool.global_list() else {
            debug!("{} has no global packages", self.tool.name());
            return Ok(Vec::new());
        };

        let stdout = self.execute(ctx, args).await?;
        parse_list(format, &stdout, self.tool.name(), true)
    }

    async fn config(&self, ctx: &Context) -> Result<ManagerConfig, BackendError> {
        let mut config = ManagerConfig::new(self.tool.name());

        if !self.tool.has_config_command() {
            config.registry = DEFAULT_REGISTRY.to_string();
            if let Some(home) = dirs::home_dir() {
                let global = home.join(".bunfig.toml");
                if global.is_file() {
                    config
                        .settings
                        .insert("global-bunfig".to_string(), global.display().to_string());
                }
            }
            return Ok(config);
        }

        config.registry = self
            .config_get(ctx, "registry")
            .await?
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());

        match self.config_get(ctx, "proxy").await {
            Ok(proxy) => config.proxy = proxy.unwrap_or_default(),
            Err(e) => debug!("{} proxy unreadable: {e}", self.tool.name()),
        }

        if self.tool == NodeTool::Pnpm {
            match self.execute(ctx, &["store", "path"]).await {
                Ok(stdout) => {
                    if let Some(store) = config_value(&stdout) {
                        config.settings.insert("store-dir".to_string(), store);
                    }
                }
                Err(e) => debug!("pnpm store path unreadable: {e}"),
            }
        }

        for key in self.tool.setting_keys() {
            match self.config_get(ctx, key).await {
                Ok(Some(value)) => {
                    config.settings.insert((*key).to_string(), value);
                }
                Ok(None) => {}
                Err(e) => debug!("{} setting {key} unreadable: {e}", self.tool.name()),
            }
        }

        Ok(config)
    }

    async fn set_registry(&self, ctx: &Context, url: &str) -> Result<(), BackendError> {
        if !self.tool.has_config_command() {
            return Err(self.unsupported_config("set registry", url));
        }

        self.execute(ctx, &["config", "set", "registry", url]).await?;
        info!("{} registry set to {url}", self.tool.name());
        Ok(())
    }

    async fn set_proxy(&self, ctx: &Context, url: &str) -> Result<(), BackendError> {
        if !self.tool.has_config_command() {
            return Err(self.unsupported_config("set proxy", url));
        }

        for key in ["proxy", "https-proxy"] {
            if url.is_empty() {
                self.execute(ctx, &["config", "delete", key]).await?;
            } else {
                self.execute(ctx, &["config", "set", key, url]).await?;
            }
        }

        if url.is_empty() {
            info!("{} proxy removed", self.tool.name());
        } else {
            info!("{} proxy set to {url}", self.tool.name());
        }
        Ok(())
    }

    async fn discover_projects(
        &self,
        ctx: &Context,
        root: &Path,
    ) -> Result<Vec<ProjectInfo>, BackendError> {
        let tool = self.tool;
        let root = root.to_path_buf();
        let projects = ctx
            .run(async move {
                tokio::task::spawn_blocking(move || discover_blocking(tool, &root))
                    .await
                    .map_err(join_error)
            })
            .await?;

        debug!("{} found {} projects", self.tool.name(), projects.len());
        Ok(projects)
    }

    async fn install_package(
        &self,
        ctx: &Context,
        name: &str,
        global: bool,
    ) -> Result<(), BackendError> {
        self.run_package_command(ctx, true, name, global).await
    }

    async fn uninstall_package(
        &self,
        ctx: &Context,
        name: &str,
        global: bool,
    ) -> Result<(), BackendError> {
        self.run_package_command(ctx, false, name, global).await
    }
}

fn join_error(error: tokio::task::JoinError) -> BackendError {
    BackendError::Io {
        kind: std::io::ErrorKind::Other,
        message: error.to_string(),
    }
}

/// npm claims every directory with a manifest; the other tools only claim
/// directories holding one of their own lock files next to a manifest.
fn discover_blocking(tool: NodeTool, root: &Path) -> Vec<ProjectInfo> {
    let mut dirs = if tool == NodeTool::Npm {
        fs::find_dirs_containing(root, MANIFEST_FILE)
    } else {
        let mut found: Vec<PathBuf> = manifest::lock_files_for(tool.name())
            .flat_map(|lock| fs::find_dirs_containing(root, lock))
            .filter(|dir| manifest::has_manifest(dir))
            .collect();
        found.sort();
        found
    };
    dirs.dedup();

    dirs.into_iter()
        .map(|dir| {
            ProjectInfo::new(project_name(&dir), &dir, tool.name())
                .with_lock_file(manifest::find_lock_file(&dir, tool.name()))
        })
        .collect()
}

/// The manifest's `name`, or the directory name when it has none.
fn project_name(dir: &Path) -> String {
    std::fs::read_to_string(manifest::manifest_path(dir))
        .ok()
        .and_then(|content| PackageManifest::parse(&content).ok())
        .map(|manifest| manifest.name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            dir.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
}
