#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use pkgmux_backend::{
    BackendError, CacheInfo, Context, ManagerConfig, PackageBackend, PackageInfo, ProjectInfo,
};

/// Scripted backend recording every call it receives.
pub struct FakeBackend {
    name: &'static str,
    available: bool,
    hanging_probe: bool,
    hanging: bool,
    cache: Result<CacheInfo, BackendError>,
    installed: Option<Result<Vec<PackageInfo>, BackendError>>,
    globals: Result<Vec<PackageInfo>, BackendError>,
    config: Option<Result<ManagerConfig, BackendError>>,
    projects: Result<Vec<ProjectInfo>, BackendError>,
    write_error: Option<BackendError>,
    calls: Mutex<Vec<String>>,
    availability_checks: AtomicUsize,
}

pub fn command_failed(program: &str) -> BackendError {
    BackendError::CommandFailed {
        program: program.to_string(),
        code: Some(1),
        stderr: format!("{program} exploded"),
    }
}

pub fn package(name: &str, version: &str, manager: &str) -> PackageInfo {
    PackageInfo::new(name, version, manager)
}

pub fn cache(manager: &str, size: u64, file_count: u64) -> CacheInfo {
    CacheInfo {
        size,
        file_count,
        ..CacheInfo::empty(manager, format!("/cache/{manager}").into())
    }
}

impl FakeBackend {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            available: true,
            hanging_probe: false,
            hanging: false,
            cache: Ok(CacheInfo::empty(name, format!("/cache/{name}").into())),
            installed: None,
            globals: Ok(Vec::new()),
            config: None,
            projects: Ok(Vec::new()),
            write_error: None,
            calls: Mutex::new(Vec::new()),
            availability_checks: AtomicUsize::new(0),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// The availability probe never completes.
    #[must_use]
    pub fn hanging_probe(mut self) -> Self {
        self.hanging_probe = true;
        self
    }

    /// Every operation other than the probe never completes.
    #[must_use]
    pub fn hanging(mut self) -> Self {
        self.hanging = true;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Result<CacheInfo, BackendError>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_installed(mut self, installed: Result<Vec<PackageInfo>, BackendError>) -> Self {
        self.installed = Some(installed);
        self
    }

    #[must_use]
    pub fn with_globals(mut self, globals: Result<Vec<PackageInfo>, BackendError>) -> Self {
        self.globals = globals;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: Result<ManagerConfig, BackendError>) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_projects(mut self, projects: Result<Vec<ProjectInfo>, BackendError>) -> Self {
        self.projects = projects;
        self
    }

    /// Writes (clear, set registry/proxy, install) fail with `error`.
    #[must_use]
    pub fn failing_writes(mut self, error: BackendError) -> Self {
        self.write_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of `is_available` calls received so far.
    pub fn availability_checks(&self) -> usize {
        self.availability_checks.load(Ordering::SeqCst)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call.into());
    }

    async fn stall(&self) {
        if self.hanging {
            std::future::pending::<()>().await;
        }
    }

    fn write_result(&self) -> Result<(), BackendError> {
        match &self.write_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PackageBackend for FakeBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_available(&self, _ctx: &Context) -> bool {
        self.availability_checks.fetch_add(1, Ordering::SeqCst);
        if self.hanging_probe {
            std::future::pending::<()>().await;
        }
        self.available
    }

    async fn cache_info(&self, _ctx: &Context) -> Result<CacheInfo, BackendError> {
        self.record("cache_info");
        self.stall().await;
        self.cache.clone()
    }

    async fn clear_cache(&self, _ctx: &Context) -> Result<(), BackendError> {
        self.record("clear_cache");
        self.stall().await;
        self.write_result()
    }

    async fn installed_packages(
        &self,
        _ctx: &Context,
        project_path: &Path,
    ) -> Result<Vec<PackageInfo>, BackendError> {
        self.record(format!("installed_packages {}", project_path.display()));
        self.stall().await;
        match &self.installed {
            Some(result) => result.clone(),
            None => Err(BackendError::ProjectNotFound {
                path: project_path.to_path_buf(),
            }),
        }
    }

    async fn global_packages(&self, _ctx: &Context) -> Result<Vec<PackageInfo>, BackendError> {
        self.record("global_packages");
        self.stall().await;
        self.globals.clone()
    }

    async fn config(&self, _ctx: &Context) -> Result<ManagerConfig, BackendError> {
        self.record("config");
        self.stall().await;
        match &self.config {
            Some(result) => result.clone(),
            None => Ok(ManagerConfig::new(self.name)),
        }
    }

    async fn set_registry(&self, _ctx: &Context, url: &str) -> Result<(), BackendError> {
        self.record(format!("set_registry {url}"));
        self.stall().await;
        self.write_result()
    }

    async fn set_proxy(&self, _ctx: &Context, url: &str) -> Result<(), BackendError> {
        self.record(format!("set_proxy {url}"));
        self.stall().await;
        self.write_result()
    }

    async fn discover_projects(
        &self,
        _ctx: &Context,
        root: &Path,
    ) -> Result<Vec<ProjectInfo>, BackendError> {
        self.record(format!("discover_projects {}", root.display()));
        self.stall().await;
        self.projects.clone()
    }

    async fn install_package(
        &self,
        _ctx: &Context,
        name: &str,
        global: bool,
    ) -> Result<(), BackendError> {
        self.record(format!("install_package {name} global={global}"));
        self.stall().await;
        self.write_result()
    }
}
