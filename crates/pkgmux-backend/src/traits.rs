use async_trait::async_trait;
use std::path::Path;

use crate::context::Context;
use crate::error::BackendError;
use crate::types::{CacheInfo, ManagerConfig, PackageInfo, ProjectInfo};

/// Capability set every package-manager adapter provides.
///
/// Implementations are shared behind `Arc<dyn PackageBackend>` and called
/// concurrently, so they keep any per-call state local to the call.
#[async_trait]
pub trait PackageBackend: Send + Sync {
    /// Stable lowercase identifier, e.g. `"npm"`.
    fn name(&self) -> &'static str;

    /// Cheap liveness probe. Never fails; any error means `false`.
    async fn is_available(&self, ctx: &Context) -> bool;

    async fn cache_info(&self, ctx: &Context) -> Result<CacheInfo, BackendError>;

    async fn clear_cache(&self, ctx: &Context) -> Result<(), BackendError>;

    /// Packages declared by the project at `project_path`.
    ///
    /// Fails with [`BackendError::ProjectNotFound`] when there is no manifest there.
    async fn installed_packages(
        &self,
        ctx: &Context,
        project_path: &Path,
    ) -> Result<Vec<PackageInfo>, BackendError>;

    async fn global_packages(&self, ctx: &Context) -> Result<Vec<PackageInfo>, BackendError>;

    async fn config(&self, ctx: &Context) -> Result<ManagerConfig, BackendError>;

    async fn set_registry(&self, ctx: &Context, url: &str) -> Result<(), BackendError>;

    /// Set the proxy; an empty `url` removes it.
    async fn set_proxy(&self, ctx: &Context, url: &str) -> Result<(), BackendError>;

    async fn discover_projects(
        &self,
        ctx: &Context,
        root: &Path,
    ) -> Result<Vec<ProjectInfo>, BackendError>;

    async fn install_package(
        &self,
        _ctx: &Context,
        _name: &str,
        _global: bool,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported {
            operation: "install package",
        })
    }

    async fn uninstall_package(
        &self,
        _ctx: &Context,
        _name: &str,
        _global: bool,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported {
            operation: "uninstall package",
        })
    }
}
