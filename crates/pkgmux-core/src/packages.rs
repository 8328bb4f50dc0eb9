use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use pkgmux_backend::{BackendError, Context, PackageInfo};

use crate::fanout::{absorb, fan_out, on_one};
use crate::registry::BackendRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageStats {
    pub total_packages: usize,
    pub local_packages: usize,
    pub global_packages: usize,
    pub by_manager: BTreeMap<String, usize>,
}

impl PackageStats {
    #[must_use]
    pub fn from_packages(packages: &[PackageInfo]) -> Self {
        packages.iter().fold(Self::default(), |mut stats, package| {
            stats.total_packages += 1;
            if package.is_global {
                stats.global_packages += 1;
            } else {
                stats.local_packages += 1;
            }
            *stats.by_manager.entry(package.manager.clone()).or_default() += 1;
            stats
        })
    }
}

/// Drop repeated (name, version, manager) entries keeping the first, then
/// order by name with manager and version breaking ties.
#[must_use]
pub fn dedup_and_sort(packages: Vec<PackageInfo>) -> Vec<PackageInfo> {
    let first_seen: Vec<bool> = {
        let mut seen = HashSet::new();
        packages.iter().map(|package| seen.insert(package.dedup_key())).collect()
    };
    let mut unique: Vec<PackageInfo> = packages
        .into_iter()
        .zip(first_seen)
        .filter_map(|(package, first)| first.then_some(package))
        .collect();

    unique.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.manager.cmp(&b.manager))
            .then_with(|| a.version.cmp(&b.version))
    });
    unique
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), BackendError> {
    if value.trim().is_empty() {
        Err(BackendError::validation(field, value, "must not be empty"))
    } else {
        Ok(())
    }
}

pub struct PackageService {
    registry: Arc<BackendRegistry>,
}

impl PackageService {
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    /// Packages of the project at `project_path` as seen by every available
    /// manager. Managers without the project contribute nothing.
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] for an empty path, or
    /// [`BackendError::Cancelled`]/[`BackendError::Timeout`] when `ctx` has ended.
    pub async fn all_packages(
        &self,
        ctx: &Context,
        project_path: &Path,
    ) -> Result<Vec<PackageInfo>, BackendError> {
        if project_path.as_os_str().is_empty() {
            return Err(BackendError::validation(
                "project_path",
                "",
                "must not be empty",
            ));
        }
        ctx.check()?;

        let backends = self.registry.available(ctx).await;
        let outcomes = fan_out(ctx, backends, |backend| async move {
            backend.installed_packages(ctx, project_path).await
        })
        .await;

        let packages = absorb(
            "list installed packages",
            outcomes,
            BackendError::is_project_not_found,
        )
        .into_iter()
        .flat_map(|(_, packages)| packages)
        .collect();
        Ok(dedup_and_sort(packages))
    }

    /// # Errors
    /// Returns [`BackendError::Cancelled`]/[`BackendError::Timeout`] when `ctx` has ended.
    pub async fn global_packages(&self, ctx: &Context) -> Result<Vec<PackageInfo>, BackendError> {
        ctx.check()?;
        let backends = self.registry.available(ctx).await;
        let outcomes = fan_out(ctx, backends, |backend| async move {
            backend.global_packages(ctx).await
        })
        .await;

        let packages = absorb("list global packages", outcomes, |_| false)
            .into_iter()
            .flat_map(|(_, packages)| packages)
            .collect();
        Ok(dedup_and_sort(packages))
    }

    /// # Errors
    /// Returns [`BackendError::ManagerNotFound`], [`BackendError::ManagerNotAvailable`],
    /// or the backend's failure wrapped as [`BackendError::Operation`].
    pub async fn packages_by_manager(
        &self,
        ctx: &Context,
        name: &str,
        project_path: &Path,
    ) -> Result<Vec<PackageInfo>, BackendError> {
        let packages = on_one(
            &self.registry,
            ctx,
            name,
            "list installed packages",
            |backend| async move { backend.installed_packages(ctx, project_path).await },
        )
        .await?;
        Ok(dedup_and_sort(packages))
    }

    /// # Errors
    /// Same as [`PackageService::packages_by_manager`].
    pub async fn global_packages_by_manager(
        &self,
        ctx: &Context,
        name: &str,
    ) -> Result<Vec<PackageInfo>, BackendError> {
        let packages = on_one(
            &self.registry,
            ctx,
            name,
            "list global packages",
            |backend| async move { backend.global_packages(ctx).await },
        )
        .await?;
        Ok(dedup_and_sort(packages))
    }

    /// Global packages whose name or description contains `query`, ignoring case.
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] for an empty query.
    pub async fn search(
        &self,
        ctx: &Context,
        query: &str,
    ) -> Result<Vec<PackageInfo>, BackendError> {
        require_non_empty("query", query)?;
        let needle = query.to_lowercase();

        let mut packages = self.global_packages(ctx).await?;
        packages.retain(|package| package.matches_lowercase(&needle));
        Ok(packages)
    }

    /// First global package named exactly `name`.
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] for an empty name and
    /// [`BackendError::PackageNotFound`] when no manager has it.
    pub async fn package_info(
        &self,
        ctx: &Context,
        name: &str,
    ) -> Result<PackageInfo, BackendError> {
        require_non_empty("name", name)?;

        self.global_packages(ctx)
            .await?
            .into_iter()
            .find(|package| package.name == name)
            .ok_or_else(|| BackendError::PackageNotFound {
                name: name.to_string(),
            })
    }

    /// # Errors
    /// Same as [`PackageService::all_packages`].
    pub async fn stats(
        &self,
        ctx: &Context,
        project_path: &Path,
    ) -> Result<PackageStats, BackendError> {
        Ok(PackageStats::from_packages(
            &self.all_packages(ctx, project_path).await?,
        ))
    }

    /// # Errors
    /// Same as [`PackageService::global_packages`].
    pub async fn global_stats(&self, ctx: &Context) -> Result<PackageStats, BackendError> {
        Ok(PackageStats::from_packages(&self.global_packages(ctx).await?))
    }

    /// # Errors
    /// Returns [`BackendError::Validation`] for an empty package or manager
    /// name, the registry's lookup errors, or the backend's failure wrapped as
    /// [`BackendError::Operation`].
    pub async fn install(
        &self,
        ctx: &Context,
        package: &str,
        manager: &str,
        global: bool,
    ) -> Result<(), BackendError> {
        require_non_empty("package", package)?;
        require_non_empty("manager", manager)?;

        on_one(&self.registry, ctx, manager, "install package", |backend| async move {
            backend.install_package(ctx, package, global).await
        })
        .await?;
        info!("Installed {package} with {manager}");
        Ok(())
    }

    /// # Errors
    /// Same as [`PackageService::install`].
    pub async fn uninstall(
        &self,
        ctx: &Context,
        package: &str,
        manager: &str,
        global: bool,
    ) -> Result<(), BackendError> {
        require_non_empty("package", package)?;
        require_non_empty("manager", manager)?;

        on_one(&self.registry, ctx, manager, "uninstall package", |backend| async move {
            backend.uninstall_package(ctx, package, global).await
        })
        .await?;
        info!("Uninstalled {package} with {manager}");
        Ok(())
    }
}
