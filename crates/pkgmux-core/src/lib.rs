//! Aggregation over every registered package manager.
//!
//! A [`BackendRegistry`] holds the backends; each service fans one logical
//! operation out to the available ones concurrently and merges the answers:
//! - [`CacheService`]: cache locations, sizes, and clearing.
//! - [`PackageService`]: project and global packages, search, install.
//! - [`ConfigService`]: registry and proxy settings.
//! - [`ProjectService`]: project discovery, analysis, dependency trees.
//!
//! Reads skip backends that fail and log them. Writes aimed at every backend
//! try all of them and report the failures together.

use std::sync::Arc;

mod cache;
mod configuration;
pub mod fanout;
mod packages;
mod projects;
mod registry;

#[cfg(test)]
#[path = "../tests/common/mod.rs"]
mod testing;

pub use cache::{CacheService, CacheStats, CacheSummary};
pub use configuration::{
    ConfigManagerSummary, ConfigService, ConfigSummary, validate_proxy_url, validate_registry_url,
};
pub use packages::{PackageService, PackageStats, dedup_and_sort};
pub use projects::{ProjectService, ProjectStats, dependency_tree, merge_projects};
pub use registry::{BackendRegistry, DEFAULT_PROBE_TIMEOUT, SharedBackend};

/// The four services sharing one registry.
pub struct Services {
    pub registry: Arc<BackendRegistry>,
    pub cache: CacheService,
    pub packages: PackageService,
    pub config: ConfigService,
    pub projects: ProjectService,
}

impl Services {
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            cache: CacheService::new(Arc::clone(&registry)),
            packages: PackageService::new(Arc::clone(&registry)),
            config: ConfigService::new(Arc::clone(&registry)),
            projects: ProjectService::new(Arc::clone(&registry)),
            registry,
        }
    }
}
