use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use pkgmux_backend::{BackendError, CacheInfo, Context};

use crate::fanout::{absorb, combine, fan_out, on_one};
use crate::registry::{BackendRegistry, SharedBackend};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheSummary {
    pub total_size: u64,
    pub total_files: u64,
    pub manager_count: usize,
    pub largest_cache_manager: Option<String>,
    pub largest_cache_size: u64,
    pub available_managers: Vec<String>,
}

/// Per-manager breakdown of every readable cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_size: u64,
    pub total_files: u64,
    pub by_manager: BTreeMap<String, CacheInfo>,
    pub largest: Option<CacheInfo>,
    pub available_managers: Vec<String>,
}

impl CacheStats {
    /// Fold `caches` (already sorted by manager) into totals. The first of
    /// several equally large caches is reported as the largest.
    #[must_use]
    pub fn from_caches(caches: Vec<CacheInfo>, available_managers: Vec<String>) -> Self {
        let mut largest: Option<&CacheInfo> = None;
        for cache in &caches {
            if largest.is_none_or(|current| cache.size > current.size) {
                largest = Some(cache);
            }
        }
        let largest = largest.cloned();

        Self {
            total_size: caches.iter().map(|c| c.size).sum(),
            total_files: caches.iter().map(|c| c.file_count).sum(),
            largest,
            by_manager: caches
                .into_iter()
                .map(|cache| (cache.manager.clone(), cache))
                .collect(),
            available_managers,
        }
    }

    #[must_use]
    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            total_size: self.total_size,
            total_files: self.total_files,
            manager_count: self.by_manager.len(),
            largest_cache_manager: self.largest.as_ref().map(|c| c.manager.clone()),
            largest_cache_size: self.largest.as_ref().map_or(0, |c| c.size),
            available_managers: self.available_managers.clone(),
        }
    }
}

pub struct CacheService {
    registry: Arc<BackendRegistry>,
}

impl CacheService {
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    /// Cache of every available manager, sorted by manager. Backends that
    /// fail are logged and left out; this never fails because of them.
    ///
    /// # Errors
    /// Returns [`BackendError::Cancelled`] or [`BackendError::Timeout`] when
    /// `ctx` has already ended.
    pub async fn all_cache_info(&self, ctx: &Context) -> Result<Vec<CacheInfo>, BackendError> {
        ctx.check()?;
        let backends = self.registry.available(ctx).await;
        Ok(Self::collect_caches(ctx, backends).await)
    }

    async fn collect_caches(
        ctx: &Context,
        backends: BTreeMap<String, SharedBackend>,
    ) -> Vec<CacheInfo> {
        let outcomes = fan_out(ctx, backends, |backend| async move {
            backend.cache_info(ctx).await
        })
        .await;

        let mut caches: Vec<CacheInfo> = absorb("get cache info", outcomes, |_| false)
            .into_iter()
            .map(|(_, cache)| cache)
            .collect();
        caches.sort_by(|a, b| a.manager.cmp(&b.manager));
        caches
    }

    /// # Errors
    /// Returns [`BackendError::ManagerNotFound`], [`BackendError::ManagerNotAvailable`],
    /// or the backend's failure wrapped as [`BackendError::Operation`].
    pub async fn cache_info(&self, ctx: &Context, name: &str) -> Result<CacheInfo, BackendError> {
        on_one(&self.registry, ctx, name, "get cache info", |backend| async move {
            backend.cache_info(ctx).await
        })
        .await
    }

    /// Clear every available cache. All backends are attempted and none is
    /// restored when another fails.
    ///
    /// # Errors
    /// Returns [`BackendError::Combined`] naming each backend that failed.
    pub async fn clear_all(&self, ctx: &Context) -> Result<(), BackendError> {
        ctx.check()?;
        let backends = self.registry.available(ctx).await;
        let attempted = backends.len();
        let outcomes = fan_out(ctx, backends, |backend| async move {
            backend.clear_cache(ctx).await
        })
        .await;

        combine("clear cache", outcomes)?;
        info!("Cleared {attempted} caches");
        Ok(())
    }

    /// # Errors
    /// Same as [`CacheService::cache_info`].
    pub async fn clear(&self, ctx: &Context, name: &str) -> Result<(), BackendError> {
        on_one(&self.registry, ctx, name, "clear cache", |backend| async move {
            backend.clear_cache(ctx).await
        })
        .await?;
        info!("Cleared {name} cache");
        Ok(())
    }

    /// # Errors
    /// Same as [`CacheService::all_cache_info`].
    pub async fn total_size(&self, ctx: &Context) -> Result<u64, BackendError> {
        Ok(self.all_cache_info(ctx).await?.iter().map(|c| c.size).sum())
    }

    /// Caches and the list of available managers come from a single probe
    /// round, so they always agree.
    ///
    /// # Errors
    /// Same as [`CacheService::all_cache_info`].
    pub async fn stats(&self, ctx: &Context) -> Result<CacheStats, BackendError> {
        ctx.check()?;
        let backends = self.registry.available(ctx).await;
        let available = backends.keys().cloned().collect();
        let caches = Self::collect_caches(ctx, backends).await;
        Ok(CacheStats::from_caches(caches, available))
    }

    /// # Errors
    /// Same as [`CacheService::all_cache_info`].
    pub async fn summary(&self, ctx: &Context) -> Result<CacheSummary, BackendError> {
        Ok(self.stats(ctx).await?.summary())
    }
}
