use log::info;
use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use pkgmux_backend::{BackendError, Context, ManagerConfig};

use crate::fanout::{absorb, combine, fan_out, on_one};
use crate::registry::BackendRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigManagerSummary {
    pub registry: String,
    pub proxy: String,
    pub settings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub manager_count: usize,
    pub managers: BTreeMap<String, ConfigManagerSummary>,
    /// Registry URL → managers using it.
    pub registries: BTreeMap<String, Vec<String>>,
    /// Proxy URL → managers using it.
    pub proxies: BTreeMap<String, Vec<String>>,
}

impl ConfigSummary {
    #[must_use]
    pub fn from_configs(configs: &[ManagerConfig]) -> Self {
        let mut summary = Self {
            manager_count: configs.len(),
            ..Self::default()
        };

        for config in configs {
            summary.managers.insert(
                config.manager.clone(),
                ConfigManagerSummary {
                    registry: config.registry.clone(),
                    proxy: config.proxy.clone(),
                    settings: config.settings.len(),
                },
            );
            if !config.registry.is_empty() {
                summary
                    .registries
                    .entry(config.registry.clone())
                    .or_default()
                    .push(config.manager.clone());
            }
            if config.has_proxy() {
                summary
                    .proxies
                    .entry(config.proxy.clone())
                    .or_default()
                    .push(config.manager.clone());
            }
        }

        summary
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), BackendError> {
    let url = Url::parse(value).map_err(|_| BackendError::validation(field, value, "invalid URL"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(BackendError::validation(
            field,
            value,
            "URL scheme must be http or https",
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(BackendError::validation(field, value, "URL must have a host"));
    }
    Ok(())
}

/// # Errors
/// Returns [`BackendError::Validation`] unless `url` is a non-empty http(s)
/// URL with a host.
pub fn validate_registry_url(url: &str) -> Result<(), BackendError> {
    if url.is_empty() {
        return Err(BackendError::validation(
            "registry",
            url,
            "registry URL must not be empty",
        ));
    }
    validate_url("registry", url)
}

/// An empty `url` is valid and means no proxy.
///
/// # Errors
/// Returns [`BackendError::Validation`] for a non-empty URL that is not
/// http(s) with a host.
pub fn validate_proxy_url(url: &str) -> Result<(), BackendError> {
    if url.is_empty() {
        return Ok(());
    }
    validate_url("proxy", url)
}

pub struct ConfigService {
    registry: Arc<BackendRegistry>,
}

impl ConfigService {
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    /// # Errors
    /// Returns [`BackendError::Cancelled`]/[`BackendError::Timeout`] when `ctx` has ended.
    pub async fn all_configs(&self, ctx: &Context) -> Result<Vec<ManagerConfig>, BackendError> {
        ctx.check()?;
        let backends = self.registry.available(ctx).await;
        let outcomes = fan_out(ctx, backends, |backend| async move {
            backend.config(ctx).await
        })
        .await;

        let mut configs: Vec<ManagerConfig> = absorb("read config", outcomes, |_| false)
            .into_iter()
            .map(|(_, config)| config)
            .collect();
        configs.sort_by(|a, b| a.manager.cmp(&b.manager));
        Ok(configs)
    }

    /// # Errors
    /// Returns [`BackendError::ManagerNotFound`], [`BackendError::ManagerNotAvailable`],
    /// or the backend's failure wrapped as [`BackendError::Operation`].
    pub async fn config(&self, ctx: &Context, name: &str) -> Result<ManagerConfig, BackendError> {
        on_one(&self.registry, ctx, name, "read config", |backend| async move {
            backend.config(ctx).await
        })
        .await
    }

    /// Point every available manager at `url`. Nothing is touched when the
    /// URL is invalid; otherwise all managers are attempted.
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] or [`BackendError::Combined`].
    pub async fn set_registry_for_all(&self, ctx: &Context, url: &str) -> Result<(), BackendError> {
        validate_registry_url(url)?;
        ctx.check()?;

        let backends = self.registry.available(ctx).await;
        let outcomes = fan_out(ctx, backends, |backend| async move {
            backend.set_registry(ctx, url).await
        })
        .await;

        combine("set registry", outcomes)?;
        info!("Registry set to {url} for all managers");
        Ok(())
    }

    /// Same policy as [`ConfigService::set_registry_for_all`]; an empty `url`
    /// removes the proxy.
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] or [`BackendError::Combined`].
    pub async fn set_proxy_for_all(&self, ctx: &Context, url: &str) -> Result<(), BackendError> {
        validate_proxy_url(url)?;
        ctx.check()?;

        let backends = self.registry.available(ctx).await;
        let outcomes = fan_out(ctx, backends, |backend| async move {
            backend.set_proxy(ctx, url).await
        })
        .await;

        combine("set proxy", outcomes)?;
        info!("Proxy set to '{url}' for all managers");
        Ok(())
    }

    /// # Errors
    /// Returns [`BackendError::Validation`] before any lookup, then the same
    /// errors as [`ConfigService::config`].
    pub async fn set_registry(
        &self,
        ctx: &Context,
        name: &str,
        url: &str,
    ) -> Result<(), BackendError> {
        validate_registry_url(url)?;
        on_one(&self.registry, ctx, name, "set registry", |backend| async move {
            backend.set_registry(ctx, url).await
        })
        .await
    }

    /// # Errors
    /// Same as [`ConfigService::set_registry`].
    pub async fn set_proxy(
        &self,
        ctx: &Context,
        name: &str,
        url: &str,
    ) -> Result<(), BackendError> {
        validate_proxy_url(url)?;
        on_one(&self.registry, ctx, name, "set proxy", |backend| async move {
            backend.set_proxy(ctx, url).await
        })
        .await
    }

    /// Check that `url` could be used as `name`'s registry. Only the URL shape
    /// and the manager name are checked; nothing is contacted.
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] or [`BackendError::ManagerNotFound`].
    pub fn test_registry(&self, name: &str, url: &str) -> Result<(), BackendError> {
        validate_registry_url(url)?;
        self.registry.get(name).map(|_| ())
    }

    /// Proxy counterpart of [`ConfigService::test_registry`].
    ///
    /// # Errors
    /// Returns [`BackendError::Validation`] or [`BackendError::ManagerNotFound`].
    pub fn test_proxy(&self, name: &str, url: &str) -> Result<(), BackendError> {
        validate_proxy_url(url)?;
        self.registry.get(name).map(|_| ())
    }

    /// # Errors
    /// Same as [`ConfigService::all_configs`].
    pub async fn summary(&self, ctx: &Context) -> Result<ConfigSummary, BackendError> {
        Ok(ConfigSummary::from_configs(&self.all_configs(ctx).await?))
    }
}
