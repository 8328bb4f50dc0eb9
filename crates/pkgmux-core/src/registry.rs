use futures_util::future::join_all;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use pkgmux_backend::{BackendError, Context, ManagerStatus, PackageBackend};

pub type SharedBackend = Arc<dyn PackageBackend>;

/// Upper bound for a single availability probe, on top of the caller's context.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Named set of backends shared by every service.
pub struct BackendRegistry {
    backends: RwLock<HashMap<String, SharedBackend>>,
    probe_timeout: Duration,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::with_probe_timeout(DEFAULT_PROBE_TIMEOUT)
    }

    #[must_use]
    pub fn with_probe_timeout(probe_timeout: Duration) -> Self {
        Self {
            backends: RwLock::new(HashMap::new()),
            probe_timeout,
        }
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Register `backend` under its own name.
    ///
    /// # Errors
    /// Returns [`BackendError::AlreadyRegistered`] when the name is taken.
    pub fn register(&self, backend: SharedBackend) -> Result<(), BackendError> {
        let name = backend.name().to_string();
        self.register_as(name, backend)
    }

    /// Register `backend` under `name`.
    ///
    /// # Errors
    /// Returns [`BackendError::AlreadyRegistered`] when the name is taken.
    pub fn register_as(
        &self,
        name: impl Into<String>,
        backend: SharedBackend,
    ) -> Result<(), BackendError> {
        let name = name.into();
        let mut backends = self.backends.write().unwrap_or_else(PoisonError::into_inner);
        if backends.contains_key(&name) {
            return Err(BackendError::AlreadyRegistered { name });
        }
        info!("Registered package manager {name}");
        backends.insert(name, backend);
        Ok(())
    }

    /// # Errors
    /// Returns [`BackendError::ManagerNotFound`] when nothing is registered under `name`.
    pub fn unregister(&self, name: &str) -> Result<(), BackendError> {
        let mut backends = self.backends.write().unwrap_or_else(PoisonError::into_inner);
        match backends.remove(name) {
            Some(_) => {
                info!("Unregistered package manager {name}");
                Ok(())
            }
            None => Err(BackendError::ManagerNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// # Errors
    /// Returns [`BackendError::ManagerNotFound`] when nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<SharedBackend, BackendError> {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::ManagerNotFound {
                name: name.to_string(),
            })
    }

    /// Snapshot of every registered backend, ordered by name.
    #[must_use]
    pub fn all(&self) -> BTreeMap<String, SharedBackend> {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, backend)| (name.clone(), Arc::clone(backend)))
            .collect()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.all().into_keys().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn probe(&self, ctx: &Context, name: &str, backend: &SharedBackend) -> bool {
        let probe_ctx = ctx.child_with_timeout(self.probe_timeout);
        let available = probe_ctx
            .run(async { Ok::<_, BackendError>(backend.is_available(&probe_ctx).await) })
            .await
            .unwrap_or(false);
        debug!("Probe {name}: available={available}");
        available
    }

    async fn probe_all(&self, ctx: &Context) -> Vec<(String, SharedBackend, bool)> {
        let snapshot = self.all();
        let probes = snapshot.into_iter().map(|(name, backend)| async move {
            let available = self.probe(ctx, &name, &backend).await;
            (name, backend, available)
        });
        join_all(probes).await
    }

    /// Backends whose probe succeeds, probed concurrently. A cancelled or
    /// expired context makes every backend count as unavailable.
    pub async fn available(&self, ctx: &Context) -> BTreeMap<String, SharedBackend> {
        self.probe_all(ctx)
            .await
            .into_iter()
            .filter(|(_, _, available)| *available)
            .map(|(name, backend, _)| (name, backend))
            .collect()
    }

    pub async fn available_names(&self, ctx: &Context) -> Vec<String> {
        self.available(ctx).await.into_keys().collect()
    }

    /// `false` for unknown names as well as for backends failing their probe.
    pub async fn is_available(&self, ctx: &Context, name: &str) -> bool {
        match self.get(name) {
            Ok(backend) => self.probe(ctx, name, &backend).await,
            Err(_) => false,
        }
    }

    pub async fn statuses(&self, ctx: &Context) -> Vec<ManagerStatus> {
        self.probe_all(ctx)
            .await
            .into_iter()
            .map(|(name, _, available)| ManagerStatus { name, available })
            .collect()
    }

    /// The backend registered as `name`, provided its probe succeeds.
    ///
    /// # Errors
    /// Returns [`BackendError::ManagerNotFound`] for unknown names and
    /// [`BackendError::ManagerNotAvailable`] when the probe fails.
    pub async fn require_available(
        &self,
        ctx: &Context,
        name: &str,
    ) -> Result<SharedBackend, BackendError> {
        let backend = self.get(name)?;
        if self.probe(ctx, name, &backend).await {
            Ok(backend)
        } else {
            Err(BackendError::ManagerNotAvailable {
                name: name.to_string(),
            })
        }
    }
}
