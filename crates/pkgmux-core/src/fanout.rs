use futures_util::future::join_all;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::future::Future;

use pkgmux_backend::{BackendError, Context, ManagerFailure};

use crate::registry::{BackendRegistry, SharedBackend};

/// Outcome of one backend's share of a fan-out, tagged with its name.
pub type Outcome<T> = (String, Result<T, BackendError>);

/// Run `op` against every backend concurrently, each bounded by `ctx`.
/// Outcomes come back in the order of `backends` (sorted by name).
pub async fn fan_out<T, F, Fut>(
    ctx: &Context,
    backends: BTreeMap<String, SharedBackend>,
    op: F,
) -> Vec<Outcome<T>>
where
    F: Fn(SharedBackend) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let calls = backends.into_iter().map(|(name, backend)| {
        let call = op(backend);
        async move { (name, ctx.run(call).await) }
    });
    join_all(calls).await
}

/// Run `op` against the single backend registered as `name`.
///
/// # Errors
/// Returns [`BackendError::ManagerNotFound`] or
/// [`BackendError::ManagerNotAvailable`] before touching the backend, and
/// wraps the backend's own failure as [`BackendError::Operation`].
pub async fn on_one<T, F, Fut>(
    registry: &BackendRegistry,
    ctx: &Context,
    name: &str,
    operation: &'static str,
    op: F,
) -> Result<T, BackendError>
where
    F: FnOnce(SharedBackend) -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    let backend = registry.require_available(ctx, name).await?;
    ctx.run(op(backend)).await.map_err(|e| {
        warn!("{name} failed to {operation}: {e}");
        BackendError::operation(name, operation, e)
    })
}

/// Keep the successful outcomes, logging each failure. Failures for which
/// `quiet` returns true are logged at debug level only.
pub fn absorb<T>(
    operation: &str,
    outcomes: Vec<Outcome<T>>,
    quiet: impl Fn(&BackendError) -> bool,
) -> Vec<(String, T)> {
    outcomes
        .into_iter()
        .filter_map(|(name, result)| match result {
            Ok(value) => Some((name, value)),
            Err(e) if quiet(&e) => {
                debug!("{name} skipped {operation}: {e}");
                None
            }
            Err(e) => {
                warn!("{name} failed to {operation}: {e}");
                None
            }
        })
        .collect()
}

/// `Ok` when every backend succeeded, otherwise one [`BackendError::Combined`]
/// naming each failure. Nothing is rolled back.
///
/// # Errors
/// Returns [`BackendError::Combined`] when at least one outcome failed.
pub fn combine(operation: &'static str, outcomes: Vec<Outcome<()>>) -> Result<(), BackendError> {
    let failures: Vec<ManagerFailure> = outcomes
        .into_iter()
        .filter_map(|(manager, result)| {
            result.err().map(|error| {
                warn!("{manager} failed to {operation}: {error}");
                ManagerFailure { manager, error }
            })
        })
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        Err(BackendError::Combined {
            operation,
            failures,
        })
    }
}
