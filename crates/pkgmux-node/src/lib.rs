mod backend;
mod detection;
mod listing;
mod tool;

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use pkgmux_core::BackendRegistry;

pub use backend::NodeBackend;
pub use detection::{locate, parse_version};
pub use listing::{config_value, manifest_packages, parse_list, split_name_version};
pub use tool::{ClearStrategy, DEFAULT_REGISTRY, ListFormat, NodeTool};

/// Registry holding an adapter for every known tool except those named in
/// `disabled`. Tools that are not installed are still registered; the
/// availability probe, bounded by `probe_timeout`, filters them per call.
#[must_use]
pub fn default_registry(disabled: &[String], probe_timeout: Duration) -> BackendRegistry {
    let registry = BackendRegistry::with_probe_timeout(probe_timeout);

    for tool in NodeTool::ALL {
        if disabled.iter().any(|name| name == tool.name()) {
            debug!("Skipping disabled manager {}", tool.name());
            continue;
        }
        if let Err(e) = registry.register(Arc::new(NodeBackend::new(tool))) {
            warn!("Could not register {}: {e}", tool.name());
        }
    }

    registry
}
