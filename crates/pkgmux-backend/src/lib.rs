mod context;
mod error;
pub mod manifest;
mod traits;
mod types;

pub use context::Context;
pub use error::{BackendError, ManagerFailure};
pub use manifest::PackageManifest;
pub use traits::PackageBackend;
pub use types::{
    CacheInfo, DependencyNode, ManagerConfig, ManagerStatus, PackageInfo, ProjectAnalysis,
    ProjectInfo, Vulnerability,
};
