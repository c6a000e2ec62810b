//! # Modgate
//!
//! A module lifecycle coordinator for hosts that load independently written
//! extension modules.
//!
//! Modgate walks every module through a fixed sequence of phases in step with
//! the host's own startup, and makes sure only the loader can move a module
//! forward.
//!
//! ## Features
//!
//! - **Fixed phase sequences**: `CONSTRUCTION → PRE_INIT → INIT → POST_INIT`, one step at a time
//! - **Capability-gated transitions**: each module gets exactly one [`LifecycleGate`], handed to the loader only
//! - **Observable state**: every module's phase is a watch channel anyone can subscribe to
//! - **Lifecycle hooks**: modules react to their own transitions through [`Module::lifecycle_changed`]
//! - **Lockstep startup**: [`Bootstrap`](lifecycle::Bootstrap) drives the host and all modules together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modgate::prelude::*;
//!
//! // 1. Define your module
//! pub struct Metrics {
//!     base: ModuleBase,
//! }
//!
//! #[async_trait]
//! impl Module for Metrics {
//!     fn base(&self) -> &ModuleBase {
//!         &self.base
//!     }
//!
//!     async fn lifecycle_changed(&self, new_phase: ModulePhase) {
//!         tracing::info!("metrics entered {}", new_phase);
//!     }
//! }
//!
//! // 2. Define your loader
//! pub struct CoreLoader {
//!     metadata: LoaderMetadata,
//! }
//!
//! impl ModuleLoader for CoreLoader {
//!     fn metadata(&self) -> &LoaderMetadata {
//!         &self.metadata
//!     }
//!
//!     fn build_modules(
//!         &self,
//!         _host: &Arc<dyn Host>,
//!         secrets: &LoadingSecrets,
//!     ) -> LifecycleResult<Vec<Arc<dyn Module>>> {
//!         let metrics: Arc<dyn Module> = secrets.construct("metrics", |base| Metrics { base })?;
//!         Ok(vec![metrics])
//!     }
//! }
//!
//! // 3. Start the host
//! #[tokio::main]
//! async fn main() {
//!     let host = Arc::new(HostLifecycle::new("server"));
//!     let loaded = create(&CoreLoader::new(), host.clone()).unwrap();
//!
//!     let mut manager = LifecycleManager::new();
//!     manager.register(loaded);
//!     manager.run_startup(&host, None).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod module;

#[cfg(test)]
mod test_support;

// Re-export core types
pub use config::{ConfigService, LifecycleConfig};
pub use error::{ModgateError, Result};
pub use lifecycle::{Host, HostLifecycle, HostPhase, LifecycleError, ModulePhase, Phase};
pub use loader::{LoadedModules, LoaderMetadata, LoadingSecrets, ModuleLoader, create};
pub use module::{LifecycleGate, Module, ModuleBase};

// Re-export commonly used types from dependencies
pub use async_trait::async_trait;

/// Prelude module for convenient imports
///
/// ```
/// use modgate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigService, LifecycleConfig};
    pub use crate::error::{ModgateError, Result};
    pub use crate::lifecycle::{
        Bootstrap, BootstrapBuilder, Host, HostLifecycle, HostPhase, LifecycleError,
        LifecycleManager, ModulePhase, Phase, Result as LifecycleResult,
    };
    pub use crate::loader::{
        ContactInformation, LoadedModules, LoaderMetadata, LoadingSecrets, ModuleLoader, create,
        create_with_config,
    };
    pub use crate::module::{LifecycleGate, Module, ModuleBase, ModuleSnapshot};
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
    pub use url::Url;
}
