//! Host Bootstrap
//!
//! High-level API that loads every module during core initialization and then
//! walks the host and its modules through startup together.

use super::{Host, HostLifecycle, LifecycleError, LifecycleManager, Result};
use crate::config::LifecycleConfig;
use crate::loader::{ModuleLoader, create_with_config};
use crate::module::{Module, ModuleSnapshot};
use std::sync::Arc;
use std::time::Duration;

/// A started host together with the modules it drove
///
/// # Example
///
/// ```rust,ignore
/// use modgate::lifecycle::{Bootstrap, HostLifecycle};
///
/// #[tokio::main]
/// async fn main() {
///     let bootstrap = Bootstrap::builder()
///         .host(Arc::new(HostLifecycle::new("server")))
///         .loader(Arc::new(CoreLoader::default()))
///         .phase_timeout(Duration::from_secs(30))
///         .build()
///         .await
///         .expect("Failed to start modules");
///
///     for module in bootstrap.snapshot() {
///         println!("{} -> {}", module.module, module.phase);
///     }
/// }
/// ```
pub struct Bootstrap {
    host: Arc<HostLifecycle>,
    lifecycle_manager: LifecycleManager,
}

impl Bootstrap {
    /// Create a new bootstrap builder
    pub fn builder() -> BootstrapBuilder {
        BootstrapBuilder::new()
    }

    /// The started host
    pub fn host(&self) -> &Arc<HostLifecycle> {
        &self.host
    }

    /// All modules, in loader registration order
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.lifecycle_manager.modules()
    }

    /// Current phase of every module
    pub fn snapshot(&self) -> Vec<ModuleSnapshot> {
        self.modules()
            .map(|module| module.base().snapshot())
            .collect()
    }
}

/// Builder for Bootstrap
pub struct BootstrapBuilder {
    host: Option<Arc<HostLifecycle>>,
    loaders: Vec<Arc<dyn ModuleLoader>>,
    config: LifecycleConfig,
}

impl Default for BootstrapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapBuilder {
    /// Create a new bootstrap builder
    pub fn new() -> Self {
        Self {
            host: None,
            loaders: Vec::new(),
            config: LifecycleConfig::default(),
        }
    }

    /// Set the host to start
    pub fn host(mut self, host: Arc<HostLifecycle>) -> Self {
        self.host = Some(host);
        self
    }

    /// Add a loader; loaders are created and driven in the order added
    pub fn loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Replace the lifecycle configuration
    pub fn config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Set a timeout for each host phase worth of module transitions
    pub fn phase_timeout(mut self, timeout: Duration) -> Self {
        self.config.phase_timeout = Some(timeout);
        self
    }

    /// Load all modules and run the startup sequence
    ///
    /// This will:
    /// 1. Create every loader's modules while the host is in core initialization
    /// 2. Step the host through each remaining phase, advancing all modules
    ///
    /// # Errors
    ///
    /// Returns the first lifecycle error; the host and modules stay where the
    /// failure left them.
    pub async fn build(self) -> Result<Bootstrap> {
        let host = self
            .host
            .ok_or_else(|| LifecycleError::init_failed("Host not provided"))?;

        tracing::info!("Starting module initialization for host [{}]...", host.name());

        let mut lifecycle_manager = LifecycleManager::new();
        for loader in &self.loaders {
            let loaded = create_with_config(loader.as_ref(), host.clone(), self.config.clone())?;
            lifecycle_manager.register(loaded);
        }

        lifecycle_manager
            .run_startup(&host, self.config.phase_timeout)
            .await?;

        tracing::info!(
            "Module initialization complete ({} modules)",
            lifecycle_manager.module_count()
        );

        Ok(Bootstrap {
            host,
            lifecycle_manager,
        })
    }
}
