//! Module loaders and the construction handshake
//!
//! [`create`] is the single entry point that turns a [`ModuleLoader`] into a
//! set of modules plus the gates that drive them:
//!
//! ```text
//! create(loader, host)
//!   ├─ host must be in CORE_INITIALIZATION
//!   ├─ LoadingSecrets::new            ← fresh capsule for this pass
//!   ├─ loader.build_modules(host, &secrets)
//!   │    └─ secrets.construct(..)     ← one gate deposited per module
//!   └─ pair every returned module with its gate → LoadedModules
//! ```

use crate::config::LifecycleConfig;
use crate::lifecycle::{Host, HostPhase, LifecycleError, PhaseCell, Result};
use crate::module::{LifecycleGate, Module, ModuleBase, ModuleSnapshot, module_key};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use url::Url;

/// How to reach someone responsible for a loader.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContactInformation {
    /// Person or team name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
}

impl ContactInformation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: None,
            url: None,
        }
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }
}

/// Descriptive data about a loader. Carries no behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Distinct contacts, ordered by name
    #[serde(default)]
    pub authors: BTreeSet<ContactInformation>,
    /// Where the loader's source lives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<Url>,
}

impl LoaderMetadata {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
            authors: BTreeSet::new(),
            source_code: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add an author; adding the same contact twice keeps one entry
    pub fn author(mut self, author: ContactInformation) -> Self {
        self.authors.insert(author);
        self
    }

    pub fn source_code(mut self, location: Url) -> Self {
        self.source_code = Some(location);
        self
    }
}

/// Provider of a batch of modules.
///
/// # Example
///
/// ```rust,ignore
/// use modgate::prelude::*;
///
/// struct CoreLoader {
///     metadata: LoaderMetadata,
/// }
///
/// impl ModuleLoader for CoreLoader {
///     fn metadata(&self) -> &LoaderMetadata {
///         &self.metadata
///     }
///
///     fn build_modules(
///         &self,
///         _host: &Arc<dyn Host>,
///         secrets: &LoadingSecrets,
///     ) -> LifecycleResult<Vec<Arc<dyn Module>>> {
///         let metrics: Arc<dyn Module> = secrets.construct("metrics", |base| Metrics { base })?;
///         Ok(vec![metrics])
///     }
/// }
/// ```
pub trait ModuleLoader: Send + Sync + 'static {
    fn metadata(&self) -> &LoaderMetadata;

    /// Build this loader's modules through `secrets`.
    ///
    /// Every returned module must come from `secrets.construct` in this call.
    fn build_modules(
        &self,
        host: &Arc<dyn Host>,
        secrets: &LoadingSecrets,
    ) -> Result<Vec<Arc<dyn Module>>>;
}

/// Capsule that lives for one [`create`] call and collects the gates minted
/// by the modules built during it.
///
/// It can only be obtained from [`create`], so modules cannot be built
/// anywhere else.
pub struct LoadingSecrets {
    host: Arc<dyn Host>,
    loader: Arc<LoaderMetadata>,
    config: LifecycleConfig,
    gates: DashMap<usize, LifecycleGate>,
}

impl LoadingSecrets {
    fn new(
        host: Arc<dyn Host>,
        loader: Arc<LoaderMetadata>,
        config: LifecycleConfig,
    ) -> Result<Self> {
        ensure_core_initialization(host.as_ref())?;
        Ok(Self {
            host,
            loader,
            config,
            gates: DashMap::new(),
        })
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Build one module.
    ///
    /// `build` receives the module's [`ModuleBase`]; the gate for the
    /// resulting module is kept in this capsule. Fails without building
    /// anything when the host has left core initialization.
    ///
    /// Safe to call from several threads at once.
    pub fn construct<M, F>(&self, name: impl Into<String>, build: F) -> Result<Arc<M>>
    where
        M: Module,
        F: FnOnce(ModuleBase) -> M,
    {
        ensure_core_initialization(self.host.as_ref())?;

        let name = name.into();
        let (state, lifecycle) = PhaseCell::new();
        let base = ModuleBase::new(
            name,
            Arc::clone(&self.loader),
            Arc::clone(&self.host),
            lifecycle,
        );
        let module = Arc::new(build(base));

        let handle: Arc<dyn Module> = module.clone();
        tracing::debug!(
            "Constructed module [{}][{}] ({})",
            self.loader.name,
            handle.name(),
            handle.base().id()
        );
        let gate = LifecycleGate::new(Arc::clone(&handle), state, self.config.clone());
        self.gates.insert(module_key(handle.as_ref()), gate);

        Ok(module)
    }

    /// Number of gates deposited so far
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

fn ensure_core_initialization(host: &dyn Host) -> Result<()> {
    let host_phase = host.phase();
    if host_phase != HostPhase::CoreInitialization {
        let err = LifecycleError::OutsideCoreInitialization { host_phase };
        tracing::error!("Host [{}]: {}", host.name(), err);
        return Err(err);
    }
    Ok(())
}

/// Create `loader`'s modules for `host` with the default [`LifecycleConfig`].
pub fn create(loader: &dyn ModuleLoader, host: Arc<dyn Host>) -> Result<LoadedModules> {
    create_with_config(loader, host, LifecycleConfig::default())
}

/// Create `loader`'s modules for `host`.
///
/// The host must be in `CORE_INITIALIZATION`. The returned [`LoadedModules`]
/// holds the only gates for the new modules.
pub fn create_with_config(
    loader: &dyn ModuleLoader,
    host: Arc<dyn Host>,
    config: LifecycleConfig,
) -> Result<LoadedModules> {
    let metadata = Arc::new(loader.metadata().clone());
    let secrets = LoadingSecrets::new(Arc::clone(&host), Arc::clone(&metadata), config)?;

    let modules = loader.build_modules(&host, &secrets)?;
    let gates = secrets.gates;

    let mut paired = Vec::with_capacity(modules.len());
    let mut seen = HashSet::with_capacity(modules.len());
    for module in modules {
        let key = module_key(module.as_ref());
        match gates.remove(&key) {
            Some((_, gate)) => {
                seen.insert(key);
                paired.push(gate);
            }
            None => {
                let module = module.name().to_string();
                let loader = metadata.name.clone();
                let err = if seen.contains(&key) {
                    LifecycleError::DuplicateModule { loader, module }
                } else {
                    LifecycleError::MissingGate { loader, module }
                };
                tracing::error!("{}", err);
                return Err(err);
            }
        }
    }

    if !gates.is_empty() {
        tracing::warn!(
            "Loader [{}] built {} module(s) it did not return; they will stay in construction",
            metadata.name,
            gates.len()
        );
    }

    tracing::info!(
        "Loader [{}] v{} created {} module(s) for host [{}]",
        metadata.name,
        metadata.version,
        paired.len(),
        host.name()
    );

    Ok(LoadedModules {
        loader: metadata,
        gates: paired,
    })
}

/// The modules of one loading pass, each paired with its gate.
#[derive(Debug)]
pub struct LoadedModules {
    loader: Arc<LoaderMetadata>,
    gates: Vec<LifecycleGate>,
}

impl LoadedModules {
    /// Metadata of the loader that built these modules
    pub fn loader(&self) -> &LoaderMetadata {
        &self.loader
    }

    /// Number of modules loaded
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Gate controlling `module`, matched by identity
    pub fn gate(&self, module: &dyn Module) -> Option<&LifecycleGate> {
        self.gates.iter().find(|gate| gate.controls(module))
    }

    /// Modules in the order the loader returned them
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.gates.iter().map(LifecycleGate::module)
    }

    /// Modules paired with their gates
    pub fn iter(&self) -> impl Iterator<Item = (&Arc<dyn Module>, &LifecycleGate)> {
        self.gates.iter().map(|gate| (gate.module(), gate))
    }

    /// Current phase of every module, in load order
    pub fn snapshot(&self) -> Vec<ModuleSnapshot> {
        self.modules().map(|module| module.base().snapshot()).collect()
    }
}

impl IntoIterator for LoadedModules {
    type Item = LifecycleGate;
    type IntoIter = std::vec::IntoIter<LifecycleGate>;

    fn into_iter(self) -> Self::IntoIter {
        self.gates.into_iter()
    }
}
