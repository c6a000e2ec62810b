//! Fixtures shared by the unit tests.

use crate::config::LifecycleConfig;
use crate::lifecycle::{Host, HostLifecycle, ModulePhase, Result};
use crate::loader::{
    LoadedModules, LoaderMetadata, LoadingSecrets, ModuleLoader, create_with_config,
};
use crate::module::{Module, ModuleBase};
use async_trait::async_trait;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Module that records `(hook argument, phase visible during the hook)`.
pub(crate) struct RecordingModule {
    base: ModuleBase,
    calls: Mutex<Vec<(ModulePhase, ModulePhase)>>,
}

impl RecordingModule {
    pub(crate) fn new(base: ModuleBase) -> Self {
        Self {
            base,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn hook_calls(&self) -> Vec<(ModulePhase, ModulePhase)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Module for RecordingModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    async fn lifecycle_changed(&self, new_phase: ModulePhase) {
        let visible = self.base.phase();
        self.calls.lock().await.push((new_phase, visible));
    }
}

/// Loader building one [`RecordingModule`] per name.
pub(crate) struct FixtureLoader {
    metadata: LoaderMetadata,
    names: Vec<String>,
    built: StdMutex<Vec<Arc<RecordingModule>>>,
}

impl FixtureLoader {
    pub(crate) fn new(names: &[&str]) -> Self {
        Self {
            metadata: LoaderMetadata::new("fixture-loader", "1.0.0"),
            names: names.iter().map(|name| name.to_string()).collect(),
            built: StdMutex::new(Vec::new()),
        }
    }

    pub(crate) fn built(&self) -> Vec<Arc<RecordingModule>> {
        self.built.lock().unwrap().clone()
    }
}

impl ModuleLoader for FixtureLoader {
    fn metadata(&self) -> &LoaderMetadata {
        &self.metadata
    }

    fn build_modules(
        &self,
        _host: &Arc<dyn Host>,
        secrets: &LoadingSecrets,
    ) -> Result<Vec<Arc<dyn Module>>> {
        let mut modules: Vec<Arc<dyn Module>> = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let module = secrets.construct(name.as_str(), RecordingModule::new)?;
            self.built.lock().unwrap().push(Arc::clone(&module));
            modules.push(module);
        }
        Ok(modules)
    }
}

/// Build `names` for a fresh host with the default config.
pub(crate) fn load(
    names: &[&str],
) -> (Arc<HostLifecycle>, Vec<Arc<RecordingModule>>, LoadedModules) {
    load_with(names, LifecycleConfig::default())
}

pub(crate) fn load_with(
    names: &[&str],
    config: LifecycleConfig,
) -> (Arc<HostLifecycle>, Vec<Arc<RecordingModule>>, LoadedModules) {
    let host = Arc::new(HostLifecycle::new("test-host"));
    let loader = FixtureLoader::new(names);
    let loaded = create_with_config(&loader, host.clone(), config).unwrap();
    (host, loader.built(), loaded)
}

/// Phases logged by a module's tracer, in the order they were logged.
pub(crate) fn traced_phases(lines: &[&str], loader: &str, module: &str) -> Vec<String> {
    let marker = format!("- Module [{}][{}] state has changed to ", loader, module);
    lines
        .iter()
        .filter_map(|line| line.split_once(marker.as_str()))
        .filter_map(|(_, rest)| rest.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
