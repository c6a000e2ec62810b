//! Lifecycle Manager
//!
//! Holds the gates of every loaded module and drives them in step with the
//! host.

use super::{Host, HostLifecycle, HostPhase, LifecycleError, ModulePhase, Phase, Result};
use crate::loader::LoadedModules;
use crate::module::{LifecycleGate, Module};
use std::sync::Arc;
use std::time::Duration;

/// Drives registered modules through their phases
///
/// The LifecycleManager is responsible for:
/// - Owning the gates returned by [`create`](crate::loader::create)
/// - Advancing every module when the host enters a module phase
/// - Stopping at the first contract violation
///
/// # Example
///
/// ```rust,ignore
/// use modgate::lifecycle::{HostLifecycle, LifecycleManager};
///
/// let mut manager = LifecycleManager::new();
/// manager.register(loader::create(&core_loader, host.clone())?);
///
/// manager.run_startup(&host, None).await?;
/// ```
pub struct LifecycleManager {
    gates: Vec<LifecycleGate>,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleManager {
    /// Create a new LifecycleManager
    pub fn new() -> Self {
        Self { gates: Vec::new() }
    }

    /// Take ownership of the gates of one loading pass
    pub fn register(&mut self, loaded: LoadedModules) {
        tracing::debug!(
            "Registering {} module(s) from loader [{}]",
            loaded.len(),
            loaded.loader().name
        );
        self.gates.extend(loaded);
    }

    /// Advance every module to `phase`
    ///
    /// Modules are advanced in the order they were registered.
    pub async fn advance_modules(&self, phase: ModulePhase) -> Result<()> {
        tracing::info!("Advancing modules to {}...", phase);

        for gate in &self.gates {
            tracing::debug!("Advancing: {}", gate.module().name());
            gate.advance(phase).await?;
        }

        tracing::info!(
            "{} complete ({} modules advanced)",
            phase,
            self.gates.len()
        );
        Ok(())
    }

    /// Advance every module to `phase` with a timeout
    pub async fn advance_modules_with_timeout(
        &self,
        phase: ModulePhase,
        timeout: Duration,
    ) -> Result<()> {
        tokio::time::timeout(timeout, self.advance_modules(phase))
            .await
            .map_err(|_| {
                LifecycleError::timeout(phase.to_string(), format!("Timeout after {:?}", timeout))
            })?
    }

    /// Move the host to `host_phase`, then bring every module to the matching
    /// module phase
    pub async fn step(
        &self,
        host: &HostLifecycle,
        host_phase: HostPhase,
        timeout: Option<Duration>,
    ) -> Result<()> {
        host.advance(host_phase)?;

        match (host_phase.module_phase(), timeout) {
            (Some(phase), Some(timeout)) => self.advance_modules_with_timeout(phase, timeout).await,
            (Some(phase), None) => self.advance_modules(phase).await,
            (None, _) => Ok(()),
        }
    }

    /// Step the host from its current phase through the last one
    pub async fn run_startup(&self, host: &HostLifecycle, timeout: Option<Duration>) -> Result<()> {
        let mut next = host.phase().next();
        while let Some(host_phase) = next {
            self.step(host, host_phase, timeout).await?;
            next = host_phase.next();
        }
        Ok(())
    }

    /// Registered modules, in registration order
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.gates.iter().map(LifecycleGate::module)
    }

    /// Get the number of registered modules
    pub fn module_count(&self) -> usize {
        self.gates.len()
    }

    /// Release every gate, waiting for each module's tracer to finish logging
    pub async fn close(self) {
        tracing::debug!("Closing {} module gate(s)", self.gates.len());
        for gate in self.gates {
            gate.close().await;
        }
    }
}
