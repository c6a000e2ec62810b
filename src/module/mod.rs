//! Modules and their lifecycle state
//!
//! A module is built only through [`LoadingSecrets::construct`], which hands it
//! a [`ModuleBase`] and keeps the matching [`LifecycleGate`] for the loader.
//! Nothing reachable from the module can move its phase.
//!
//! # Example
//!
//! ```rust,ignore
//! use modgate::prelude::*;
//!
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
//!         if new_phase == ModulePhase::Init {
//!             tracing::info!("Metrics module starting exporters");
//!         }
//!     }
//! }
//!
//! // inside ModuleLoader::build_modules
//! let metrics = secrets.construct("metrics", |base| Metrics { base })?;
//! ```
//!
//! [`LoadingSecrets::construct`]: crate::loader::LoadingSecrets::construct

mod gate;

pub use gate::LifecycleGate;

use crate::lifecycle::{Host, ModulePhase};
use crate::loader::LoaderMetadata;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// An extension unit driven through the module lifecycle.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    /// State shared by every module.
    fn base(&self) -> &ModuleBase;

    /// Called once per transition, after the new phase is visible through
    /// [`ModuleBase::phase`], inside the task that performed the transition.
    ///
    /// Only the module's gate calls this.
    async fn lifecycle_changed(&self, new_phase: ModulePhase);

    fn name(&self) -> &str {
        self.base().name()
    }

    fn phase(&self) -> ModulePhase {
        self.base().phase()
    }
}

/// Identity, ownership and read-only lifecycle state of one module.
pub struct ModuleBase {
    id: Uuid,
    name: String,
    loader: Arc<LoaderMetadata>,
    host: Arc<dyn Host>,
    lifecycle: watch::Receiver<ModulePhase>,
}

impl ModuleBase {
    pub(crate) fn new(
        name: String,
        loader: Arc<LoaderMetadata>,
        host: Arc<dyn Host>,
        lifecycle: watch::Receiver<ModulePhase>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            loader,
            host,
            lifecycle,
        }
    }

    /// Random id for logs and snapshots. Identity is the module allocation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name given by the loader at construction
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata of the loader that created this module
    pub fn loader(&self) -> &LoaderMetadata {
        &self.loader
    }

    /// The host this module was created for
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// Current phase, as last committed by the module's gate
    pub fn phase(&self) -> ModulePhase {
        *self.lifecycle.borrow()
    }

    /// Watch this module's phase.
    ///
    /// The first `changed()` resolves immediately with the current phase; every
    /// later transition follows in order. A reader that falls behind only sees
    /// the latest phase.
    pub fn subscribe(&self) -> watch::Receiver<ModulePhase> {
        crate::lifecycle::replaying(self.lifecycle.clone())
    }

    /// Capture name, owner and phase for telemetry
    pub fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot {
            loader: self.loader.name.clone(),
            module: self.name.clone(),
            id: self.id,
            phase: self.phase(),
        }
    }
}

/// Point-in-time view of a module for telemetry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSnapshot {
    /// Name of the owning loader
    pub loader: String,
    /// Module name
    pub module: String,
    /// Diagnostic id of the module
    pub id: Uuid,
    /// Phase at the time of the snapshot
    pub phase: ModulePhase,
}

/// True when both references point at the same module.
pub fn same_module(a: &dyn Module, b: &dyn Module) -> bool {
    std::ptr::addr_eq(a as *const dyn Module, b as *const dyn Module)
}

pub(crate) fn module_key(module: &dyn Module) -> usize {
    (module as *const dyn Module).cast::<()>() as usize
}
