//! Host side of the lifecycle
//!
//! Module creation is gated on the host's phase. The [`Host`] trait is all the
//! coordinator needs to read; [`HostLifecycle`] is a ready-made state machine
//! for hosts that do not have their own.

use super::state::PhaseCell;
use super::{HostPhase, LifecycleError, Phase, Result};
use tokio::sync::watch;

/// The application that owns a set of modules.
pub trait Host: Send + Sync + 'static {
    /// Display name used in logs.
    fn name(&self) -> &str;

    /// The phase the host is currently in.
    fn phase(&self) -> HostPhase;
}

/// Minimal host state machine walking [`HostPhase`] one step at a time.
///
/// # Example
///
/// ```rust,ignore
/// use modgate::lifecycle::{HostLifecycle, HostPhase};
///
/// let host = HostLifecycle::new("server");
/// host.advance(HostPhase::ModulePreInit)?;
/// ```
pub struct HostLifecycle {
    name: String,
    state: PhaseCell<HostPhase>,
}

impl HostLifecycle {
    /// Create a host in `CORE_INITIALIZATION`
    pub fn new(name: impl Into<String>) -> Self {
        let (state, _) = PhaseCell::new();
        Self {
            name: name.into(),
            state,
        }
    }

    /// Move the host to `target`, which must directly follow the current phase
    pub fn advance(&self, target: HostPhase) -> Result<()> {
        match self.state.step_to(target) {
            Ok(previous) => {
                tracing::info!(
                    "Host [{}] state has changed from {} to {}",
                    self.name,
                    previous,
                    target
                );
                Ok(())
            }
            Err(current) => {
                let err = LifecycleError::HostOutOfOrder {
                    host: self.name.clone(),
                    current,
                    target,
                };
                tracing::error!("{}", err);
                Err(err)
            }
        }
    }

    /// Watch the host's phase, starting with the current one
    pub fn subscribe(&self) -> watch::Receiver<HostPhase> {
        self.state.subscribe()
    }

    /// True once the host has reached its last phase
    pub fn is_complete(&self) -> bool {
        self.state.current().next().is_none()
    }
}

impl Host for HostLifecycle {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> HostPhase {
        self.state.current()
    }
}
