//! Lifecycle-specific error types

use super::{HostPhase, ModulePhase};
use thiserror::Error;

/// Errors raised when the lifecycle contract is broken.
///
/// Every variant except [`LifecycleError::Timeout`] and
/// [`LifecycleError::InitializationFailed`] is a programming error in the
/// orchestration code. Callers are expected to abort startup on them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `Construction` was requested as an explicit transition target
    #[error("Unexpected 'construction' lifecycle target for module {module}")]
    ConstructionTarget { module: String },

    /// A transition tried to skip, rewind or repeat a phase
    #[error(
        "Attempted to change the module lifecycle of {loader} - {module} from {current} to {target} directly"
    )]
    OutOfOrder {
        loader: String,
        module: String,
        current: ModulePhase,
        target: ModulePhase,
    },

    /// Module creation was attempted while the host had left core initialization
    #[error(
        "Attempted to create a module outside of the core initialization (host is in {host_phase})"
    )]
    OutsideCoreInitialization { host_phase: HostPhase },

    /// A loader returned a module that was not built through its capsule
    #[error("Module {module} returned by {loader} has no lifecycle gate in this loading pass")]
    MissingGate { loader: String, module: String },

    /// A loader returned the same module twice
    #[error("Module {module} was returned more than once by {loader}")]
    DuplicateModule { loader: String, module: String },

    /// The host's own sequence was stepped out of order
    #[error("Attempted to change the lifecycle of host {host} from {current} to {target} directly")]
    HostOutOfOrder {
        host: String,
        current: HostPhase,
        target: HostPhase,
    },

    /// Startup could not begin
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Operation timed out
    #[error("Timeout during {phase}: {message}")]
    Timeout {
        /// The lifecycle phase where timeout occurred
        phase: String,
        /// Additional error message
        message: String,
    },
}

impl LifecycleError {
    /// Create an initialization failure error
    pub fn init_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Timeout {
            phase: phase.into(),
            message: message.into(),
        }
    }

    pub fn out_of_order(
        loader: impl Into<String>,
        module: impl Into<String>,
        current: ModulePhase,
        target: ModulePhase,
    ) -> Self {
        Self::OutOfOrder {
            loader: loader.into(),
            module: module.into(),
            current,
            target,
        }
    }

    /// True for errors that indicate broken orchestration rather than a slow
    /// or failing environment.
    pub fn is_contract_violation(&self) -> bool {
        !matches!(self, Self::InitializationFailed(_) | Self::Timeout { .. })
    }
}

/// A specialized Result type for lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;
