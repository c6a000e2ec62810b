//! Lifecycle Phases Module
//!
//! Phase sequences, the host's state machine, and the orchestration that keeps
//! modules in step with the host.
//!
//! # Lifecycle Phases
//!
//! ```text
//!   Host                         Modules
//!   ────                         ───────
//! 1. CORE_INITIALIZATION    →    CONSTRUCTION   ← loader::create
//!    ↓                              ↓
//! 2. MODULE_PRE_INIT        →    PRE_INIT       ← tracer started
//!    ↓                              ↓
//! 3. MODULE_INIT            →    INIT
//!    ↓                              ↓
//! 4. MODULE_POST_INIT       →    POST_INIT
//! ```
//!
//! Each arrow on the module side is one [`LifecycleGate::advance`] call. A gate
//! accepts only the direct successor of the current phase.
//!
//! [`LifecycleGate::advance`]: crate::module::LifecycleGate::advance

mod bootstrap;
mod error;
mod host;
mod manager;
mod phase;
mod state;

pub use bootstrap::{Bootstrap, BootstrapBuilder};
pub use error::{LifecycleError, Result};
pub use host::{Host, HostLifecycle};
pub use manager::LifecycleManager;
pub use phase::{HostPhase, ModulePhase, Phase};

pub(crate) use state::{PhaseCell, replaying};
