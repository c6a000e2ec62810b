//! Phase sequences
//!
//! Both the host and every module walk a fixed, linear list of phases. The
//! position in [`Phase::ALL`] is the only source of ordering; the serialized
//! names are independent of it.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter};

/// An ordered, finite sequence of named phases.
pub trait Phase: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Every phase, in order.
    const ALL: &'static [Self];

    /// The phase a fresh state machine starts in.
    const INITIAL: Self;

    /// Position of this phase in [`Phase::ALL`].
    fn ordinal(self) -> usize;

    /// The phase immediately before this one, `None` for the first phase.
    fn previous(self) -> Option<Self> {
        self.ordinal()
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index))
            .copied()
    }

    /// The phase immediately after this one, `None` for the last phase.
    fn next(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }
}

/// Lifecycle of a single module.
///
/// `Construction` is implicit: a module starts there and can never be moved
/// back to it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModulePhase {
    Construction,
    PreInit,
    Init,
    PostInit,
}

impl Phase for ModulePhase {
    const ALL: &'static [Self] = &[
        ModulePhase::Construction,
        ModulePhase::PreInit,
        ModulePhase::Init,
        ModulePhase::PostInit,
    ];

    const INITIAL: Self = ModulePhase::Construction;

    fn ordinal(self) -> usize {
        match self {
            ModulePhase::Construction => 0,
            ModulePhase::PreInit => 1,
            ModulePhase::Init => 2,
            ModulePhase::PostInit => 3,
        }
    }
}

/// Startup sequence of the host that owns the modules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostPhase {
    CoreInitialization,
    ModulePreInit,
    ModuleInit,
    ModulePostInit,
}

impl HostPhase {
    /// The module phase every module must reach while the host is in `self`.
    ///
    /// `None` for core initialization, where modules are only constructed.
    pub const fn module_phase(self) -> Option<ModulePhase> {
        match self {
            HostPhase::CoreInitialization => None,
            HostPhase::ModulePreInit => Some(ModulePhase::PreInit),
            HostPhase::ModuleInit => Some(ModulePhase::Init),
            HostPhase::ModulePostInit => Some(ModulePhase::PostInit),
        }
    }
}

impl Phase for HostPhase {
    const ALL: &'static [Self] = &[
        HostPhase::CoreInitialization,
        HostPhase::ModulePreInit,
        HostPhase::ModuleInit,
        HostPhase::ModulePostInit,
    ];

    const INITIAL: Self = HostPhase::CoreInitialization;

    fn ordinal(self) -> usize {
        match self {
            HostPhase::CoreInitialization => 0,
            HostPhase::ModulePreInit => 1,
            HostPhase::ModuleInit => 2,
            HostPhase::ModulePostInit => 3,
        }
    }
}
