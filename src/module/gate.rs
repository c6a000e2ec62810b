use super::{Module, same_module};
use crate::config::LifecycleConfig;
use crate::lifecycle::{LifecycleError, ModulePhase, Phase, PhaseCell, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// The only handle able to move a module's phase.
///
/// Exactly one gate is minted per module, while the module is constructed. It
/// travels to whoever called [`create`](crate::loader::create) and is never
/// reachable from the module itself.
pub struct LifecycleGate {
    module: Arc<dyn Module>,
    state: PhaseCell<ModulePhase>,
    /// Held for the whole of [`advance`](Self::advance); carries the tracer
    /// once it has been started.
    transition: Mutex<Option<Tracer>>,
    config: LifecycleConfig,
}

/// Background task logging every committed phase of one module.
struct Tracer {
    feed: mpsc::UnboundedSender<ModulePhase>,
    task: JoinHandle<()>,
}

impl LifecycleGate {
    pub(crate) fn new(
        module: Arc<dyn Module>,
        state: PhaseCell<ModulePhase>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            module,
            state,
            transition: Mutex::new(None),
            config,
        }
    }

    /// The module this gate controls
    pub fn module(&self) -> &Arc<dyn Module> {
        &self.module
    }

    /// True when `module` is the module this gate controls
    pub fn controls(&self, module: &dyn Module) -> bool {
        same_module(self.module.as_ref(), module)
    }

    /// The controlled module's current phase
    pub fn phase(&self) -> ModulePhase {
        self.state.current()
    }

    /// Move the module to `target`, which must directly follow its current
    /// phase.
    ///
    /// On success the new phase is published to every subscriber and the
    /// module's hook has completed. On error the phase is untouched.
    ///
    /// # Cancellation
    ///
    /// Dropping the returned future before the commit leaves the phase where
    /// it was, and the call can be retried. Once committed, a phase stays
    /// committed even if the future is dropped while the hook is running.
    pub async fn advance(&self, target: ModulePhase) -> Result<()> {
        let mut tracer = self.transition.lock().await;

        if target == ModulePhase::INITIAL {
            let err = LifecycleError::ConstructionTarget {
                module: self.module.name().to_string(),
            };
            tracing::error!("{}", err);
            return Err(err);
        }

        let current = self.state.current();
        if target.previous() != Some(current) {
            return Err(self.out_of_order(current, target));
        }

        if target == ModulePhase::PreInit && self.config.trace_transitions && tracer.is_none() {
            let (started, started_rx) = self.start_tracer(current);
            *tracer = Some(started);
            if self.config.await_tracer_handshake && started_rx.await.is_err() {
                tracing::warn!(
                    "Lifecycle tracer for module [{}] stopped before it started observing",
                    self.module.name()
                );
            }
        }

        self.state
            .step_to(target)
            .map_err(|current| self.out_of_order(current, target))?;
        if let Some(tracer) = tracer.as_ref() {
            let _ = tracer.feed.send(target);
        }

        tracing::debug!(
            "Module [{}][{}] entering {}",
            self.loader_name(),
            self.module.name(),
            target
        );
        self.module.lifecycle_changed(target).await;
        Ok(())
    }

    /// Give up control of the module and wait until its tracer has logged
    /// every committed phase.
    pub async fn close(self) {
        let Some(Tracer { feed, task }) = self.transition.into_inner() else {
            return;
        };
        drop(feed);
        if let Err(err) = task.await {
            tracing::warn!(
                "Lifecycle tracer for module [{}] ended abnormally: {}",
                self.module.name(),
                err
            );
        }
    }

    fn out_of_order(&self, current: ModulePhase, target: ModulePhase) -> LifecycleError {
        let err =
            LifecycleError::out_of_order(self.loader_name(), self.module.name(), current, target);
        tracing::error!("{}", err);
        err
    }

    fn loader_name(&self) -> &str {
        &self.module.base().loader().name
    }

    /// Spawn the task logging every phase of this module, seeded with
    /// `current`.
    ///
    /// The returned receiver resolves once the task is running.
    fn start_tracer(&self, current: ModulePhase) -> (Tracer, oneshot::Receiver<()>) {
        let (feed, mut phases) = mpsc::unbounded_channel();
        let _ = feed.send(current);
        let loader = self.loader_name().to_string();
        let module = self.module.name().to_string();
        let id = self.module.base().id();
        let (started_tx, started_rx) = oneshot::channel();

        let task = tokio::spawn(
            async move {
                let _ = started_tx.send(());
                while let Some(phase) = phases.recv().await {
                    tracing::info!(
                        %id,
                        "- Module [{}][{}] state has changed to {} -",
                        loader,
                        module,
                        phase
                    );
                }
            }
            .instrument(tracing::Span::current()),
        );

        (Tracer { feed, task }, started_rx)
    }
}

impl fmt::Debug for LifecycleGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleGate")
            .field("loader", &self.loader_name())
            .field("module", &self.module.name())
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{load, traced_phases};
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_advance_in_order_reaches_last_phase() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let alpha = &modules[0];
        let gate = loaded.gate(alpha.as_ref()).unwrap();

        for phase in &ModulePhase::ALL[1..] {
            gate.advance(*phase).await.unwrap();
            assert_eq!(alpha.phase(), *phase);
        }
        assert_eq!(alpha.phase(), ModulePhase::PostInit);
        assert_eq!(gate.phase(), ModulePhase::PostInit);
    }

    #[tokio::test]
    async fn test_hook_sees_committed_phase() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let alpha = &modules[0];
        let gate = loaded.gate(alpha.as_ref()).unwrap();

        gate.advance(ModulePhase::PreInit).await.unwrap();
        gate.advance(ModulePhase::Init).await.unwrap();

        assert_eq!(
            alpha.hook_calls().await,
            vec![
                (ModulePhase::PreInit, ModulePhase::PreInit),
                (ModulePhase::Init, ModulePhase::Init),
            ]
        );
    }

    #[tokio::test]
    async fn test_construction_is_never_a_target() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let alpha = &modules[0];
        let gate = loaded.gate(alpha.as_ref()).unwrap();

        let err = gate.advance(ModulePhase::Construction).await.unwrap_err();
        assert!(matches!(err, LifecycleError::ConstructionTarget { .. }));

        gate.advance(ModulePhase::PreInit).await.unwrap();
        let err = gate.advance(ModulePhase::Construction).await.unwrap_err();
        assert!(matches!(err, LifecycleError::ConstructionTarget { .. }));
        assert_eq!(alpha.phase(), ModulePhase::PreInit);
    }

    #[tokio::test]
    async fn test_skip_rewind_and_repeat_are_rejected() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let alpha = &modules[0];
        let gate = loaded.gate(alpha.as_ref()).unwrap();

        let err = gate.advance(ModulePhase::Init).await.unwrap_err();
        assert_eq!(
            err,
            LifecycleError::out_of_order(
                "fixture-loader",
                "alpha",
                ModulePhase::Construction,
                ModulePhase::Init
            )
        );
        assert_eq!(alpha.phase(), ModulePhase::Construction);

        gate.advance(ModulePhase::PreInit).await.unwrap();
        gate.advance(ModulePhase::Init).await.unwrap();

        // repeat
        assert!(gate.advance(ModulePhase::Init).await.is_err());
        // rewind
        assert!(gate.advance(ModulePhase::PreInit).await.is_err());
        assert_eq!(alpha.phase(), ModulePhase::Init);
        assert_eq!(alpha.hook_calls().await.len(), 2);
    }

    #[tokio::test]
    async fn test_subscriber_sees_every_phase_from_construction() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let alpha = &modules[0];
        let gate = loaded.gate(alpha.as_ref()).unwrap();
        let mut phases = alpha.base().subscribe();

        let mut observed = Vec::new();
        phases.changed().await.unwrap();
        observed.push(*phases.borrow_and_update());

        for phase in &ModulePhase::ALL[1..] {
            gate.advance(*phase).await.unwrap();
            phases.changed().await.unwrap();
            observed.push(*phases.borrow_and_update());
        }

        assert_eq!(observed, ModulePhase::ALL);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_advances_apply_once() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let alpha = Arc::clone(&modules[0]);
        let gate = Arc::new(loaded.into_iter().next().unwrap());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = Arc::clone(&gate);
            handles.push(tokio::spawn(async move {
                gate.advance(ModulePhase::PreInit).await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(alpha.phase(), ModulePhase::PreInit);
        assert_eq!(alpha.hook_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_gates_are_independent() {
        let (_host, modules, loaded) = load(&["alpha", "beta"]);
        let (alpha, beta) = (&modules[0], &modules[1]);

        let gate = loaded.gate(alpha.as_ref()).unwrap();
        assert!(gate.controls(alpha.as_ref()));
        assert!(!gate.controls(beta.as_ref()));

        gate.advance(ModulePhase::PreInit).await.unwrap();
        gate.advance(ModulePhase::Init).await.unwrap();

        assert_eq!(beta.phase(), ModulePhase::Construction);
        assert!(beta.hook_calls().await.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_tracer_logs_transitions() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let gate = loaded.gate(modules[0].as_ref()).unwrap();

        gate.advance(ModulePhase::PreInit).await.unwrap();
        gate.advance(ModulePhase::Init).await.unwrap();
        for gate in loaded {
            gate.close().await;
        }

        logs_assert(|lines: &[&str]| {
            let phases = traced_phases(lines, "fixture-loader", "alpha");
            if phases == ["CONSTRUCTION", "PRE_INIT", "INIT"] {
                Ok(())
            } else {
                Err(format!("unexpected tracer output: {:?}", phases))
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_retry_after_cancelled_handshake_keeps_one_tracer() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let alpha = &modules[0];
        let gate = loaded.gate(alpha.as_ref()).unwrap();

        // The tracer cannot start on this thread before the first poll returns.
        tokio::select! {
            biased;
            _ = gate.advance(ModulePhase::PreInit) => panic!("advanced without handshake"),
            _ = std::future::ready(()) => {}
        }
        assert_eq!(alpha.phase(), ModulePhase::Construction);
        assert!(alpha.hook_calls().await.is_empty());

        gate.advance(ModulePhase::PreInit).await.unwrap();
        assert_eq!(alpha.phase(), ModulePhase::PreInit);
        for gate in loaded {
            gate.close().await;
        }

        logs_assert(|lines: &[&str]| {
            let phases = traced_phases(lines, "fixture-loader", "alpha");
            if phases == ["CONSTRUCTION", "PRE_INIT"] {
                Ok(())
            } else {
                Err(format!("unexpected tracer output: {:?}", phases))
            }
        });
    }

    #[tokio::test]
    async fn test_close_without_tracer_returns() {
        let (_host, _modules, loaded) = load(&["alpha"]);
        for gate in loaded {
            gate.close().await;
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_tracing_can_be_disabled() {
        let config = LifecycleConfig {
            trace_transitions: false,
            ..LifecycleConfig::default()
        };
        let (_host, modules, loaded) = crate::test_support::load_with(&["alpha"], config);
        let gate = loaded.gate(modules[0].as_ref()).unwrap();

        gate.advance(ModulePhase::PreInit).await.unwrap();
        assert_eq!(modules[0].phase(), ModulePhase::PreInit);
        for gate in loaded {
            gate.close().await;
        }
        assert!(!logs_contain("state has changed to"));
    }

    #[test]
    fn test_debug_names_module() {
        let (_host, modules, loaded) = load(&["alpha"]);
        let gate = loaded.gate(modules[0].as_ref()).unwrap();
        let rendered = format!("{:?}", gate);
        assert!(rendered.contains("alpha"));
        assert!(rendered.contains("Construction"));
    }
}
