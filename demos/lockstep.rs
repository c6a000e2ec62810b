use modgate::prelude::*;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Starts a heartbeat task once initialized.
struct Heartbeat {
    base: ModuleBase,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl Module for Heartbeat {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    async fn lifecycle_changed(&self, new_phase: ModulePhase) {
        if new_phase != ModulePhase::Init {
            return;
        }

        let name = self.base.name().to_string();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(200));
            loop {
                ticker.tick().await;
                tracing::debug!("{} is alive", name);
            }
        });
        if let Ok(mut task) = self.task.lock() {
            *task = Some(handle);
        }
    }
}

/// Only logs what it sees.
struct Echo {
    base: ModuleBase,
}

#[async_trait]
impl Module for Echo {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    async fn lifecycle_changed(&self, new_phase: ModulePhase) {
        tracing::info!("echo reached {} (host is in {})", new_phase, self.base.host().phase());
    }
}

struct DemoLoader {
    metadata: LoaderMetadata,
}

impl ModuleLoader for DemoLoader {
    fn metadata(&self) -> &LoaderMetadata {
        &self.metadata
    }

    fn build_modules(
        &self,
        _host: &Arc<dyn Host>,
        secrets: &LoadingSecrets,
    ) -> LifecycleResult<Vec<Arc<dyn Module>>> {
        let heartbeat: Arc<dyn Module> = secrets.construct("heartbeat", |base| Heartbeat {
            base,
            task: std::sync::Mutex::new(None),
        })?;
        let echo: Arc<dyn Module> = secrets.construct("echo", |base| Echo { base })?;
        Ok(vec![heartbeat, echo])
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = LifecycleConfig::from_env()?;
    let loader = DemoLoader {
        metadata: LoaderMetadata::new("demo", env!("CARGO_PKG_VERSION"))
            .description("Demonstration modules")
            .source_code(Url::parse("https://example.com/modgate-demo")?),
    };

    let host = Arc::new(HostLifecycle::new("demo-host"));
    let loaded = create_with_config(&loader, host.clone(), config.clone())?;

    let mut watchers = Vec::new();
    for module in loaded.modules() {
        let mut phases = module.base().subscribe();
        let name = module.name().to_string();
        watchers.push(tokio::spawn(async move {
            while phases.changed().await.is_ok() {
                let phase = *phases.borrow_and_update();
                println!("[observer] {} -> {}", name, phase);
                if phase.next().is_none() {
                    break;
                }
            }
        }));
    }

    let mut manager = LifecycleManager::new();
    manager.register(loaded);
    manager.run_startup(&host, config.phase_timeout).await?;

    for watcher in watchers {
        watcher.await?;
    }

    for module in manager.modules() {
        println!("{}", serde_json::to_string(&module.base().snapshot())?);
    }
    manager.close().await;
    Ok(())
}
