use anyhow::Context;
use jobcode_core::config::Config;
use jobcode_core::reconcile::{Engine, EventSink};
use std::path::Path;
use std::sync::Arc;

pub fn run(config_path: &Path, bind: Option<&str>) -> anyhow::Result<()> {
    let config = Config::load_with_env(config_path).context("failed to load config")?;

    // The gateway clients are blocking; build them before entering the runtime.
    let engine = Engine::new(
        config.teamwork_client()?,
        config.harvest_client()?,
        config.sequence_db(),
    );
    config
        .sequence_db()
        .connect()
        .with_context(|| format!("cannot open {}", config.database.path.display()))?;
    let sink: Arc<dyn EventSink> = Arc::new(engine);

    let addr = bind.unwrap_or(&config.server.bind).to_string();
    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on({
        let sink = sink.clone();
        async move {
            tokio::select! {
                res = jobcode_server::serve(sink, &addr) => res,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutting down");
                    Ok(())
                }
            }
        }
    });
    drop(rt);
    result
}
