//! Application entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load and validate [`AppConfig`] (defaults when no file exists).
//! 3. Load the Whisper model.  Failure here is fatal.
//! 4. Create the [`tokio`] runtime (multi-thread).
//! 5. Bind the listener and serve `/ws` + `/health` until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use stenny::{
    config::{AppConfig, AppPaths},
    server::{self, AppState},
    stt::{SerializedEngine, SttEngine, WhisperEngine},
};
use tokio::net::TcpListener;

fn load_engine(config: &AppConfig) -> anyhow::Result<Arc<dyn SttEngine>> {
    let model_path = config.stt.resolve_model_path(&AppPaths::new());
    let whisper = WhisperEngine::load(&model_path, config.stt.transcribe_params())
        .with_context(|| format!("loading Whisper model {}", model_path.display()))?;
    log::info!(
        "Whisper model loaded: {} ({} threads)",
        model_path.display(),
        whisper.params().n_threads
    );

    let engine: Arc<dyn SttEngine> = Arc::new(whisper);
    if config.stt.serialize_calls {
        log::info!("recognizer calls are serialized across sessions");
        return Ok(Arc::new(SerializedEngine::new(engine)));
    }
    Ok(engine)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("shutdown requested");
}

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("stenny starting up");

    // 2. Configuration
    let config = AppConfig::load()?;
    config.validate()?;

    // 3. Recognizer
    let engine = load_engine(&config)?;

    // 4. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    // 5. Serve
    rt.block_on(async {
        let addr: SocketAddr = config
            .server
            .bind_addr()
            .parse()
            .context("failed to parse listen address")?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        log::info!("listening on ws://{}/ws", listener.local_addr()?);

        let state = Arc::new(AppState::new(engine, config.stream.clone(), config.stt.model.clone()));
        server::serve(listener, state, shutdown_signal())
            .await
            .context("server error")
    })?;

    log::info!("stenny shut down, recognizer released");
    Ok(())
}
