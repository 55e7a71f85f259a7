use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use winrow::cli::Cli;
use winrow::display::HeadlessDevice;
use winrow::traits::DisplayDevice;
use winrow::{Config, Editor};

fn main() -> Result<()> {
    // Parse CLI first so --help and --version never touch the log file.
    let cli = Cli::parse();
    // CLI --log-level takes precedence over DEBUG_LEVEL.
    winrow::debug::init_log_bridge(cli.debug_level());

    log::info!("Starting winrow {}", winrow::VERSION);

    let mut config = Config::load().context("loading configuration")?;
    cli.apply(&mut config);
    config.validate()?;

    let runtime = Runtime::new()?;
    let result = runtime.block_on(run(cli, config));

    // Use `shutdown_timeout` so a hung command reader can't keep us alive.
    log::info!("Editor exited, shutting down runtime");
    runtime.shutdown_timeout(Duration::from_secs(2));

    if let Err(e) = &result {
        eprintln!("winrow: error: {e:#}");
    }
    result
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let device: Arc<dyn DisplayDevice> = Arc::new(HeadlessDevice::default());
    let (editor, tasks) = Editor::start(config, device)?;

    match &cli.load {
        Some(path) => {
            if let Err(e) = editor.load_session(path, true).await {
                log::error!("can't load {:?}: {}", path, e);
                editor.warnings().add(None, format!("Load: {}\n", e));
            }
        }
        None => editor.read_arg_files(&cli.files)?,
    }
    editor.flush_warnings();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => log::info!("interrupted"),
        _ = hangup() => {
            match editor.dump_default() {
                Ok(path) => log::info!("hangup: dumped session to {:?}", path),
                Err(e) => log::error!("hangup: dump failed: {}", e),
            }
        }
        _ = editor.wait_shutdown() => {}
    }

    editor.close_all();
    editor.shutdown();
    tasks.join().await;
    Ok(())
}

#[cfg(unix)]
async fn hangup() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::hangup()) {
        Ok(mut hup) => {
            hup.recv().await;
        }
        Err(e) => {
            log::warn!("can't watch for hangup: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn hangup() {
    std::future::pending::<()>().await;
}
