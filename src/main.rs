use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cfg = tui_automata::config::Config::parse();
    if let Some(path) = cfg.log_file.as_deref() {
        init_logging(path)?;
    }
    if cfg.list_devices {
        tui_automata::audio::list_input_devices()?;
        return Ok(());
    }

    tui_automata::app::run(cfg)
}
