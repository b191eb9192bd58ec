//! meshmark - sketch annotations onto 3D models in the terminal
//!
//! Controls:
//!   - D: Toggle draw mode (hold left mouse to draw on the model)
//!   - T: Toggle line / tube display
//!   - Left drag / Arrow Keys: Orbit (navigate mode)
//!   - +/- or scroll: Zoom
//!   - Paste or drop a .gltf/.glb path: Load that model
//!   - Q/ESC: Quit

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use meshmark_core::{EngineConfig, Mesh, ModelLoader};
use meshmark_terminal::TerminalApp;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "meshmark-terminal", version, about = "Sketch annotations onto 3D models")]
struct Args {
    /// Model to open (.gltf or .glb); a cube is shown otherwise
    model: Option<PathBuf>,

    /// Engine settings (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target frames per second
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Directory for meshmark.log
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

const LOG_FILE: &str = "meshmark.log";
const DEFAULT_LOG_FILTER: &str = "info,meshmark_core=debug,meshmark_terminal=debug";

/// Separate this run from earlier ones in an existing log file
fn mark_session_start(log_file: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(log_file)?;
    let started = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "\n---- meshmark-terminal {} (pid {}) ----", started, std::process::id())
}

/// File-only logging; the terminal itself belongs to the renderer
fn setup_logging(logs_dir: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;

    if let Err(e) = std::fs::create_dir_all(logs_dir) {
        eprintln!("logging disabled: cannot create {}: {}", logs_dir.display(), e);
        return None;
    }
    // A missing file just means this is the first run
    let _ = mark_session_start(&logs_dir.join(LOG_FILE));

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(logs_dir, LOG_FILE));
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    Some(guard)
}

fn load_config(path: Option<&PathBuf>) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    match EngineConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "falling back to default config");
            EngineConfig::default()
        }
    }
}

fn initial_model(path: Option<&PathBuf>) -> Mesh {
    let handle = path.and_then(ModelLoader::accept);
    match handle.map(|handle| handle.load()) {
        Some(Ok(mesh)) => mesh,
        Some(Err(e)) => {
            warn!(error = %e, "could not load model, showing a cube");
            Mesh::cube(2.0)
        }
        None => Mesh::cube(2.0),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive for the duration of the program
    let _log_guard = setup_logging(&args.log_dir);
    info!(?args, "starting meshmark-terminal");

    let config = load_config(args.config.as_ref());
    let mesh = initial_model(args.model.as_ref());

    let mut app = TerminalApp::new(mesh, &config, args.fps).context("failed to query terminal size")?;
    app.run().context("terminal session failed")?;

    info!("meshmark-terminal exited");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_mark_appends_to_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join(LOG_FILE);
        std::fs::write(&log, "earlier run\n").unwrap();

        mark_session_start(&log).unwrap();

        let text = std::fs::read_to_string(&log).unwrap();
        assert!(text.starts_with("earlier run\n"));
        assert!(text.contains("---- meshmark-terminal "));
    }

    #[test]
    fn test_session_mark_needs_existing_log() {
        let dir = tempfile::tempdir().unwrap();
        assert!(mark_session_start(&dir.path().join(LOG_FILE)).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let args = Args::parse_from(["meshmark-terminal"]);
        assert!(args.model.is_none());
        assert_eq!(args.fps, 30);
        assert_eq!(args.log_dir, PathBuf::from("logs"));
    }
}
