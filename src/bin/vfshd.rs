//! Thin bootstrap binary: loads a [`codex_vfs::config::Config`], spawns
//! autosave and the remote-mount demo server, then idles. NOT the
//! interactive shell — just enough composition to smoke-test the pieces
//! by hand. Flag/subscriber style modeled on `graph-git-cli/src/main.rs`'s
//! `Opts`/`FmtSubscriber` setup.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use codex_vfs::autosave::{Autosave, DirtyTracker};
use codex_vfs::config::Config;
use codex_vfs::remote::server;
use codex_vfs::vfs::Vfs;

/// Command-line options for the bootstrap daemon.
#[derive(Parser)]
#[clap(version, author)]
struct Opts {
    /// Path to a TOML config file; falls back to built-in defaults if absent.
    #[clap(long)]
    config: Option<String>,

    /// Address to bind the demo remote-mount server on, e.g. "127.0.0.1:8923".
    #[clap(long)]
    listen: Option<String>,

    /// Print debug-level tracing output.
    #[clap(short)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();

    let level = if opts.debug { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(level).try_init().ok();

    let config = match opts.config {
        Some(path) => match Config::load(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, path, "failed to load config, using defaults");
                Config::default()
            }
        },
        None => Config::default(),
    };

    let vfs = Arc::new(Mutex::new(Vfs::new()));
    let tracker = Arc::new(Mutex::new(DirtyTracker::default()));
    let (_autosave, autosave_handle) = Autosave::spawn(vfs.clone(), tracker, config.autosave.clone());

    let remote_handle = match opts.listen {
        Some(addr) => match TcpListener::bind(&addr).await {
            Ok(listener) => {
                tracing::info!(addr, "remote mount server listening");
                Some(server::spawn(listener, vfs.clone()))
            }
            Err(e) => {
                tracing::error!(error = %e, addr, "failed to bind remote mount listener");
                None
            }
        },
        None => None,
    };

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutting down");
    autosave_handle.abort();
    if let Some(handle) = remote_handle {
        handle.abort();
    }
}
