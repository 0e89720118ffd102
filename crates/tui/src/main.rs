mod app;
mod events;
mod logging;
mod persist;
mod strings;
mod terminal;
mod theme;
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use providers::gemini::{GeminiClient, GeminiConfig};
use terminal::TerminalGuard;
use tracing::{error, info};

fn main() -> Result<()> {
    let _log_guard = logging::init_tracing()?;
    info!(target: "tui", "gemchat {} starting", env!("CARGO_PKG_VERSION"));

    let cfg = GeminiConfig::from_env_and_file();
    let client = GeminiClient::new(&cfg).context("build Gemini client")?;
    let mut app = app::App::new(
        Arc::new(client),
        persist::default_storage(),
        cfg.system_instruction.clone(),
    );
    app.start_model_bootstrap();

    let mut term = TerminalGuard::new()?;
    let res = events::run(&mut term.terminal, &mut app);
    drop(term);
    if let Err(e) = &res {
        error!(target: "tui", "event loop failed: {:#}", e);
    }
    res
}
