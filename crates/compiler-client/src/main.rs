use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use compiler_client::cli::{exit_status, Args};
use compiler_client::config::ClientConfig;
use compiler_client::presenter::{render_summary, TerminalPresenter};
use compiler_core::SessionController;
use tracing::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    compiler_client::init_tracing();

    let args = Args::parse();
    let mut config = ClientConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;

    info!(
        base_url = %config.base_url,
        parser = %config.parser,
        overlap = %config.overlap_policy,
        "Compiler client starting"
    );

    let gateway = config
        .gateway()
        .context("Failed to set up compiler service gateway")?;
    let session = SessionController::new(Arc::new(gateway), config.overlap_policy);

    let request = args.request(&config)?;
    session.set_request(request.clone());
    session.submit(request)?;
    let snapshot = session.wait_for_settled().await;

    info!(summary = %session.summary(), "Session settled");

    let stdout = std::io::stdout();
    if args.json {
        let mut out = stdout.lock();
        serde_json::to_writer_pretty(&mut out, snapshot.as_ref())
            .context("Failed to write snapshot JSON")?;
        writeln!(out)?;
    } else {
        let presenter = TerminalPresenter::new(stdout.lock()).errors_only(args.errors_only);
        session.open_diagnostics(&presenter);
        let mut out = presenter.into_inner();
        render_summary(&snapshot, &mut out)?;
    }

    Ok(ExitCode::from(exit_status(&snapshot)))
}
