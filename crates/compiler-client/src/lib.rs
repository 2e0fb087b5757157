//! Terminal front end for the compiler playground.
//!
//! Plays the presentation role around [`compiler_core`]: loads
//! configuration, submits one program, and renders the settled session.

pub mod cli;
pub mod config;
pub mod presenter;

/// Install the stderr `tracing` subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
