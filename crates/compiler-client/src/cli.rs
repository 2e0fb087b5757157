use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use compiler_core::{CompileRequest, OverlapPolicy, ParserMode, SessionSnapshot, SessionStatus};

use crate::config::ClientConfig;

/// Submit a program to the compiler service and show its diagnostics and
/// symbol table.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source code to submit (defaults to the example program)
    #[arg(long, conflicts_with = "file")]
    pub code: Option<String>,

    /// Read the source from a file ('-' reads stdin)
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Parser the service should use: recursive, lr or glr
    #[arg(long)]
    pub parser: Option<ParserMode>,

    /// Compiler service base URL (overrides COMPILER_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Request timeout in seconds (overrides COMPILER_TIMEOUT_SECS)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Policy for overlapping submissions (overrides COMPILER_OVERLAP_POLICY)
    #[arg(long)]
    pub overlap: Option<OverlapPolicy>,

    /// Path to a TOML client config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the final session snapshot as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Only list error diagnostics
    #[arg(long, default_value_t = false)]
    pub errors_only: bool,
}

impl Args {
    /// Flags take precedence over file and environment settings.
    pub fn apply_overrides(&self, config: &mut ClientConfig) {
        if let Some(ref url) = self.base_url {
            config.base_url = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout_secs = Some(secs);
        }
        if let Some(parser) = self.parser {
            config.parser = parser;
        }
        if let Some(policy) = self.overlap {
            config.overlap_policy = policy;
        }
    }

    /// Build the request to submit from `--code`, `--file` or the example.
    pub fn request(&self, config: &ClientConfig) -> Result<CompileRequest> {
        let code = match (&self.code, &self.file) {
            (Some(code), _) => code.clone(),
            (None, Some(path)) if path.as_os_str() == "-" => {
                let mut code = String::new();
                std::io::stdin()
                    .read_to_string(&mut code)
                    .context("Failed to read source from stdin")?;
                code
            }
            (None, Some(path)) => std::fs::read_to_string(path)
                .context(format!("Failed to read {}", path.display()))?,
            (None, None) => CompileRequest::example().code,
        };
        Ok(CompileRequest::new(code, config.parser))
    }
}

/// Process exit status for a settled session.
pub fn exit_status(snapshot: &SessionSnapshot) -> u8 {
    match snapshot.status {
        SessionStatus::Succeeded if snapshot.has_fatal_errors() => 1,
        SessionStatus::Succeeded => 0,
        _ => 2,
    }
}
