use std::path::PathBuf;

use clap::Parser;
use sqlite_cursor::{core::connection::DEFAULT_PREFETCH_ROWS, OpenOptions};

#[derive(Parser, Debug, Clone)]
#[command(name = "sqlite-cursor")]
pub struct Args {
    /// Database to open at startup (otherwise use the `open` command).
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Open databases read-only.
    #[arg(long)]
    pub read_only: bool,

    /// How long to wait on a locked database.
    #[arg(long, default_value_t = 2_000)]
    pub busy_timeout_ms: u64,

    /// Rows each query pulls before returning (at least one).
    #[arg(long, default_value_t = DEFAULT_PREFETCH_ROWS)]
    pub prefetch_rows: usize,

    /// Maximum rows returned per query (unless a smaller limit is provided).
    #[arg(long, default_value_t = 1000)]
    pub max_rows: usize,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            busy_timeout: std::time::Duration::from_millis(self.busy_timeout_ms),
            read_only: self.read_only,
            prefetch_rows: self.prefetch_rows,
        }
    }
}
