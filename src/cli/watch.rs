//! Live task tree output.

use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// How often to check the database for writes from other processes
    #[arg(short, long, default_value_t = 1000, value_name = "MS")]
    pub interval_ms: u64,

    /// Output format: markdown (default) or json
    #[arg(short, long)]
    pub format: Option<String>,
}

impl WatchArgs {
    /// Polling interval, never shorter than 50ms.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(50))
    }
}
