//! `relay prompt`: run a single turn against the configured worker.

use anyhow::Result;
use tracing::{debug, warn};

use relay_core::worker::{LineObserver, SessionPool};

use crate::config::RelayConfig;

/// Send one prompt, print the turn's stdout, and tear the worker down.
pub async fn run_prompt(config: &RelayConfig, text: &str, stream: bool) -> Result<()> {
    let pool = SessionPool::new();

    let observer: Option<LineObserver> = if stream {
        Some(Box::new(|line: &str| eprintln!("{line}")))
    } else {
        None
    };

    let result = pool
        .prompt(&config.launch, text, config.timeout, observer)
        .await;

    // One-shot invocation: the worker has no next turn to stay alive for.
    pool.reset().await;

    let output = result?;
    if !output.stderr.is_empty() {
        debug!(stderr = %output.stderr.trim_end(), "worker stderr");
    }
    if output.exit_code != 0 || output.killed {
        warn!(
            exit_code = output.exit_code,
            signal = ?output.signal,
            "worker exited abnormally; output may be partial"
        );
    }

    println!("{}", output.stdout);
    Ok(())
}
