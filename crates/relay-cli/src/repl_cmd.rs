//! `relay repl`: drive many turns through one session pool.
//!
//! Reads one prompt per stdin line and reuses the same worker process
//! across turns. `/reset` bounces the worker, `/quit` (or EOF) exits.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use relay_core::worker::{LineObserver, SessionError, SessionPool};

use crate::config::RelayConfig;

pub async fn run_repl(config: &RelayConfig, stream: bool) -> Result<()> {
    let pool = SessionPool::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_ready();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        match text {
            "" => {}
            "/quit" => break,
            "/reset" => {
                pool.reset().await;
                eprintln!("(worker reset)");
            }
            _ => {
                let observer: Option<LineObserver> = if stream {
                    Some(Box::new(|line: &str| eprintln!("{line}")))
                } else {
                    None
                };
                match pool
                    .prompt(&config.launch, text, config.timeout, observer)
                    .await
                {
                    Ok(output) => {
                        if output.exit_code != 0 || output.killed {
                            warn!(
                                exit_code = output.exit_code,
                                signal = ?output.signal,
                                "worker exited abnormally; output may be partial"
                            );
                        }
                        println!("{}", output.stdout);
                    }
                    Err(SessionError::Timeout(d)) => {
                        eprintln!("(turn timed out after {d:?}; worker killed)");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        print_ready();
    }

    pool.reset().await;
    Ok(())
}

fn print_ready() {
    eprint!("> ");
    let _ = std::io::stderr().flush();
}
