use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::node::Node;
use crate::retention::RetentionManager;
use crate::utils::{init_logging, METRICS};

/// CLI for the retention node.
#[derive(Parser)]
#[clap(name = "roundkeeper", version)]
pub struct Cli {
    /// Path to the TOML config file
    #[clap(long, default_value = "roundkeeper.toml")]
    pub config: PathBuf,

    /// Log level used when RUST_LOG is unset
    #[clap(long, default_value = "info")]
    pub log_level: String,

    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Create the round store and its schema
    Init,
    /// Apply the retention policy once, as for the first processed round
    Prune {
        /// latest processed round
        #[clap(long)]
        round: u64,
    },
    /// Run the retention manager, reading processed rounds from stdin (one per line)
    Run,
    /// Show what the round store currently retains
    Status,
}

fn load_config(path: &Path) -> Result<NodeConfig> {
    if path.exists() {
        NodeConfig::load(path).with_context(|| format!("loading {}", path.display()))
    } else {
        warn!(path = %path.display(), "config file not found, using defaults");
        Ok(NodeConfig::default())
    }
}

/// Forward one round per input line to `rounds` until the input ends or `stop`
/// resolves. Returns `true` when stopped. A full channel never delays `stop`.
pub async fn forward_rounds<R, F>(input: R, rounds: &mpsc::Sender<u64>, stop: F) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    let mut lines = input.lines();
    tokio::pin!(stop);

    loop {
        let round = tokio::select! {
            _ = &mut stop => return Ok(true),
            line = lines.next_line() => match line? {
                Some(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match line.parse::<u64>() {
                        Ok(round) => round,
                        Err(e) => {
                            warn!(input = line, error = %e, "ignoring malformed round");
                            continue;
                        }
                    }
                }
                None => return Ok(false),
            },
        };

        tokio::select! {
            _ = &mut stop => return Ok(true),
            sent = rounds.send(round) => {
                if sent.is_err() {
                    warn!(round, "retention manager stopped, round not forwarded");
                }
            }
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Cmd::Init => {
            let store = Node::new(cfg.clone()).open_store()?;
            println!("initialized {} round store at {}", store.name(), cfg.store.path);
            Ok(())
        }
        Cmd::Prune { round } => {
            let store = Node::new(cfg.clone()).open_store()?;
            let parent = CancellationToken::new();
            let manager = RetentionManager::new(&parent, cfg.retention.clone(), store.retention());
            let (tx, rx) = mpsc::channel(1);
            tx.send(round).await?;
            drop(tx);

            let done = manager.run(rx).await;
            println!(
                "exit: {:?}, rows deleted: {}, rows remaining: {}",
                done.exit,
                METRICS.counter(crate::utils::metrics::ROWS_DELETED),
                store.row_count()?
            );
            Ok(())
        }
        Cmd::Run => {
            let running = Node::new(cfg).start().await?;
            let rounds = running.round_sender();
            let interrupted = forward_rounds(BufReader::new(tokio::io::stdin()), &rounds, tokio::signal::ctrl_c()).await?;
            drop(rounds);

            if interrupted {
                info!("ctrl-c received, shutting down");
                let done = running.shutdown().await;
                info!(?done, "node stopped");
            } else {
                let done = running.finish().await;
                info!(?done, "input closed, node stopped");
            }
            Ok(())
        }
        Cmd::Status => {
            let store = Node::new(cfg.clone()).open_store()?;
            match store.round_bounds()? {
                Some((lo, hi)) => println!(
                    "{} rows, rounds {}..={} (window {}, interval {})",
                    store.row_count()?,
                    lo,
                    hi,
                    cfg.retention.rounds,
                    cfg.retention.interval
                ),
                None => println!("store is empty"),
            }
            Ok(())
        }
    }
}
