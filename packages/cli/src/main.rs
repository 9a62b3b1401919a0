use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use peerlink::script::ScriptOptions;
use peerlink_cli::CliError;
use tracing_subscriber::EnvFilter;

/// peerlink - run sandboxed Lua scripts against a local peer
#[derive(Parser, Debug)]
#[command(name = "peerlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a script file once
    Run {
        script: PathBuf,

        #[command(flatten)]
        peer: PeerArgs,

        /// Milliseconds to keep running after the script, for callbacks
        #[arg(long, default_value_t = 0)]
        wait: u64,
    },
    /// Start an interactive session
    Repl {
        #[command(flatten)]
        peer: PeerArgs,

        /// Force vi editing mode
        #[arg(long)]
        vi: bool,
    },
}

#[derive(Args, Debug)]
struct PeerArgs {
    /// JSON object tree the peer exposes
    #[arg(long)]
    objects: Option<PathBuf>,

    /// Run scripts synchronously; remote capabilities then fail
    #[arg(long)]
    sync: bool,

    /// Shadow the `runtime` and `browser` identifiers
    #[arg(long)]
    hide_host: bool,

    /// Never pass Lua functions to the peer as callbacks
    #[arg(long)]
    no_callbacks: bool,
}

impl PeerArgs {
    fn options(&self) -> ScriptOptions {
        ScriptOptions {
            is_async: !self.sync,
            hide_host_identifiers: self.hide_host,
            allow_callback_arguments: !self.no_callbacks,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        if !matches!(e, CliError::ScriptFailed) {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> peerlink_cli::Result<()> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::Io(e.to_string()))?;
    match cli.command {
        Command::Run { script, peer, wait } => {
            let objects = peerlink_cli::load_objects(peer.objects.as_deref())?;
            runtime.block_on(peerlink_cli::run_script(
                &script,
                objects,
                peer.options(),
                Duration::from_millis(wait),
            ))
        }
        Command::Repl { peer, vi } => {
            let objects = peerlink_cli::load_objects(peer.objects.as_deref())?;
            peerlink_cli::run_repl(&runtime, objects, peer.options(), vi)
        }
    }
}
