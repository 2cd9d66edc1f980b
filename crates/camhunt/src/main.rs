//! CamHunt command-line entry point.
//!
//! Finds XM cameras on the local segment and pushes new network settings to
//! them, driven by the textual commands of
//! [`CommandBridge`](camhunt::infrastructure::command_bridge::CommandBridge).
//!
//! # Usage
//!
//! ```text
//! camhunt [OPTIONS] [COMMANDS]...
//!
//! Options:
//!   --config <PATH>      Config file [env: CAMHUNT_CONFIG]
//!   -i, --interface <IF> Extra discovery interface, repeatable
//!   -q, --quiet          Only log errors
//! ```
//!
//! Commands given on the command line are joined with spaces and run as one
//! `;`-separated script:
//!
//! ```text
//! camhunt search; csv cameras.csv
//! camhunt "config 00:12:34:56:78:9a 192.168.1.50 255.255.255.0 192.168.1.1 secret"
//! ```
//!
//! Without commands an interactive prompt reads one script per line.
//!
//! # Threads
//!
//! Sockets and stdin are blocking, so the whole session runs on a
//! `spawn_blocking` worker.  The async side only waits for that worker or for
//! Ctrl-C, whichever comes first.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use camhunt::infrastructure::command_bridge::{CommandBridge, CommandError, Flow};
use camhunt::infrastructure::network::UdpChannelProvider;
use camhunt::infrastructure::storage::config::{self, AppConfig};

/// Exit status used when the session is interrupted with Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

const BANNER: &str = "Type help or ? to display help(q or quit to exit)";
const PROMPT: &str = "> ";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Finds XM network cameras and changes their network settings.
#[derive(Debug, Parser)]
#[command(
    name = "camhunt",
    about = "Discovery and network configuration for XM IP cameras",
    version
)]
struct Cli {
    /// Configuration file to load instead of the platform default.
    #[arg(long, env = "CAMHUNT_CONFIG")]
    config: Option<PathBuf>,

    /// Interface discovery may use.  Repeat for several; added to the list
    /// from the config file.
    #[arg(short = 'i', long = "interface")]
    interfaces: Vec<String>,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,

    /// Commands to run, separated by `;`.  Starts a prompt when empty.
    #[arg(trailing_var_arg = true)]
    commands: Vec<String>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => config::load_config().context("failed to load config")?,
        };
        for name in &self.interfaces {
            if !cfg.network.interfaces.contains(name) {
                cfg.network.interfaces.push(name.clone());
            }
        }
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.load_config()?;

    // `-q` wins over everything; otherwise `RUST_LOG` wins over the file.
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&cfg.general.log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    info!(
        port = cfg.network.port,
        interfaces = ?cfg.network.interfaces,
        "CamHunt starting"
    );

    let script = (!cli.commands.is_empty()).then(|| cli.commands.join(" "));
    let session = tokio::task::spawn_blocking(move || {
        let mut bridge = CommandBridge::new(&cfg, Box::new(UdpChannelProvider));
        match script {
            Some(script) => {
                bridge.run_script(&script, print_result);
                Ok(())
            }
            None => run_prompt(&mut bridge),
        }
    });

    tokio::select! {
        joined = session => {
            joined
                .context("command session panicked")?
                .context("failed to read commands from stdin")?;
        }
        _ = tokio::signal::ctrl_c() => {
            // The blocking worker may be parked in a stdin read that cannot be
            // cancelled, so leave without waiting for it.
            info!("interrupted");
            std::process::exit(EXIT_INTERRUPTED);
        }
    }

    info!("CamHunt stopped");
    Ok(())
}

// ── Session helpers ───────────────────────────────────────────────────────────

/// Reads scripts from stdin until end of input or a quit command.
fn run_prompt(bridge: &mut CommandBridge) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(stdout, "{BANNER}")?;

    let mut line = String::new();
    loop {
        write!(stdout, "{PROMPT}")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(());
        }
        if bridge.run_script(&line, print_result) == Flow::Quit {
            return Ok(());
        }
    }
}

fn print_result(result: Result<String, CommandError>) {
    match result {
        Ok(text) if text.is_empty() => {}
        Ok(text) if text.ends_with('\n') => print!("{text}"),
        Ok(text) => println!("{text}"),
        Err(e) => error!("{e}"),
    }
}
