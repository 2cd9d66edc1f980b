//! Textual command dispatcher.
//!
//! [`CommandBridge`] is the only piece of the crate that speaks in strings.
//! It owns the [`DeviceRegistry`] for the whole session and translates each
//! command line into a call on the discovery or configuration service, then
//! renders the result as text.
//!
//! # Commands
//!
//! | Command                                  | Result                              |
//! |------------------------------------------|-------------------------------------|
//! | `help`, `?`                              | usage text                          |
//! | `echo TEXT`                              | `TEXT`                              |
//! | `search [xm]`                            | `Found N devices` and the table     |
//! | `table`, `csv`, `html`, `json` `[PATH]`  | rendering, or written to `PATH`     |
//! | `device MAC`                             | one record as JSON                  |
//! | `config MAC IP MASK GATE PASSWORD`       | result code description             |
//! | `suggest [IP]`                           | proposed settings for a new camera  |
//! | `clear`                                  | empties the registry                |
//! | `q`, `quit`                              | ends the session                    |
//!
//! Command names are case-insensitive.  Arguments are whitespace-separated
//! and several commands can be chained with `;` (see
//! [`CommandBridge::run_script`]).

pub mod export;

use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use camhunt_core::{suggest_network, AddressError, Brand, NetworkSettings, PackedIpv4};
use thiserror::Error;
use tracing::{debug, info};

use crate::application::configure_device::{ConfigurationService, ConfigureError};
use crate::application::discover_devices::{select_interface, DiscoveryError, DiscoveryService};
use crate::application::manage_devices::DeviceRegistry;
use crate::application::ChannelProvider;
use crate::infrastructure::storage::config::AppConfig;

use export::ExportFormat;

/// Usage text returned by `help`.
pub const HELP: &str = "\
Usage: camhunt [-q] [-i IFACE]... [--config PATH] [Command];[Command];...
    -q                  Errors only
    -i IFACE            Also allow IFACE for discovery (repeatable)
    Command             Description

    help                This help
    echo TEXT           Just echo
    search [brand]      Search devices of [brand] or all
    table [PATH]        Table of devices
    csv [PATH]          CSV of devices
    html [PATH]         HTML table of devices
    json [PATH]         JSON string of devices
    device [MAC]        JSON string of [MAC]
    config [MAC] [IP] [MASK] [GATE] [Password]   Configure a searched device
    suggest [IP]        Proposed settings for a camera next to IP
    clear               Forget all devices
    q, quit             Exit
";

const DEVICE_USAGE: &str = "device [MAC]";
const CONFIG_USAGE: &str = "config [MAC] [IP] [MASK] [GATE] [Password]";
const SEARCH_USAGE: &str = "search [xm]";

// ── Errors ────────────────────────────────────────────────────────────────────

/// A command that could not be carried out.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Configure(#[from] ConfigureError),

    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("failed to write export to {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not determine the local address: {0}")]
    LocalAddress(#[source] io::Error),

    #[error("unknown command '{0}', type help for a list")]
    Unknown(String),
}

// ── Output types ──────────────────────────────────────────────────────────────

/// What a single command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Text to show the operator.  May be empty.
    Text(String),
    /// The operator asked to end the session.
    Quit,
}

/// Whether a script should keep the session alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// Session state plus the services commands are dispatched to.
pub struct CommandBridge {
    registry: DeviceRegistry,
    discovery: DiscoveryService,
    configuration: ConfigurationService,
    provider: Box<dyn ChannelProvider>,
}

impl CommandBridge {
    /// Creates a bridge with an empty registry.
    pub fn new(config: &AppConfig, provider: Box<dyn ChannelProvider>) -> Self {
        Self {
            registry: DeviceRegistry::new(),
            discovery: DiscoveryService::new(config.discovery_options()),
            configuration: ConfigurationService::new(config.configure_options()),
            provider,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Runs every `;`-separated command of `script` in order.
    ///
    /// Each command's result goes to `on_result`; a failing command does not
    /// stop the script.  Blank commands are skipped.  Returns
    /// [`Flow::Quit`] as soon as a `quit` command runs, leaving the rest of
    /// the script unexecuted.
    pub fn run_script<F>(&mut self, script: &str, mut on_result: F) -> Flow
    where
        F: FnMut(Result<String, CommandError>),
    {
        for command in script.split(';') {
            if command.trim().is_empty() {
                continue;
            }
            match self.execute(command) {
                Ok(CommandOutput::Quit) => return Flow::Quit,
                Ok(CommandOutput::Text(text)) => on_result(Ok(text)),
                Err(e) => on_result(Err(e)),
            }
        }
        Flow::Continue
    }

    /// Executes a single command line.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Unknown`] for unrecognised command names and
    /// the underlying service or I/O error otherwise.  Wrong argument counts
    /// are not errors; they produce the command's usage string.
    pub fn execute(&mut self, command: &str) -> Result<CommandOutput, CommandError> {
        let args: Vec<&str> = command.split_whitespace().collect();
        let Some((name, rest)) = args.split_first() else {
            return Ok(CommandOutput::Text(String::new()));
        };
        let name = name.to_ascii_lowercase();
        debug!(command = %name, args = rest.len(), "executing command");

        let text = match name.as_str() {
            "q" | "quit" => return Ok(CommandOutput::Quit),
            "help" | "?" => HELP.to_string(),
            "echo" => rest.join(" "),
            "search" => self.search(rest)?,
            "table" | "csv" | "html" | "json" => {
                let format: ExportFormat = name
                    .parse()
                    .map_err(|()| CommandError::Unknown(name.clone()))?;
                self.export(format, rest.first().copied())?
            }
            "device" => self.device(rest)?,
            "config" => self.config(rest)?,
            "suggest" => self.suggest(rest)?,
            "clear" => {
                self.registry.clear();
                info!("device registry cleared");
                String::new()
            }
            _ => return Err(CommandError::Unknown(name)),
        };
        Ok(CommandOutput::Text(text))
    }

    // ── Command handlers ──────────────────────────────────────────────────────

    fn search(&mut self, args: &[&str]) -> Result<String, CommandError> {
        if let Some(brand) = args.first() {
            if !brand.eq_ignore_ascii_case(Brand::Xm.as_str()) {
                return Ok(SEARCH_USAGE.to_string());
            }
        }

        self.discovery.discover(self.provider.as_ref(), &mut self.registry)?;
        let mut out = format!("Found {} devices\n", self.registry.len());
        if !self.registry.is_empty() {
            out.push_str(&export::render_table(&self.registry.all()));
        }
        Ok(out)
    }

    fn export(&self, format: ExportFormat, path: Option<&str>) -> Result<String, CommandError> {
        let rendered = export::render(format, &self.registry.all())?;
        let Some(path) = path else {
            return Ok(rendered);
        };

        let path = PathBuf::from(path);
        fs::write(&path, rendered.as_bytes()).map_err(|source| CommandError::Export {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), devices = self.registry.len(), "export written");
        Ok(format!("Wrote {} devices to {}", self.registry.len(), path.display()))
    }

    fn device(&self, args: &[&str]) -> Result<String, CommandError> {
        match args.first().and_then(|mac| self.registry.get(mac)) {
            Some(record) => Ok(serde_json::to_string(record)?),
            None => Ok(DEVICE_USAGE.to_string()),
        }
    }

    fn config(&mut self, args: &[&str]) -> Result<String, CommandError> {
        let [mac, ip, mask, gate, password] = *args else {
            return Ok(CONFIG_USAGE.to_string());
        };
        if self.registry.get(mac).is_none() {
            return Ok(CONFIG_USAGE.to_string());
        }

        let settings = NetworkSettings::parse(ip, mask, gate)?;
        let outcome = self.configuration.configure(
            self.provider.as_ref(),
            &mut self.registry,
            mac,
            &settings,
            password,
        )?;
        Ok(outcome.to_string())
    }

    fn suggest(&self, args: &[&str]) -> Result<String, CommandError> {
        let local = match args.first() {
            Some(ip) => PackedIpv4::parse_dotted(ip)?.to_ipv4(),
            None => self.default_local_address()?,
        };
        let settings = suggest_network(local);
        Ok(format!(
            "{} {} {}",
            settings.host_ip, settings.subnet_mask, settings.gateway
        ))
    }

    /// The selected interface's address, or the routed local address when no
    /// interface is selected or it has no IPv4 address.
    fn default_local_address(&self) -> Result<Ipv4Addr, CommandError> {
        let allow = &self.discovery.options().interfaces;
        if let Ok(detected) = self.provider.interfaces() {
            if let Ok(Some(iface)) = select_interface(allow, &detected) {
                if let Some(ipv4) = iface.ipv4 {
                    return Ok(ipv4);
                }
            }
        }
        self.provider.local_address().map_err(CommandError::LocalAddress)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
