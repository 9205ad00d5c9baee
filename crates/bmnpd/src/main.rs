//! bmnpd entry point.
//!
//! Runs one port lifecycle operation against the SDN controller:
//!
//! ```text
//! bmnpd --config /etc/bmnp/bmnpd.toml create --port-file port.json
//! bmnpd --base-url http://sdn:8080/api bind --port-file port.json
//! bmnpd set-isolation --port-file port.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bmnp_db::{MemoryStore, PortMappingStore, RedisStore};
use bmnp_types::{PortEnvelope, PortProvisioningRequest};
use bmnpd::config_file::DEFAULT_CONFIG_PATH;
use bmnpd::{
    PortIsolationDriver, PortLifecycleCoordinator, ProvisioningConfig, SnmpIsolationDriver,
    StoreBackend, UdpSnmpConnector,
};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Bare-metal network provisioning driver
#[derive(Parser, Debug)]
#[command(name = "bmnpd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// SDN controller base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the port on the controller and record its switch ports
    Create {
        /// JSON file holding the {"port": {...}} envelope
        #[arg(long)]
        port_file: PathBuf,
    },
    /// Bind the port into its segment
    Bind {
        #[arg(long)]
        port_file: PathBuf,
    },
    /// Update the locally recorded bind request flag
    Update {
        #[arg(long)]
        port_file: PathBuf,
    },
    /// Delete the port on the controller and its local records
    Delete {
        #[arg(long)]
        port_file: PathBuf,
    },
    /// Add the port to its segment's VLAN directly over SNMP
    SetIsolation {
        #[arg(long)]
        port_file: PathBuf,
    },
    /// Remove the port from its segment's VLAN over SNMP
    DeleteIsolation {
        #[arg(long)]
        port_file: PathBuf,

        /// Also destroy the VLAN (no other port uses it)
        #[arg(long)]
        last_port_vlan: bool,
    },
}

impl Command {
    fn port_file(&self) -> &Path {
        match self {
            Command::Create { port_file }
            | Command::Bind { port_file }
            | Command::Update { port_file }
            | Command::Delete { port_file }
            | Command::SetIsolation { port_file }
            | Command::DeleteIsolation { port_file, .. } => port_file,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        eprintln!("bmnpd: tracing subscriber already installed");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = ProvisioningConfig::load_or_default(&args.config)?;
    if let Some(base_url) = args.base_url {
        config.controller.base_url = base_url;
    }
    let request = read_port_file(args.command.port_file())?;

    match args.command {
        Command::SetIsolation { .. } => isolation_driver(&config)?.set_isolation(&request).await?,
        Command::DeleteIsolation { last_port_vlan, .. } => {
            isolation_driver(&config)?
                .delete_isolation(&request, last_port_vlan)
                .await?
        }
        command => run_lifecycle(command, &config, &request).await?,
    }

    Ok(())
}

async fn run_lifecycle(
    command: Command,
    config: &ProvisioningConfig,
    request: &PortProvisioningRequest,
) -> anyhow::Result<()> {
    config.validate()?;
    match &command {
        Command::Bind { .. } => config.database.require_persistent("bind")?,
        Command::Update { .. } => config.database.require_persistent("update")?,
        Command::Delete { .. } => config.database.require_persistent("delete")?,
        _ => {}
    }

    let store = open_store(config).await?;
    let coordinator = PortLifecycleCoordinator::from_config(&config.controller, store)?;

    match command {
        Command::Create { .. } => {
            let mapping = coordinator.create_port(request).await?;
            info!(
                "Port {} created ({} switch port(s))",
                mapping.port_id,
                mapping.switch_port_ids.len()
            );
        }
        Command::Bind { .. } => {
            let status = coordinator.bind_port_to_segment(request).await?;
            println!("{}", status);
        }
        Command::Update { .. } => coordinator.update_port(request).await?,
        Command::Delete { .. } => coordinator.delete_port(request).await?,
        Command::SetIsolation { .. } | Command::DeleteIsolation { .. } => {}
    }

    Ok(())
}

fn isolation_driver(config: &ProvisioningConfig) -> anyhow::Result<SnmpIsolationDriver> {
    config.snmp.validate()?;
    let connector = UdpSnmpConnector::from_config(&config.snmp);
    Ok(SnmpIsolationDriver::new(Arc::new(connector)))
}

async fn open_store(config: &ProvisioningConfig) -> anyhow::Result<Arc<dyn PortMappingStore>> {
    match config.database.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory mapping store; records are lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Redis => {
            let store = RedisStore::connect(config.database.redis_config()).await?;
            Ok(Arc::new(store))
        }
    }
}

fn read_port_file(path: &Path) -> anyhow::Result<PortProvisioningRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read port file {}", path.display()))?;
    let envelope: PortEnvelope = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse port file {}", path.display()))?;
    Ok(envelope.into())
}
