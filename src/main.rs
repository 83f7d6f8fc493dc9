use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use tabled::{Table, Tabled};

use heatzy::client::DEFAULT_BASE_URL;
use heatzy::config::default_config_path;
use heatzy::{ConfigFile, Credentials, HeatingState, HeatzyClient, Registry};

#[derive(Parser)]
#[command(name = "heatzy")]
#[command(about = "A CLI for controlling Heatzy pilot-wire heating controllers")]
#[command(version)]
struct Cli {
    /// Path to the configuration file (defaults to ~/.heatzy.conf)
    #[arg(long, env = "HEATZY_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Heatzy account login, overriding the stored one
    #[arg(long, env = "HEATZY_LOGIN", global = true)]
    login: Option<String>,

    /// Heatzy account password, overriding the stored one
    #[arg(long, env = "HEATZY_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    /// Echo requests and raw cloud responses
    #[arg(long, short, global = true)]
    debug: bool,

    #[arg(long, env = "HEATZY_API_URL", default_value = DEFAULT_BASE_URL, hide = true)]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the heating states a device can be set to
    States,
    /// List the devices in the local registry
    List,
    /// Rebuild the local registry from the devices bound to the account
    Sync,
    /// Show the current heating state of a device
    GetState {
        /// Device identifier
        did: String,
    },
    /// Show the MAC address of a device
    GetMac {
        /// Device identifier
        did: String,
    },
    /// Show the alias of a device
    GetAlias {
        /// Device identifier
        did: String,
    },
    /// Show the product family of a device
    GetProduct {
        /// Device identifier
        did: String,
    },
    /// Set the heating state of a device
    SetState {
        /// Device identifier
        did: String,
        /// One of off, comfort, eco, freeze
        state: HeatingState,
    },
    /// Store account credentials and check them against the cloud
    /// (prompts for --login/--password when not provided)
    Login,
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    did: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Alias")]
    alias: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match cli.config {
        Some(path) => ConfigFile::new(path),
        None => ConfigFile::new(default_config_path()?),
    };
    debug!("Using configuration file: {}", config.path().display());

    match cli.command {
        Commands::States => {
            for state in HeatingState::ALL {
                println!("{}", state);
            }
        }
        Commands::List => {
            let registry = Registry::load(&config)?;
            if registry.is_empty() {
                println!("No devices known. Run 'heatzy sync' first.");
                return Ok(());
            }

            let rows: Vec<DeviceRow> = registry
                .devices()
                .iter()
                .map(|device| DeviceRow {
                    did: device.did.clone(),
                    product: device.product.clone(),
                    mac: device.mac.clone(),
                    alias: device.alias.clone(),
                })
                .collect();
            println!("{}", Table::new(&rows));
        }
        Commands::Sync => {
            let credentials = Credentials::load(&config, cli.login, cli.password)?;
            let mut client = HeatzyClient::new_with_base_url(credentials, config, cli.api_url);

            info!("Fetching device list...");
            for did in client.sync_devices().await? {
                println!("{}", did);
            }
        }
        Commands::GetState { did } => {
            let device = Registry::load(&config)?.lookup(&did)?.clone();
            let credentials = Credentials::load(&config, cli.login, cli.password)?;
            let mut client = HeatzyClient::new_with_base_url(credentials, config, cli.api_url);

            println!("{}", client.get_state(&device).await?);
        }
        Commands::GetMac { did } => {
            let registry = Registry::load(&config)?;
            println!("{}", registry.lookup(&did)?.mac);
        }
        Commands::GetAlias { did } => {
            let registry = Registry::load(&config)?;
            println!("{}", registry.lookup(&did)?.alias);
        }
        Commands::GetProduct { did } => {
            let registry = Registry::load(&config)?;
            println!("{}", registry.lookup(&did)?.product);
        }
        Commands::SetState { did, state } => {
            let device = Registry::load(&config)?.lookup(&did)?.clone();
            let credentials = Credentials::load(&config, cli.login, cli.password)?;
            let mut client = HeatzyClient::new_with_base_url(credentials, config, cli.api_url);

            println!("{}", client.set_state(&device, state).await?);
        }
        Commands::Login => {
            let login = match cli.login {
                Some(login) => login,
                None => prompt("Login: ")?,
            };
            let password = match cli.password {
                Some(password) => password,
                None => rpassword::prompt_password("Password: ")
                    .context("Failed to read password")?,
            };

            let credentials = Credentials::load(&config, Some(login), Some(password))?;
            let mut client = HeatzyClient::new_with_base_url(credentials, config, cli.api_url);
            client.authenticate().await?;

            let session = client.session();
            println!(
                "Logged in as {} (token valid until {}).",
                session.credentials().login,
                session.credentials().expiry.as_deref().unwrap_or("unknown")
            );
        }
    }

    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;

    print!("{}", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line.trim().to_string())
}
