use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rublekurs::clock::SystemClock;
use rublekurs::config::{default_config_path, ResolvedConfig};
use rublekurs::duration::format_duration;
use rublekurs::rates::{AllRatesResponse, RateResolver, RateResponse};
use rublekurs::users::{migrate_legacy_users, JsonFileUserStore};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rublekurs")]
#[command(about = "Central Bank of Russia exchange rates with a small account API")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen port (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// USD and EUR rates, latest or for a date
    Rates {
        /// Date as YYYY-MM-DD
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Every currency quoted for a date (today by default)
    AllRates {
        /// Date as YYYY-MM-DD
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Import users from a legacy flat users.json
    MigrateUsers {
        /// Legacy users.json file
        file: PathBuf,
    },
    /// Show current configuration
    Config,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json_layer = json.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
    });
    let text_layer = (!json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn resolver(config: &ResolvedConfig) -> RateResolver {
    RateResolver::from_config(&config.cbr).with_clock(Arc::new(SystemClock::new(config.timezone)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?
        .with_env_overrides()?;

    match cli.command {
        Some(Command::Serve { port }) => {
            let mut config = config;
            if let Some(port) = port {
                config.server.port = port;
            }
            rublekurs::server::serve(&config).await?;
        }
        Some(Command::Rates { date }) => {
            let resolver = resolver(&config);
            let result = match date.as_deref() {
                Some(date) => resolver.resolve_by_date(date).await,
                None => resolver.resolve_latest().await,
            };
            println!("{}", serde_json::to_string_pretty(&RateResponse::from(&result))?);
        }
        Some(Command::AllRates { date }) => {
            let result = resolver(&config).resolve_all_by_date(date.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&AllRatesResponse::from(&result))?);
        }
        Some(Command::MigrateUsers { file }) => {
            let store = JsonFileUserStore::new(&config.data_dir);
            let clock = SystemClock::new(config.timezone);
            let report = migrate_legacy_users(&file, &store, &clock).await?;
            println!(
                "Migrated {} user(s), skipped {} into {}",
                report.migrated,
                report.skipped,
                config.data_dir.display()
            );
        }
        Some(Command::Config) => {
            println!("Config file: {}", cli.config.display());
            println!("Data directory: {}", config.data_dir.display());
            println!("Timezone: {}", config.timezone);
            println!("Listen address: {}", config.server.bind_addr());
            println!("SOAP endpoint: {}", config.cbr.soap_url);
            println!("XML_daily endpoint: {}", config.cbr.xml_daily_url);
            println!(
                "Request timeout: {}",
                format_duration(config.cbr.request_timeout)
            );
            match config.cbr.soap_timeout {
                Some(timeout) => println!("SOAP timeout: {}", format_duration(timeout)),
                None => println!("SOAP timeout: none"),
            }
        }
        None => {
            println!("rublekurs - CBR exchange rates");
            println!("==============================\n");
            println!("Config: {}", cli.config.display());
            println!("Data directory: {}\n", config.data_dir.display());
            println!("Commands:");
            println!("  serve          Run the HTTP server");
            println!("  rates          USD and EUR rates");
            println!("  all-rates      Every quoted currency");
            println!("  migrate-users  Import a legacy users.json");
            println!("  config         Show current configuration\n");
            println!("Run 'rublekurs --help' for more options.");
        }
    }

    Ok(())
}
