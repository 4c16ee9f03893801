//! Rental utilities entry point: CLI wiring and config-driven store setup.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use rental_utilities::billing::{CoverageStatus, RateTable};
use rental_utilities::cli::{Cli, Command};
use rental_utilities::config::AppConfig;
use rental_utilities::domain::UtilityType;
use rental_utilities::observability;
use rental_utilities::store::Store;

/// Resolves the config: `--config` takes priority, then `--preset`, then
/// the residential default. `--port` is applied last.
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if let Some(path) = &cli.config {
        AppConfig::from_toml_file(path)?
    } else if let Some(name) = &cli.preset {
        AppConfig::from_preset(name)?
    } else {
        AppConfig::residential()
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn print_quote(store: &Store, currency: &str, utility_type: UtilityType, units: i64) -> Result<()> {
    anyhow::ensure!(units >= 0, "units must be >= 0");
    let rates = RateTable::for_type(utility_type, store.rates_of(utility_type));
    let table = rates.ensure_billable()?;
    let charges = table.split(units)?;
    let total = table.quote(units)?;
    let unit = utility_type.unit();

    println!("--- {utility_type} quote for {units} {unit} ---");
    for c in charges {
        println!(
            "Tier {:<2} [{}, {})  {:>6} {unit} x {:>8} = {}",
            c.tier, c.from, c.to, c.units, c.price, c.amount
        );
    }
    println!("Total: {total} {currency}");
    Ok(())
}

fn print_coverage(store: &Store) {
    println!("--- Tariff coverage ---");
    for utility_type in UtilityType::ALL {
        let coverage = RateTable::for_type(utility_type, store.rates_of(utility_type)).coverage();
        let status = match coverage.status {
            CoverageStatus::Tiered => "tiered",
            CoverageStatus::Flat => "flat (no rates, reading totals are billed)",
            CoverageStatus::Blocked => "BLOCKED",
        };
        println!("{utility_type:<9} {} tiers, {status}", coverage.tier_count);
        if coverage.status == CoverageStatus::Blocked {
            for issue in &coverage.issues {
                println!("  - {issue}");
            }
        }
    }
}

#[cfg(feature = "api")]
fn serve(config: AppConfig, store: Store) -> Result<()> {
    use std::net::{IpAddr, SocketAddr};
    use std::sync::Arc;

    use rental_utilities::api::{self, AppState};

    let ip: IpAddr = config
        .server
        .bind_addr
        .parse()
        .context("invalid server.bind_addr")?;
    let addr = SocketAddr::new(ip, config.server.port);
    let state = Arc::new(AppState::new(config, store));
    let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    rt.block_on(api::serve(state, addr))
        .with_context(|| format!("API server on {addr} failed"))
}

#[cfg(not(feature = "api"))]
fn serve(_config: AppConfig, _store: Store) -> Result<()> {
    anyhow::bail!("built without the `api` feature; use the `quote` or `check` commands")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing();

    let config = load_config(&cli)?;
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let store = Store::with_rates(config.tariff.rates.clone()).context("failed to seed tariff")?;
    tracing::info!(rates = store.rates().count(), "tariff loaded");

    match cli.command() {
        Command::Serve => serve(config, store),
        Command::Quote { utility_type, units } => {
            print_quote(&store, &config.billing.currency, utility_type, units)
        }
        Command::Check => {
            print_coverage(&store);
            println!("Configuration OK");
            Ok(())
        }
    }
}
