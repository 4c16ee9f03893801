use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::UtilityType;

#[derive(Debug, Parser)]
#[command(name = "rental-utilities")]
#[command(about = "Utility rates, meter readings and monthly bills for rental contracts")]
#[command(version)]
pub struct Cli {
    /// Load configuration from a TOML file
    #[arg(long, global = true, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Use a built-in preset (residential, flat, empty)
    #[arg(long, global = true)]
    pub preset: Option<String>,

    /// Override the configured server port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Price a consumption with the configured tariff
    Quote {
        /// Electric or Water
        utility_type: UtilityType,
        /// Units consumed (kWh or m3)
        #[arg(allow_negative_numbers = true, value_parser = clap::value_parser!(i64).range(0..))]
        units: i64,
    },
    /// Validate the configuration and print tariff coverage
    Check,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}
