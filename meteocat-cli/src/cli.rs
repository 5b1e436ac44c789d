use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use meteocat_core::{
    Config, DEFAULT_PRECIPITATION_VARIABLE, DEFAULT_WIND_VARIABLES, MeteocatClient, StationFilter,
    collect_daily_wind_data, collect_rainfall,
};
use std::path::PathBuf;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteocat", version, about = "Download observation datasets from the Meteocat API")]
pub struct Cli {
    /// Logging level or filter directive (debug, info, warn, ...).
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the Meteocat API key in the local configuration.
    Configure,

    /// Download daily wind data as a CSV file.
    Wind {
        #[command(flatten)]
        shared: SharedArgs,

        /// Wind variable code to download (can be repeated, defaults to
        /// VV10m and DV10m).
        #[arg(long = "variable")]
        variables: Vec<String>,

        /// Output CSV path.
        #[arg(long, default_value = "data/wind_daily.csv")]
        output: PathBuf,
    },

    /// Download precipitation data as JSON aggregations.
    Rainfall {
        #[command(flatten)]
        shared: SharedArgs,

        /// Variable code to use for precipitation.
        #[arg(long, default_value = DEFAULT_PRECIPITATION_VARIABLE)]
        variable_code: String,

        /// Destination file where the JSON payload will be stored.
        #[arg(long)]
        output: PathBuf,
    },
}

/// Arguments shared by both dataset commands.
#[derive(Debug, Args)]
pub struct SharedArgs {
    /// Meteocat API key. Falls back to the METEOCAT_API_KEY environment
    /// variable, then to the stored configuration.
    #[arg(long, env = "METEOCAT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// ISO date (YYYY-MM-DD) for the first day to download. Defaults to the
    /// most recent 1st of August.
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// ISO date (YYYY-MM-DD) for the last day to download. Defaults to today.
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Station network to query.
    #[arg(long, default_value = "XEMA")]
    pub network: String,

    /// Optional status filter for the stations (e.g. operativa).
    #[arg(long)]
    pub station_status: Option<String>,
}

impl SharedArgs {
    fn station_filter(&self) -> StationFilter {
        StationFilter {
            network: Some(self.network.clone()),
            status: self.station_status.clone(),
        }
    }

    fn client(&self) -> Result<MeteocatClient> {
        let api_key = Config::load()?.resolve_api_key(self.api_key.clone())?;
        Ok(MeteocatClient::new(api_key))
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Wind { shared, variables, output } => {
                run_wind(shared, variables, output).await
            }
            Command::Rainfall { shared, variable_code, output } => {
                run_rainfall(shared, variable_code, output).await
            }
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("Meteocat API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key from prompt")?;

    config.set_api_key(api_key);
    config.save()?;

    println!("API key stored in {}", Config::config_file_path()?.display());
    Ok(())
}

async fn run_wind(shared: SharedArgs, variables: Vec<String>, output: PathBuf) -> Result<()> {
    let (start, end) = resolve_date_range(shared.start_date, shared.end_date)?;
    let client = shared.client()?;

    let variables = if variables.is_empty() {
        DEFAULT_WIND_VARIABLES.iter().map(|v| v.to_string()).collect()
    } else {
        variables
    };

    let rows =
        collect_daily_wind_data(&client, start, end, &variables, &shared.station_filter()).await?;

    output::write_csv(&output, &rows)?;
    Ok(())
}

async fn run_rainfall(shared: SharedArgs, variable_code: String, output: PathBuf) -> Result<()> {
    let (start, end) = resolve_date_range(shared.start_date, shared.end_date)?;
    let client = shared.client()?;

    let report =
        collect_rainfall(&client, start, end, &variable_code, &shared.station_filter()).await?;

    output::write_json(&output, &report)?;
    Ok(())
}

/// Apply the date defaults and reject an inverted range before any network
/// call is attempted.
fn resolve_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(NaiveDate, NaiveDate)> {
    let today = Local::now().date_naive();
    let start = start.unwrap_or_else(|| default_start_date(today));
    let end = end.unwrap_or(today);

    if start > end {
        bail!("start-date {start} must not be after end-date {end}");
    }
    Ok((start, end))
}

/// The most recent 1st of August on or before `today`.
fn default_start_date(today: NaiveDate) -> NaiveDate {
    let august_first = NaiveDate::from_ymd_opt(today.year(), 8, 1).unwrap_or(today);
    if today >= august_first {
        august_first
    } else {
        NaiveDate::from_ymd_opt(today.year() - 1, 8, 1).unwrap_or(today)
    }
}
