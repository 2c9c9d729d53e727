use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::{Error, Result};
use crate::models::{
    AppConfig, SimulationDefaults, SimulationParameters, DEFAULT_ARRIVAL_RATE, DEFAULT_HOURS,
    DEFAULT_SERVERS, DEFAULT_SERVICE_RATE,
};
use crate::roster::SolveOptions;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Parser, Debug)]
#[command(
    name = "mediflow",
    version,
    about = "Clinic patient-flow simulator and staff roster optimiser"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the M/M/c queue simulation and classify the load.
    Simulate(SimulateArgs),
    /// Find the cheapest staff roster that covers every shift.
    Optimize(OptimizeArgs),
    /// Check a roster configuration for reasons it cannot be staffed.
    Analyze(AnalyzeArgs),
    /// Print the configuration after defaults are applied.
    ShowConfig(ShowConfigArgs),
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Patient arrivals per hour.
    #[arg(long)]
    pub arrival_rate: Option<f64>,
    /// Patients one staff member serves per hour.
    #[arg(long)]
    pub service_rate: Option<f64>,
    #[arg(long)]
    pub servers: Option<u32>,
    #[arg(long)]
    pub hours: Option<f64>,
    #[arg(long, help = "Seed the random stream; omit for a fresh run each time")]
    pub seed: Option<u64>,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
    /// Also write the report as JSON to this file.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OptimizeArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
}

#[derive(Args, Debug)]
pub struct ShowConfigArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
}

pub fn parse_args() -> Result<Cli> {
    match Cli::try_parse() {
        Ok(cli) => Ok(cli),
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => Err(Error::Cli(err.to_string())),
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    let config: AppConfig = match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err)))?,
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err)))?,
        "" => return Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => return Err(Error::UnsupportedConfigFormat(ext.to_string())),
    };
    log::debug!(
        "loaded config '{}' ({} staff, {} shifts)",
        path.display(),
        config.optimiser.staff.len(),
        config.optimiser.shift_requirements.len()
    );
    Ok(config)
}

/// Built-in configuration when no file is given.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(AppConfig::default()),
    }
}

/// Flags win over the `[simulator]` section, which wins over built-in
/// defaults.
pub fn simulation_parameters(
    args: &SimulateArgs,
    defaults: &SimulationDefaults,
) -> Result<SimulationParameters> {
    SimulationParameters::new(
        args.arrival_rate
            .or(defaults.arrival_rate)
            .unwrap_or(DEFAULT_ARRIVAL_RATE),
        args.service_rate
            .or(defaults.service_rate)
            .unwrap_or(DEFAULT_SERVICE_RATE),
        args.servers.or(defaults.servers).unwrap_or(DEFAULT_SERVERS),
        args.hours.or(defaults.hours).unwrap_or(DEFAULT_HOURS),
        args.seed.or(defaults.seed),
    )
}

pub fn solve_options(args: &OptimizeArgs) -> SolveOptions {
    SolveOptions::with_timeout(Duration::from_millis(args.timeout_ms))
}
