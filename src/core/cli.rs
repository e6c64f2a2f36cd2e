use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// All relative paths will be interpreted relative to this directory.
    /// All child processes will be run in this directory.
    #[arg(long, global = true)]
    pub cwd: Option<String>,

    /// Path to the config file (defaults to the nearest covtrail.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Logging level (overrides config). One of: trace, debug, info, warn, error
    #[arg(long = "log.level", global = true)]
    pub log_level: Option<String>,

    /// Logging color control: "on" to force colors, "off" to disable; omit for auto
    #[arg(long = "log.color", global = true)]
    pub log_color: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a workspace with an example config
    Init,

    /// Build edge-coverage time series by replaying each corpus through the coverage tool
    Edges(AnalysisArgs),

    /// Build crash time series from the crash directories
    Crashes(AnalysisArgs),

    /// Build real-path time series by re-executing corpus entries
    Paths(AnalysisArgs),

    /// Print information about the configuration and targets
    Print {
        #[command(subcommand)]
        command: PrintArgs,
    },
}

/// Arguments shared by the analysis commands
#[derive(Parser, Debug)]
pub struct AnalysisArgs {
    /// Analyze only the named targets (default: all configured targets)
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Directory the series files and summary are written to.
    /// Replaces config output_dir if provided.
    #[arg(long = "output-dir")]
    pub output_dir: Option<String>,

    /// Time bin width: second, minute or hour.
    /// Replaces config [series].bucket if provided.
    #[arg(long)]
    pub bucket: Option<String>,

    /// Campaign span in hours; every series is padded out to this length.
    /// Replaces config [series].max_span_hours if provided.
    #[arg(long = "max-span-hours")]
    pub max_span_hours: Option<u32>,
}

/// Arguments for the print command
#[derive(Subcommand, Debug)]
pub enum PrintArgs {
    /// Print the effective global configuration
    Config(PrintConfigArgs),

    /// List configured targets and what can be resolved for them
    Targets(PrintTargetsArgs),
}

/// Arguments for the print config subcommand
#[derive(Parser, Debug)]
pub struct PrintConfigArgs {
    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}

/// Arguments for the print targets subcommand
#[derive(Parser, Debug)]
pub struct PrintTargetsArgs {
    /// Output format: "table" (default) or "json"
    #[arg(long, default_value = "table")]
    pub format: String,
}
