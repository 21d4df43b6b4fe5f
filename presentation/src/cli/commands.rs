//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for protocol runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every committed outcome and every report decision
    Full,
    /// Only the final run summary
    Summary,
    /// JSON output
    Json,
}

impl From<OutputFormat> for reporting_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => reporting_domain::OutputFormat::Full,
            OutputFormat::Summary => reporting_domain::OutputFormat::Summary,
            OutputFormat::Json => reporting_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for oracle-reporting
#[derive(Parser, Debug)]
#[command(name = "oracle-reporting")]
#[command(author, version, about = "Round-based oracle reporting with Byzantine fault tolerance")]
#[command(long_about = r#"
Runs a reporting protocol instance of N oracles, up to F of them faulty,
in this process. Each round:

1. Query: the plugin builds a query for the next sequence number
2. Observation: every oracle observes; a quorum of valid observations is kept
3. Outcome: the quorum is folded into one outcome, chained to the previous one
4. Reports: reports derived from the outcome are attested by F+1 oracles,
   accepted and transmitted

Configuration files are loaded from (in priority order):
1. ORACLE_REPORTING_* environment variables
2. --config <path>          Explicit config file
3. ./reporting.toml         Project-level config
4. ~/.config/oracle-reporting/config.toml   Global config

Example:
  oracle-reporting --rounds 20
  oracle-reporting -n 7 -f 2 --silent 3 --byzantine 5 --output full
  oracle-reporting --rounds 0 --transmission-log reports.jsonl
  oracle-reporting --max-attempts 3
"#)]
pub struct Cli {
    /// Outcomes to commit before stopping (0 runs until Ctrl-C)
    #[arg(short, long, value_name = "COUNT")]
    pub rounds: Option<u64>,

    /// Attempts per sequence number before giving up (0 retries forever)
    #[arg(long, value_name = "COUNT")]
    pub max_attempts: Option<u32>,

    /// Number of oracles (overrides protocol.n)
    #[arg(short = 'n', long = "oracles", value_name = "N")]
    pub oracles: Option<usize>,

    /// Faulty oracles tolerated (overrides protocol.f)
    #[arg(short = 'f', long = "faults", value_name = "F")]
    pub faults: Option<usize>,

    /// Oracles that never answer (can be specified multiple times)
    #[arg(long, value_name = "INDEX")]
    pub silent: Vec<usize>,

    /// Oracles that send garbage observations (can be specified multiple times)
    #[arg(long, value_name = "INDEX")]
    pub byzantine: Vec<usize>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Append transmitted reports to this JSONL file
    #[arg(long, value_name = "PATH")]
    pub transmission_log: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
