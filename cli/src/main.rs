//! CLI entrypoint for oracle-reporting
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use reporting_application::{
    NoProgress, PluginLifecycleManager, ReportPipeline, ReportTransmitter, RoundProgressNotifier,
    RunProtocolInput, RunProtocolUseCase, RunRoundUseCase,
};
use reporting_domain::{ConfigIssue, OracleId, OutcomeChain, OutputFormat, Severity};
use reporting_infrastructure::{
    ConfigLoader, FanoutTransmitter, FileConfig, InMemoryTransmitter, JsonlTransmitter,
    LocalAttestor, LocalOracleNetwork, MedianPluginFactory, MedianReportInfo, OracleBehavior,
};
use reporting_presentation::{
    Cli, ConsoleFormatter, OutputConfig, ProgressReporter, SimpleProgress,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };
    apply_overrides(&mut config, &cli);

    let output = OutputConfig::resolve(&cli, config.output.format, config.output.color);
    if !output.color {
        colored::control::set_override(false);
    }

    let issues = config.validate();
    report_issues(&issues);
    if ConfigIssue::has_errors(&issues) {
        bail!("Configuration has errors, refusing to start");
    }

    info!("Starting oracle-reporting");

    // === Dependency Injection ===
    let plugin_config = config.plugin_config();
    let factory = Arc::new(MedianPluginFactory::new(
        config.simulation.base_price,
        config.simulation.price_jitter,
    ));
    let manager = PluginLifecycleManager::new(factory, config.ceilings());
    let adapter = manager.activate(plugin_config.clone()).await?;

    let behaviors = behaviors(&config)?;
    let network = Arc::new(LocalOracleNetwork::build(
        &manager,
        &plugin_config,
        &behaviors,
        config.simulation.max_latency(),
    )?);

    let memory = Arc::new(InMemoryTransmitter::<MedianReportInfo>::new());
    let mut targets: Vec<Arc<dyn ReportTransmitter<MedianReportInfo>>> = vec![memory.clone()];
    if let Some(path) = &config.output.transmission_log {
        let log = JsonlTransmitter::open(path)
            .with_context(|| format!("Failed to open transmission log {}", path.display()))?;
        info!("Appending transmitted reports to {}", log.path().display());
        targets.push(Arc::new(log));
    }

    let chain = Arc::new(OutcomeChain::new());
    let round = RunRoundUseCase::new(
        adapter.clone(),
        network.clone(),
        chain.clone(),
        config.round_params(),
    );
    let pipeline = Arc::new(ReportPipeline::new(
        adapter,
        Arc::new(LocalAttestor::new(network.honest_oracles())),
        Arc::new(FanoutTransmitter::new(targets)),
    ));
    let use_case = RunProtocolUseCase::new(round, pipeline);

    // Ctrl-C stops the run after in-flight reports settle
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current round");
            interrupt.cancel();
        }
    });

    let input = match config.simulation.rounds {
        0 => RunProtocolInput::unbounded(),
        rounds => RunProtocolInput::rounds(rounds),
    };

    if output.show_progress {
        println!();
        println!(
            "{} N={} F={} digest={}",
            "oracle-reporting".cyan().bold(),
            plugin_config.n,
            plugin_config.f,
            plugin_config.config_digest
        );
        println!();
    }

    // Progress bars and log lines fight over the terminal
    let reporter = (output.show_progress && cli.verbose == 0)
        .then(|| ProgressReporter::new(input.max_rounds));
    let progress: &dyn RoundProgressNotifier = match &reporter {
        Some(reporter) => reporter,
        None if output.show_progress => &SimpleProgress,
        None => &NoProgress,
    };

    let result = use_case
        .execute_with_progress(input, progress, &cancel)
        .await;
    if let Some(reporter) = &reporter {
        reporter.finish();
    }

    network.close().await;
    if let Err(e) = manager.shutdown().await {
        warn!("Plugin shutdown failed: {}", e);
    }

    let summary = result?;
    info!(stored = memory.len(), "Run complete");

    let rendered = match output.format {
        OutputFormat::Full => ConsoleFormatter::format(&summary, &chain),
        OutputFormat::Summary => ConsoleFormatter::format_summary(&summary),
        OutputFormat::Json => ConsoleFormatter::format_json(&summary, &chain),
    };
    println!("{}", rendered);

    Ok(())
}

/// CLI flags take precedence over every configuration source.
fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(n) = cli.oracles {
        config.protocol.n = n;
    }
    if let Some(f) = cli.faults {
        config.protocol.f = f;
    }
    if let Some(rounds) = cli.rounds {
        config.simulation.rounds = rounds;
    }
    if let Some(max) = cli.max_attempts {
        config.simulation.max_attempts_per_seqnr = Some(max);
    }
    if !cli.silent.is_empty() {
        config.simulation.silent_oracles = cli.silent.clone();
    }
    if !cli.byzantine.is_empty() {
        config.simulation.byzantine_oracles = cli.byzantine.clone();
    }
    if let Some(path) = &cli.transmission_log {
        config.output.transmission_log = Some(path.clone());
    }
}

/// Byzantine oracles alternate between garbage and oversized observations.
fn behaviors(config: &FileConfig) -> Result<HashMap<OracleId, OracleBehavior>> {
    let mut behaviors = HashMap::new();
    for (i, index) in config.simulation.byzantine_oracles.iter().enumerate() {
        let behavior = if i % 2 == 0 {
            OracleBehavior::Garbage
        } else {
            OracleBehavior::Oversized
        };
        behaviors.insert(OracleId::try_from(*index)?, behavior);
    }
    for index in &config.simulation.silent_oracles {
        behaviors.insert(OracleId::try_from(*index)?, OracleBehavior::Silent);
    }
    Ok(behaviors)
}

fn report_issues(issues: &[ConfigIssue]) {
    for issue in issues {
        match issue.severity {
            Severity::Error => eprintln!("{} {}", "error:".red().bold(), issue.message),
            Severity::Warning => eprintln!("{} {}", "warning:".yellow().bold(), issue.message),
        }
    }
}
