//! bandcheck - command-line entry point
//!
//! Reads one JSON analysis input document, runs the active verification
//! modules and writes the JSON report to stdout or `--output`.
//!
//! Logging goes to stderr (or the configured log file) so stdout carries
//! only the report.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use bandcheck::knowledge::{KnowledgeBaseContext, Severity};
use bandcheck::{AnalysisInput, AnalysisReport, AnalysisRun, ModuleRegistry};
use bandcheck_common::config::{ConfigResolver, TomlConfig};
use bandcheck_common::time::report_file_name;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for bandcheck
#[derive(Parser, Debug)]
#[command(name = "bandcheck")]
#[command(about = "Verify modem band and CA/DC combo configuration consistency")]
#[command(version)]
struct Args {
    /// Analysis input document (JSON)
    input: PathBuf,

    /// Config file (overrides BANDCHECK_CONFIG and the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Knowledge-base document (JSON)
    #[arg(long, env = "BANDCHECK_KB")]
    kb: Option<PathBuf>,

    /// Active region for knowledge-base restrictions (e.g. NA, EMEA, APAC)
    #[arg(long, env = "BANDCHECK_REGION")]
    region: Option<String>,

    /// Active carrier whose requirements apply
    #[arg(long, env = "BANDCHECK_CARRIER")]
    carrier: Option<String>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,

    /// Write the report to this file (or a timestamped file in this directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config_path, config) = load_config(args.config.clone());

    init_tracing(&config)?;

    info!(
        "Starting bandcheck v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("No config file found, using compiled defaults"),
    }

    let input = AnalysisInput::load(&args.input)
        .with_context(|| format!("Failed to read input {}", args.input.display()))?;

    let kb = load_knowledge_base(&args, &config)?;
    let registry = ModuleRegistry::standard();

    let report = AnalysisRun::new(input, kb)
        .context("Cannot start analysis")?
        .execute(&registry)
        .context("Analysis failed")?;

    log_summary(&report);
    write_report(&report, args.pretty || config.report.pretty, args.output.as_deref())
}

/// Resolve and load the config file, degrading to defaults
///
/// Runs before the configured subscriber exists, so load warnings go to a
/// temporary stderr subscriber.
fn load_config(cli_path: Option<PathBuf>) -> (Option<PathBuf>, TomlConfig) {
    let path = ConfigResolver::new(cli_path).resolve();
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || {
        TomlConfig::load_or_default(path.as_deref())
    });
    (path, config)
}

fn init_tracing(config: &TomlConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));

    match &config.logging.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Knowledge base from `--kb` or the config file, with region/carrier overrides
///
/// Priority for region and carrier: command line, then the knowledge-base
/// document, then the config file.
fn load_knowledge_base(args: &Args, config: &TomlConfig) -> Result<KnowledgeBaseContext> {
    let mut kb = match args.kb.as_ref().or(config.knowledge_base.as_ref()) {
        Some(path) => {
            let kb = KnowledgeBaseContext::load(path)
                .with_context(|| format!("Failed to load knowledge base {}", path.display()))?;
            info!("Knowledge base: {}", path.display());
            kb
        }
        None => {
            info!("No knowledge base supplied, heuristics only");
            KnowledgeBaseContext::new()
        }
    };

    let region = args
        .region
        .clone()
        .or_else(|| kb.active_region().map(str::to_string))
        .or_else(|| config.region.clone());
    let carrier = args
        .carrier
        .clone()
        .or_else(|| kb.active_carrier().map(str::to_string))
        .or_else(|| config.carrier.clone());
    kb.set_active_region(region);
    kb.set_active_carrier(carrier);

    Ok(kb)
}

fn log_summary(report: &AnalysisReport) {
    if let Some(bands) = &report.bands {
        for (rat, summary) in bands.summary.iter().filter(|(_, s)| s.total > 0) {
            info!(
                "{}: {} bands, {} enabled, {} filtered, {} anomalies",
                rat, summary.total, summary.enabled, summary.filtered, summary.anomalies
            );
        }
    }

    let Some(combos) = &report.combos else {
        return;
    };
    for severity in Severity::TRIAGE_ORDER {
        if let Some(count) = combos.severity_counts.get(&severity) {
            info!("{} discrepancies: {}", severity, count);
        }
    }

    let mut by_reason: BTreeMap<&str, usize> = BTreeMap::new();
    for discrepancy in &combos.discrepancies {
        let label = discrepancy
            .reason()
            .and_then(|r| r.reason_type)
            .map_or("Unexplained", |t| t.label());
        *by_reason.entry(label).or_default() += 1;
    }
    for (label, count) in by_reason {
        info!("  {}: {}", label, count);
    }

    for item in &combos.action_items {
        warn!("[{}] {} {}: {}", item.severity, item.combo, item.discrepancy_type.name(), item.action);
    }
}

fn write_report(report: &AnalysisReport, pretty: bool, output: Option<&Path>) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .context("Failed to serialize report")?;

    match output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(report_file_name("bandcheck_report", report.generated_at, "json"))
            } else {
                path.to_path_buf()
            };
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_reads_cli_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "region = \"NA\"\n[report]\npretty = true").unwrap();

        let (path, config) = load_config(Some(file.path().to_path_buf()));
        assert_eq!(path.as_deref(), Some(file.path()));
        assert_eq!(config.region.as_deref(), Some("NA"));
        assert!(config.report.pretty);
    }

    #[test]
    fn test_load_config_degrades_on_bad_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"loud\"").unwrap();

        let (path, config) = load_config(Some(file.path().to_path_buf()));
        assert!(path.is_some());
        assert_eq!(config, TomlConfig::default());
    }
}
