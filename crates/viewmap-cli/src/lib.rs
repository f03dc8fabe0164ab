use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use viewmap_core::{
    normalize_log_level, Analyzer, ConfigManager, ManualCuration, OutputFormat, ReportOptions,
    ReportWriter, ScanReport, SuggestionFile, ViewMapConfig,
};
use viewmap_parser::{scan, FileCollectionConfig, ScanRequest};

pub mod logging;

/// Exit status when `--fail-on-unresolved` finds uncurated calls.
pub const EXIT_UNRESOLVED: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "viewmap",
    version,
    about = "Map StatusDB view usage across Python sources",
    long_about = "Finds every `<db>.<TARGET_FUNCTION>(...)` call in Python sources, resolves \
                  database and view variables through a manual curation file and reports \
                  the calls as text, CSV, TSV, JSON or a Graphviz usage graph."
)]
pub struct Cli {
    #[arg(help = "The function to search for, e.g. view")]
    pub target_function: String,

    #[arg(long, num_args = 1.., help = "The files to search in")]
    pub files: Vec<PathBuf>,

    #[arg(long, num_args = 1.., help = "The directories to search in, recursively")]
    pub dirs: Vec<PathBuf>,

    #[arg(
        long,
        alias = "manual_curation",
        help = "The file containing manual curation data [default: manual_curation.csv]"
    )]
    pub manual_curation: Option<PathBuf>,

    #[arg(
        long,
        alias = "suggestions_file",
        help = "File to append suggestions for more manual curations to"
    )]
    pub suggestions_file: Option<PathBuf>,

    #[arg(short, long, value_enum, help = "Report format [default: text]")]
    pub format: Option<FormatArg>,

    #[arg(short, long, help = "Write the report to this file instead of stdout")]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Also report calls that still contain variables")]
    pub include_unresolved: bool,

    #[arg(long, help = "Exit with status 2 if any call could not be resolved")]
    pub fail_on_unresolved: bool,

    #[arg(long, help = "Exclude patterns (gitignore format)")]
    pub exclude: Vec<String>,

    #[arg(long, help = "Honour .gitignore and .ignore files while walking")]
    pub respect_ignore_files: bool,

    #[arg(long, help = "Number of parser threads")]
    pub threads: Option<usize>,

    #[arg(
        long,
        alias = "logging_level",
        help = "Logging level (trace, debug, info, warn, error)"
    )]
    pub log_level: Option<String>,

    #[arg(long, env = "VIEWMAP_CONFIG", help = "Configuration file path")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Csv,
    Tsv,
    Json,
    Dot,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Tsv => OutputFormat::Tsv,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Dot => OutputFormat::Dot,
        }
    }
}

/// Layer command line flags over the loaded configuration.
pub fn apply_cli_overrides(cli: &Cli, mut config: ViewMapConfig) -> Result<ViewMapConfig> {
    if let Some(path) = &cli.manual_curation {
        config.curation.manual_curation = path.clone();
    }
    if let Some(path) = &cli.suggestions_file {
        config.curation.suggestions_file = Some(path.clone());
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if cli.include_unresolved {
        config.output.include_unresolved = true;
    }
    if !cli.exclude.is_empty() {
        config.scan.exclude_patterns.extend(cli.exclude.iter().cloned());
    }
    if cli.respect_ignore_files {
        config.scan.respect_ignore_files = true;
    }
    if let Some(threads) = cli.threads {
        config.scan.threads = threads;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = normalize_log_level(level);
    }

    ConfigManager::validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

/// The manager is returned alongside the effective config so its load
/// messages can be logged once the subscriber is installed.
pub fn load_config(cli: &Cli) -> Result<(ConfigManager, ViewMapConfig)> {
    let manager =
        ConfigManager::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let config = apply_cli_overrides(cli, manager.config().clone())?;
    Ok((manager, config))
}

/// Scan, curate and classify; nothing is written to the report output.
pub fn analyze(cli: &Cli, config: &ViewMapConfig) -> Result<ScanReport> {
    let curation = ManualCuration::load(&config.curation.manual_curation).with_context(|| {
        format!(
            "Failed to load manual curation from {}",
            config.curation.manual_curation.display()
        )
    })?;

    let request = ScanRequest {
        target_function: cli.target_function.clone(),
        files: cli.files.clone(),
        dirs: cli.dirs.clone(),
        collection: FileCollectionConfig::from(&config.scan),
        threads: config.scan.threads,
    };
    let output = scan(&request).context("Failed to scan sources")?;
    for skipped in &output.skipped {
        warn!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }

    let mut analyzer = Analyzer::new(&curation);
    if let Some(path) = &config.curation.suggestions_file {
        analyzer = analyzer.with_suggestions_file(SuggestionFile::new(path));
    }
    let report = analyzer
        .analyze(output.scans, output.skipped.len())
        .context("Failed to classify calls")?;
    Ok(report)
}

/// Run the whole command and return the process exit status.
pub fn run(cli: &Cli, config: &ViewMapConfig) -> Result<i32> {
    let report = analyze(cli, config)?;

    let writer = ReportWriter::new(ReportOptions {
        format: config.output.format,
        include_unresolved: config.output.include_unresolved,
    });

    match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            writer.write(&report, &mut out)?;
            out.flush()?;
            info!("Wrote {} report to {}", config.output.format, path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writer.write(&report, &mut out)?;
            out.flush()?;
        }
    }

    if cli.fail_on_unresolved && report.has_unresolved() {
        return Ok(EXIT_UNRESOLVED);
    }
    Ok(0)
}
