//! typesniff CLI - content-type detection for files and directory trees

mod output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use typesniff_core::{DetectOptions, Detection, Detector, EngineRegistry, SniffConfig};

use crate::output::{ScanEntry, Style};

#[derive(Parser, Debug)]
#[command(name = "typesniff")]
#[command(version, about = "Identify the content type of files by sniffing their bytes", long_about = None)]
struct Cli {
    /// Enable verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML config file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a file, or every matching file under a directory
    Detect(DetectArgs),

    /// List available engines in execution order
    Engines {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// File or directory to classify
    path: PathBuf,

    /// Glob applied to paths relative to the scanned directory
    #[arg(long)]
    pattern: Option<String>,

    /// Worker threads for directory scans
    #[arg(long)]
    workers: Option<usize>,

    /// Directory names to skip (repeatable)
    #[arg(long, value_name = "DIR", num_args = 1..)]
    ignore: Vec<String>,

    /// Run only these engines (repeatable)
    #[arg(long, value_name = "ENGINE", num_args = 1..)]
    only: Vec<String>,

    /// Only classify files with these extensions (repeatable)
    #[arg(long = "ext", value_name = "EXT", num_args = 1..)]
    extensions: Vec<String>,

    /// Maximum bytes read from each file
    #[arg(long, value_name = "N")]
    cap_bytes: Option<usize>,

    /// Compact JSON output
    #[arg(long)]
    raw: bool,

    /// Add a TrID result beside each entry
    #[arg(long)]
    trid: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Engine run on its own for `--trid`.
const TRID_ENGINE: &str = "trid";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Json,
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SniffConfig> {
    let (mut config, warning) = SniffConfig::load_or_default(path);
    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }
    config.apply_env()?;
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Engines { format } => {
            let registry = EngineRegistry::from_config(&config);
            output::print_engines(&registry, format == OutputFormat::Json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Detect(args) => {
            apply_overrides(&mut config, &args);
            config.validate()?;
            detect(&config, &args)
        }
    }
}

fn apply_overrides(config: &mut SniffConfig, args: &DetectArgs) {
    if let Some(pattern) = &args.pattern {
        config.pattern = pattern.clone();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if !args.ignore.is_empty() {
        config.ignore = args.ignore.clone();
    }
    if !args.extensions.is_empty() {
        config.extensions = Some(args.extensions.clone());
    }
    if args.cap_bytes.is_some() {
        config.cap_bytes = args.cap_bytes;
    }
}

fn detect(config: &SniffConfig, args: &DetectArgs) -> anyhow::Result<ExitCode> {
    let detector = Detector::new(Arc::new(EngineRegistry::from_config(config)));
    let style = Style {
        json: args.format == OutputFormat::Json,
        raw: args.raw,
    };
    let trid = args
        .trid
        .then(|| DetectOptions::default().only([TRID_ENGINE]));

    if args.path.is_dir() {
        let mut options = config.scan_options();
        options.detect.only = args.only.clone();

        let scan = detector.scan_dir(&args.path, &options)?;
        let cancel = scan.cancel_handle();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }

        let mut entries: Vec<ScanEntry> = scan
            .map(|(path, result)| {
                let entry = ScanEntry::new(&path, result);
                match &trid {
                    Some(trid) => entry.with_trid(trid_for_entry(&detector, &path, trid)),
                    None => entry,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        output::print_scan(&entries, style)?;
        Ok(ExitCode::SUCCESS)
    } else {
        let mut options = config.detect_options();
        options.only = args.only.clone();
        let detection = detector
            .detect(args.path.as_path(), &options)
            .with_context(|| format!("failed to classify {}", args.path.display()))?;
        let trid = trid
            .map(|trid| detector.detect_path(&args.path, &trid))
            .transpose()
            .with_context(|| format!("TrID failed on {}", args.path.display()))?;
        output::print_detection(&args.path, &detection, trid.as_ref(), style)?;
        Ok(ExitCode::SUCCESS)
    }
}

/// TrID result for one scanned file. A failure only drops the extra field.
fn trid_for_entry(detector: &Detector, path: &Path, options: &DetectOptions) -> Option<Detection> {
    match detector.detect_path(path, options) {
        Ok(detection) => Some(detection),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "TrID failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_detect_args_parse() {
        let cli = Cli::parse_from([
            "typesniff", "detect", "data", "--workers", "2", "--only", "json", "csv", "--ext",
            "json", "--raw",
        ]);
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.workers, Some(2));
        assert_eq!(args.only, vec!["json", "csv"]);
        assert_eq!(args.extensions, vec!["json"]);
        assert!(args.raw);
        assert!(!args.trid);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_overrides_replace_config_values() {
        let cli = Cli::parse_from([
            "typesniff", "detect", "data", "--pattern", "**/*.csv", "--cap-bytes", "64",
            "--ignore", "target",
        ]);
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        let mut config = SniffConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.pattern, "**/*.csv");
        assert_eq!(config.cap_bytes, Some(64));
        assert_eq!(config.ignore, vec!["target"]);
        assert_eq!(config.workers, SniffConfig::default().workers);
    }
}
