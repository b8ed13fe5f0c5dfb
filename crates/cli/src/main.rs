// icpp CLI - IC++ fee breakdown from a transaction ledger and a fee export

mod exit_codes;
mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use icpp_attribution::{AttributionConfig, AttributionInput, FeeCategory};

use exit_codes::{
    attribution_exit_code, EXIT_ATTRIBUTION_FAILED, EXIT_CONFIG_INVALID, EXIT_INPUT_INVALID,
    EXIT_SUCCESS, EXIT_WARNINGS,
};

const DEFAULT_CSV: &str = "icpp_breakdown_report.csv";

#[derive(Parser)]
#[command(name = "icpp")]
#[command(about = "IC++ pricing breakdown: attribute MDR to interchange, scheme and acquirer fees")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log progress (info level). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attribute fees and print the breakdown report
    #[command(after_help = "\
Examples:
  icpp run transactions.xlsx fees_export.csv
  icpp run transactions.csv fees.csv --config icpp.toml --csv breakdown.csv
  icpp run transactions.xlsx fees.csv --json --quiet
  icpp run transactions.xlsx fees.csv --output report.json --strict
  icpp run transactions.xlsx fees.csv --html icpp_breakdown_report.html")]
    Run {
        /// Transaction ledger (.xlsx/.xls/.ods or CSV)
        ledger: PathBuf,

        /// Fee export (CSV)
        fees: PathBuf,

        /// TOML config (defaults reproduce the built-in HK/MY/TH setup)
        #[arg(long, short = 'c', env = "ICPP_CONFIG")]
        config: Option<PathBuf>,

        /// Flat CSV export path
        #[arg(long, default_value = DEFAULT_CSV)]
        csv: PathBuf,

        /// Print the JSON report to stdout instead of the console tree
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write a static HTML report
        #[arg(long)]
        html: Option<PathBuf>,

        /// No console report (exports are still written)
        #[arg(long, short = 'q')]
        quiet: bool,

        /// Exit 63 when the run produced warnings
        #[arg(long)]
        strict: bool,
    },

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  icpp validate icpp.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },

    /// List fee category names, in report order
    Categories,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  icpp-attribution ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { ledger, fees, config, csv, json, output, html, quiet, strict } => {
            cmd_run(RunArgs { ledger, fees, config, csv, json, output, html, quiet, strict })
        }
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Categories => cmd_categories(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<icpp_attribution::AttributionError> for CliError {
    fn from(err: icpp_attribution::AttributionError) -> Self {
        let code = attribution_exit_code(&err);
        let hint = match &err {
            icpp_attribution::AttributionError::MissingColumn { .. } => {
                Some("column names are configurable under [ledger.columns] / [fees.columns]")
            }
            icpp_attribution::AttributionError::SharedFeeRecord { .. } => {
                Some("set [matching] shared_fee_policy = \"sum\" to attribute it to every claimant")
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint: hint.map(str::to_string) }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

struct RunArgs {
    ledger: PathBuf,
    fees: PathBuf,
    config: Option<PathBuf>,
    csv: PathBuf,
    json: bool,
    output: Option<PathBuf>,
    html: Option<PathBuf>,
    quiet: bool,
    strict: bool,
}

fn load_config(path: Option<&Path>) -> Result<AttributionConfig, CliError> {
    let Some(path) = path else {
        return Ok(AttributionConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_CONFIG_INVALID, format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = AttributionConfig::from_toml(&text)?;
    log::info!("config '{}' loaded from {}", config.name, path.display());
    Ok(config)
}

fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;

    let ledger_markers: Vec<String> = config.ledger.columns.identifier_headers().cloned().collect();
    let ledger = icpp_io::load_table(&args.ledger, &ledger_markers)
        .map_err(|e| {
            CliError::new(EXIT_INPUT_INVALID, format!("ledger {}: {e}", args.ledger.display()))
                .with_hint("the ledger may be .xlsx/.xls/.ods or a delimited text file")
        })?;
    let fees = icpp_io::load_table(&args.fees, &config.fees.columns.identifier)
        .map_err(|e| CliError::new(EXIT_INPUT_INVALID, format!("fees {}: {e}", args.fees.display())))?;

    let report = icpp_attribution::run(&config, &AttributionInput { ledger, fees })?;

    icpp_io::export::export(&report.groups, &args.csv)
        .map_err(|e| CliError::new(EXIT_ATTRIBUTION_FAILED, e))?;

    if let Some(ref path) = args.output {
        icpp_io::json::export(&report, path)
            .map_err(|e| CliError::new(EXIT_ATTRIBUTION_FAILED, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = args.html {
        icpp_io::html::export(&report, &config, path).map_err(|e| CliError::new(EXIT_ATTRIBUTION_FAILED, e))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        let json = icpp_io::json::to_string(&report)
            .map_err(|e| CliError::new(EXIT_ATTRIBUTION_FAILED, format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else if !args.quiet {
        print!("{}", report::render(&report, &config));
    }

    let s = &report.summary;
    eprintln!(
        "{} transactions: {} processed, {} skipped, {} warning(s); CSV report saved to {}",
        s.total_transactions,
        s.total_processed,
        s.total_skipped,
        s.warning_count,
        args.csv.display()
    );

    if args.strict && s.warning_count > 0 {
        return Err(CliError::new(
            EXIT_WARNINGS,
            format!("{} warning(s) reported (--strict)", s.warning_count),
        ));
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<(), CliError> {
    let config = load_config(Some(path))?;
    eprintln!(
        "config OK: '{}' ({} regions, {} region rule set(s))",
        config.name,
        config.regions.len(),
        config.region_rules.len()
    );
    Ok(())
}

fn cmd_categories() -> Result<(), CliError> {
    for category in FeeCategory::ALL {
        let kind = if category == FeeCategory::NetAcquirerMarkup {
            "residual"
        } else if category.is_tax() {
            "tax"
        } else if category.is_itemized() {
            "itemized"
        } else {
            "layer"
        };
        println!("{}\t{}", category.as_str(), kind);
    }
    Ok(())
}
