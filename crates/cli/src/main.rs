mod config;
mod error;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sandbox::Signature;
use tracing::debug;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "scriptguard.toml";

#[derive(Parser)]
#[command(name = "scriptguard")]
#[command(about = "Validate and inspect script sandbox whitelists", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Log resolution and policy decisions
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whitelist definition files for malformed lines
    Check {
        /// Files to check (defaults to the configured ones)
        files: Vec<PathBuf>,
    },
    /// Print every configured signature, sorted
    List,
    /// Report whether a signature is whitelisted
    Query {
        /// Canonical signature, e.g. "method java.lang.String length"
        signature: String,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli.config)?;
    match cli.command {
        Commands::Check { files } => cmd_check(&config, files),
        Commands::List => cmd_list(&config),
        Commands::Query { signature } => cmd_query(&config, &signature),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// The configuration file if present, otherwise the empty default.
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        debug!(path = %path.display(), "loading config");
        Ok(Config::load(path)?)
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::default_config())
    }
}

fn cmd_check(config: &Config, files: Vec<PathBuf>) -> Result<()> {
    let files = if files.is_empty() {
        config.whitelist_files()
    } else {
        files
    };

    let mut errors = 0;
    let mut entries = 0;
    for path in &files {
        if !path.exists() {
            return Err(Error::FileNotFound { path: path.clone() });
        }
        let text = std::fs::read_to_string(path)?;
        let report = check_text(&text);
        for (line, err) in &report.errors {
            eprintln!("{}:{}: {}", path.display(), line, err);
        }
        errors += report.errors.len();
        entries += report.entries;
    }

    if errors > 0 {
        return Err(Error::Invalid { count: errors });
    }
    println!(
        "{} file(s), {} signature(s) OK",
        files.len(),
        entries + config.whitelist.signatures.len()
    );
    Ok(())
}

/// Outcome of checking one definition file.
#[derive(Debug, Default)]
struct CheckReport {
    entries: usize,
    /// One-based line number and parse error per malformed line.
    errors: Vec<(usize, sandbox::Error)>,
}

fn check_text(text: &str) -> CheckReport {
    let mut report = CheckReport::default();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Signature::parse(line) {
            Ok(_) => report.entries += 1,
            Err(e) => report.errors.push((i + 1, e)),
        }
    }
    report
}

fn cmd_list(config: &Config) -> Result<()> {
    let whitelist = config.build_whitelist()?;
    for signature in whitelist.signatures() {
        println!("{signature}");
    }
    Ok(())
}

fn cmd_query(config: &Config, signature: &str) -> Result<()> {
    let signature = Signature::parse(signature)?;
    let whitelist = config.build_whitelist()?;
    let enumerating = whitelist.enumerating();
    match enumerating.signatures().find(|s| s.covers(&signature)) {
        Some(entry) => {
            println!("{signature}: whitelisted by `{entry}`");
            Ok(())
        }
        None => Err(Error::NotCovered {
            signature: signature.to_string(),
        }),
    }
}
