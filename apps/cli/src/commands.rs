//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use curricula_core::{
    ImportOutcome, ImportReport, ProgressReporter, ScrapeSummary, import_document,
    scrape_programs,
};
use curricula_scraper::HttpSource;
use curricula_shared::{AppConfig, init_config, load_config, load_config_from, resolve_db_token};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Curricula: study program catalogs, scraped and imported.
#[derive(Parser)]
#[command(
    name = "curricula",
    version,
    about = "Harvest study program curricula and import them into a relational store.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.curricula/curricula.toml.
    #[arg(long, env = "CURRICULA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Harvest every program from the listing page into a JSON document.
    Scrape {
        /// Where to write the document (defaults to `[output] document_path`).
        #[arg(short, long, env = "CURRICULA_DATA_FILE")]
        output: Option<PathBuf>,

        /// Site origin, overriding `[source] base_url`.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Import a scraped document into the database, unless it is already populated.
    Import {
        /// Document to import (defaults to `[output] document_path`).
        #[arg(short, long, env = "CURRICULA_DATA_FILE")]
        input: Option<PathBuf>,

        /// Database file or libsql:// URL, overriding `[database] url`.
        #[arg(long, env = "CURRICULA_DATABASE_URL")]
        database_url: Option<String>,

        /// Seconds to wait before connecting, overriding `[import] startup_delay_secs`.
        #[arg(long, env = "CURRICULA_STARTUP_DELAY")]
        startup_delay: Option<u64>,

        /// Do not apply the bundled migrations; wait for an externally managed schema.
        #[arg(long)]
        no_migrate: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "curricula=info",
        1 => "curricula=debug",
        _ => "curricula=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Scrape { output, base_url } => {
            let mut config = resolve_config(config_path)?;
            if let Some(base_url) = base_url {
                config.source.base_url = base_url;
            }
            cmd_scrape(&config, output).await
        }
        Command::Import {
            input,
            database_url,
            startup_delay,
            no_migrate,
        } => {
            let mut config = resolve_config(config_path)?;
            apply_import_overrides(&mut config, database_url, startup_delay, no_migrate);
            cmd_import(&config, input).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn apply_import_overrides(
    config: &mut AppConfig,
    database_url: Option<String>,
    startup_delay: Option<u64>,
    no_migrate: bool,
) {
    if let Some(url) = database_url {
        config.database.url = url;
    }
    if let Some(secs) = startup_delay {
        config.import.startup_delay_secs = secs;
    }
    if no_migrate {
        config.database.apply_migrations = false;
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_scrape(config: &AppConfig, output: Option<PathBuf>) -> Result<()> {
    let output = output.unwrap_or_else(|| PathBuf::from(&config.output.document_path));
    info!(
        listing = %config.source.listing_url(),
        output = %output.display(),
        "scraping programs"
    );

    let source = HttpSource::new(&config.source)?;
    let reporter = CliProgress::new();
    let summary = scrape_programs(source, config, &output, &reporter).await?;

    println!();
    println!("  Document written!");
    println!("  Programs: {}", summary.programs);
    println!("  Failed:   {}", summary.failed);
    println!("  Path:     {}", summary.output.display());
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_import(config: &AppConfig, input: Option<PathBuf>) -> Result<()> {
    // Credentials are checked before touching the file system or network.
    let token = resolve_db_token(&config.database)?;
    let input = input.unwrap_or_else(|| PathBuf::from(&config.output.document_path));

    info!(
        input = %input.display(),
        database = %config.database.url,
        "importing document"
    );

    let reporter = CliProgress::new();
    let report = import_document(config, &input, token, &reporter).await?;

    println!();
    match &report.outcome {
        ImportOutcome::Skipped => {
            println!("  Database already populated, skipping import.");
        }
        ImportOutcome::Imported(stats) => {
            println!("  Import complete!");
            println!("  Programs: {}", stats.programs);
            println!("  Modules:  {}", stats.modules);
            println!("  Courses:  {}", stats.courses);
            println!("  Links:    {}", stats.links);
            if stats.failed_entries > 0 || stats.empty_programs > 0 {
                println!(
                    "  Skipped:  {} failed, {} without curriculum",
                    stats.failed_entries, stats.empty_programs
                );
            }
            if stats.orphaned_courses > 0 {
                println!("  Orphaned: {}", stats.orphaned_courses);
            }
        }
    }
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn program_harvested(&self, url: &str, current: usize, total: usize, failed: bool) {
        let marker = if failed { " (failed)" } else { "" };
        self.spinner
            .set_message(format!("Harvesting [{current}/{total}] {url}{marker}"));
    }

    fn scrape_done(&self, _summary: &ScrapeSummary) {
        self.spinner.finish_and_clear();
    }

    fn import_done(&self, _report: &ImportReport) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_flags_parse() {
        let cli = Cli::try_parse_from([
            "curricula",
            "import",
            "--input",
            "data/programs.json",
            "--database-url",
            "libsql://db.example.com",
            "--startup-delay",
            "5",
        ])
        .expect("parse");

        let Command::Import {
            input,
            database_url,
            startup_delay,
            no_migrate,
        } = cli.command
        else {
            panic!("expected import command");
        };
        assert_eq!(input, Some(PathBuf::from("data/programs.json")));

        let mut config = AppConfig::default();
        apply_import_overrides(&mut config, database_url, startup_delay, no_migrate);
        assert_eq!(config.database.url, "libsql://db.example.com");
        assert!(config.database.is_remote());
        assert_eq!(config.import.startup_delay_secs, 5);
        assert!(config.database.apply_migrations);
    }

    #[test]
    fn no_migrate_disables_migrations() {
        let mut config = AppConfig::default();
        apply_import_overrides(&mut config, None, None, true);
        assert!(!config.database.apply_migrations);
        assert_eq!(config.database.url, AppConfig::default().database.url);
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::try_parse_from(["curricula", "scrape", "-vv", "--log-format", "json"])
            .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(cli.command, Command::Scrape { .. }));
    }
}
