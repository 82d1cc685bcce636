//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use rosterscrape_browser::{BrowserSession, ChromiumSession};
use rosterscrape_core::inspect::{SnapshotExtraction, calibrate_snapshot, extract_snapshot};
use rosterscrape_core::pipeline::{self, ProgressReporter, ScrapeConfig, ScrapeResult};
use rosterscrape_harvester::{ItemOutcome, SkipReason};
use rosterscrape_shared::{
    AppConfig, DiscoveryStrategy, HarvestConfig, init_config, load_config, load_config_from,
    validate_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rosterscrape: extract a people roster from client-rendered detail panels.
#[derive(Parser)]
#[command(
    name = "rosterscrape",
    version,
    about = "Extract a people roster from client-rendered detail panels into JSON and CSV.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.rosterscrape/rosterscrape.toml.
    #[arg(long, global = true, env = "ROSTERSCRAPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Open the roster page in Chromium and harvest every entry.
    Run {
        /// Roster page URL (overrides target.url).
        #[arg(long)]
        url: Option<String>,

        /// Item discovery strategy: role-text or image-marker.
        #[arg(short, long)]
        strategy: Option<DiscoveryStrategy>,

        /// Output directory for team_data.json and team_data.csv.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Show the browser window.
        #[arg(long)]
        headful: bool,
    },

    /// Extract the open panel from a saved page snapshot.
    Extract {
        /// HTML file captured while a detail panel was open.
        snapshot: PathBuf,
    },

    /// List label-bearing containers in a snapshot with their text lengths.
    Calibrate {
        /// HTML file captured while a detail panel was open.
        snapshot: PathBuf,
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
        0 => "rosterscrape=info",
        1 => "rosterscrape=debug",
        _ => "rosterscrape=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
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
        Command::Run {
            url,
            strategy,
            out,
            headful,
        } => {
            let mut config = resolve_config(config_path)?;
            if let Some(url) = url {
                config.target.url = url;
            }
            if let Some(strategy) = strategy {
                config.discovery.strategy = strategy;
            }
            if let Some(out) = out {
                config.output.dir = out.display().to_string();
            }
            if headful {
                config.browser.headless = false;
            }
            cmd_run(&config).await
        }
        Command::Extract { snapshot } => cmd_extract(config_path, &snapshot),
        Command::Calibrate { snapshot } => cmd_calibrate(config_path, &snapshot),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load `--config` if given, else the user config (or defaults).
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    validate_config(config)?;
    let scrape_config = ScrapeConfig::try_from(config)?;

    info!(
        url = %scrape_config.url,
        strategy = %config.discovery.strategy,
        out = %config.output.dir,
        "harvesting roster"
    );

    let session = ChromiumSession::launch(&config.browser).await?;
    let reporter = CliProgress::new();

    let outcome = pipeline::scrape(&scrape_config, &session, &reporter).await;

    // The browser is shut down whether or not the run succeeded
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close browser");
    }

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            reporter.abandon();
            return Err(e.into());
        }
    };

    let harvest = &result.harvest;
    println!();
    println!("  Roster harvested!");
    println!("  Run:       {}", result.run_id);
    println!("  Strategy:  {}", harvest.strategy);
    println!("  Items:     {}", harvest.total_items);
    println!("  Recorded:  {}", harvest.recorded);
    println!(
        "  Skipped:   {} (no modal: {}, incomplete: {})",
        harvest.skipped(),
        harvest.skipped_no_modal,
        harvest.skipped_incomplete
    );
    println!("  Faults:    {}", harvest.faults.len());
    println!(
        "  JSON:      {} ({} records)",
        result.json.path.display(),
        result.json.records
    );
    println!(
        "  CSV:       {} ({} records)",
        result.csv.path.display(),
        result.csv.records
    );
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_extract(config_path: Option<&Path>, snapshot: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let markup = read_snapshot(snapshot)?;

    match extract_snapshot(&markup, &HarvestConfig::from(&config))? {
        SnapshotExtraction::Extracted { panel, record } => {
            info!(selector = %panel.selector, text_len = panel.text_len, "panel located");
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        SnapshotExtraction::NoModal { candidates } => Err(eyre!(
            "no open panel in {}: {candidates} label-bearing container(s), need at least 2",
            snapshot.display()
        )),
        SnapshotExtraction::OutsideWindow { candidates } => Err(eyre!(
            "panel is open but none of its {} container(s) is within {}..{} characters; \
             run `rosterscrape calibrate` to inspect lengths",
            candidates.len(),
            config.locator.panel_min_chars,
            config.locator.panel_max_chars
        )),
        SnapshotExtraction::Incomplete { panel } => Err(eyre!(
            "panel at `{}` has no name value",
            panel.selector
        )),
    }
}

fn cmd_calibrate(config_path: Option<&Path>, snapshot: &Path) -> Result<()> {
    let config = resolve_config(config_path)?;
    let markup = read_snapshot(snapshot)?;
    let candidates = calibrate_snapshot(&markup, &HarvestConfig::from(&config))?;

    println!(
        "  window: {} < length < {}",
        config.locator.panel_min_chars, config.locator.panel_max_chars
    );
    if candidates.is_empty() {
        println!("  no container holds every label");
        return Ok(());
    }

    for candidate in &candidates {
        let marker = if candidate.in_window { "*" } else { " " };
        println!("  {marker} {:>7}  {}", candidate.text_len, candidate.selector);
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read snapshot '{}': {e}", path.display()))
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
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_done(&self, current: usize, total: usize, outcome: &ItemOutcome) {
        let line = match outcome {
            ItemOutcome::Recorded { name } => format!("✓ [{current}/{total}] {name}"),
            ItemOutcome::Skipped(SkipReason::ModalNotDetected) => {
                format!("⚠ [{current}/{total}] no modal detected")
            }
            ItemOutcome::Skipped(SkipReason::ExtractionIncomplete) => {
                format!("⚠ [{current}/{total}] extraction incomplete")
            }
            ItemOutcome::Faulted { message } => format!("✗ [{current}/{total}] {message}"),
        };
        self.spinner.println(line);
        self.spinner
            .set_message(format!("Harvesting [{current}/{total}]"));
    }

    fn done(&self, _result: &ScrapeResult) {
        self.spinner.finish_and_clear();
    }
}
