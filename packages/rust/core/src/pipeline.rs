//! End-to-end scrape pipeline: URL → load → reveal roster → harvest → JSON + CSV.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use url::Url;

use rosterscrape_artifacts::{self as artifacts, ArtifactMeta};
use rosterscrape_browser::BrowserSession;
use rosterscrape_harvester::{HarvestProgress, HarvestResult, Harvester, ItemOutcome};
use rosterscrape_shared::{AppConfig, HarvestConfig, Result, RosterError, RunId, WaitPolicy};

/// Configuration for the `scrape` pipeline.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Page hosting the roster.
    pub url: Url,
    /// Clicked once after load to reveal the roster, if set.
    pub entry_selector: Option<String>,
    pub wait_policy: WaitPolicy,
    pub navigation_timeout: Duration,
    /// Wait after the entry click.
    pub entry_settle: Duration,
    /// Engine configuration.
    pub harvest: HarvestConfig,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

impl TryFrom<&AppConfig> for ScrapeConfig {
    type Error = RosterError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let url = Url::parse(&config.target.url).map_err(|e| {
            RosterError::config(format!("target.url '{}' is not a valid URL: {e}", config.target.url))
        })?;

        Ok(Self {
            url,
            entry_selector: config
                .target
                .entry_selector
                .clone()
                .filter(|s| !s.trim().is_empty()),
            wait_policy: config.target.wait_policy,
            navigation_timeout: Duration::from_millis(config.target.navigation_timeout_ms),
            entry_settle: Duration::from_millis(config.target.entry_settle_ms),
            harvest: HarvestConfig::from(config),
            json_path: config.output.json_path(),
            csv_path: config.output.csv_path(),
        })
    }
}

/// Result of the `scrape` pipeline.
#[derive(Debug)]
pub struct ScrapeResult {
    pub run_id: RunId,
    /// URL after redirects.
    pub final_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Per-item tallies from the harvester.
    pub harvest: HarvestResult,
    pub json: ArtifactMeta,
    pub csv: ArtifactMeta,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl ScrapeResult {
    /// Number of records written to each artifact.
    pub fn record_count(&self) -> usize {
        self.json.records
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each roster item. `current` is one-based.
    fn item_done(&self, current: usize, total: usize, outcome: &ItemOutcome);
    /// Called when the pipeline completes.
    fn done(&self, result: &ScrapeResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_done(&self, _current: usize, _total: usize, _outcome: &ItemOutcome) {}
    fn done(&self, _result: &ScrapeResult) {}
}

/// Run the full scrape pipeline against an already launched session.
///
/// 1. Navigate to the target page
/// 2. Click the entry control, if configured
/// 3. Harvest every roster item
/// 4. Write JSON, then CSV
///
/// Navigation and item counting are fatal; nothing is written if they fail.
/// The session is left open for the caller to close.
#[instrument(skip_all, fields(url = %config.url, strategy = %config.harvest.discovery.strategy))]
pub async fn scrape(
    config: &ScrapeConfig,
    session: &dyn BrowserSession,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeResult> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = RunId::new();

    info!(%run_id, "starting scrape pipeline");

    // Fail on bad selectors before touching the network
    let harvester = Harvester::new(config.harvest.clone())?;

    // --- Phase 1: Load ---
    progress.phase("Loading page");
    let nav = session
        .navigate(config.url.as_str(), config.wait_policy, config.navigation_timeout)
        .await?;
    info!(final_url = %nav.final_url, load_time_ms = nav.load_time_ms, "page loaded");

    // --- Phase 2: Reveal roster ---
    if let Some(entry) = &config.entry_selector {
        progress.phase("Opening roster section");
        if session.click(entry).await? {
            debug!(%entry, "entry control clicked");
        } else {
            warn!(%entry, "entry control not found, continuing on current view");
        }
        session.wait(config.entry_settle).await;
    }

    // --- Phase 3: Harvest ---
    progress.phase("Harvesting roster");
    let adapter = PipelineHarvestProgress { inner: progress };
    let (harvest, records) = harvester.run(session, &adapter).await?;
    let records = records.into_records();

    // --- Phase 4: Artifacts ---
    progress.phase("Writing artifacts");
    let json = artifacts::write_json(&config.json_path, &records)?;
    let csv = artifacts::write_csv(&config.csv_path, &records)?;

    let result = ScrapeResult {
        run_id,
        final_url: nav.final_url,
        started_at,
        finished_at: Utc::now(),
        harvest,
        json,
        csv,
        elapsed: start.elapsed(),
    };

    info!(
        run_id = %result.run_id,
        records = result.record_count(),
        json = %result.json.path.display(),
        csv = %result.csv.path.display(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "scrape pipeline complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Adapts a `ProgressReporter` to the `HarvestProgress` interface.
struct PipelineHarvestProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl HarvestProgress for PipelineHarvestProgress<'_> {
    fn items_found(&self, total: usize) {
        self.inner.phase(&format!("Harvesting {total} roster items"));
    }

    fn item_done(&self, index: usize, total: usize, outcome: &ItemOutcome) {
        self.inner.item_done(index + 1, total, outcome);
    }
}
