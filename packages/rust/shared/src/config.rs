//! Application configuration for rosterscrape.
//!
//! User config lives at `~/.rosterscrape/rosterscrape.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, RosterError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rosterscrape.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rosterscrape";

// ---------------------------------------------------------------------------
// Heuristic thresholds
// ---------------------------------------------------------------------------

/// Lower bound (exclusive) on a detail panel's text length, in characters.
///
/// A container holding only the five labels and their short values measures
/// well under 200 characters; captured panels with a biography start around
/// 1,000. Anything at or below this bound is a label-only wrapper.
pub const DEFAULT_PANEL_MIN_CHARS: usize = 900;

/// Upper bound (exclusive) on a detail panel's text length, in characters.
///
/// The longest captured panel stays below 4,000 characters while the page
/// root, which carries every roster card, runs to tens of thousands.
pub const DEFAULT_PANEL_MAX_CHARS: usize = 5000;

/// Minimum length (exclusive) of a leaf text to count as the description.
///
/// Label values (names, regions, strategies) stay below 80 characters; the
/// shortest captured biography is several hundred.
pub const DEFAULT_DESCRIPTION_MIN_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How navigation decides the page has loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitPolicy {
    /// The `load` event.
    Load,
    /// `DOMContentLoaded`.
    DomContentLoaded,
    /// Load, then wait until the DOM stops mutating.
    #[default]
    NetworkIdle,
}

impl FromStr for WaitPolicy {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "load" => Ok(Self::Load),
            "dom-content-loaded" => Ok(Self::DomContentLoaded),
            "network-idle" => Ok(Self::NetworkIdle),
            other => Err(RosterError::config(format!(
                "unknown wait policy '{other}': expected load, dom-content-loaded or network-idle"
            ))),
        }
    }
}

/// Which anchor is used to count and trigger roster items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoveryStrategy {
    /// Elements whose trimmed text is exactly one of the role labels.
    #[default]
    RoleText,
    /// Clickable images carrying a marker class.
    ImageMarker,
}

impl DiscoveryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleText => "role-text",
            Self::ImageMarker => "image-marker",
        }
    }
}

impl FromStr for DiscoveryStrategy {
    type Err = RosterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "role-text" => Ok(Self::RoleText),
            "image-marker" => Ok(Self::ImageMarker),
            other => Err(RosterError::config(format!(
                "unknown discovery strategy '{other}': expected role-text or image-marker"
            ))),
        }
    }
}

impl std::fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Config structs (matching rosterscrape.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub locator: LocatorConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// `[target]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Page hosting the roster.
    #[serde(default = "default_url")]
    pub url: String,

    /// Optional element clicked after load to reveal the roster section.
    #[serde(default = "default_entry_selector", skip_serializing_if = "Option::is_none")]
    pub entry_selector: Option<String>,

    #[serde(default)]
    pub wait_policy: WaitPolicy,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Wait after the entry click, before items are counted.
    #[serde(default = "default_entry_settle")]
    pub entry_settle_ms: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            entry_selector: default_entry_selector(),
            wait_policy: WaitPolicy::default(),
            navigation_timeout_ms: default_navigation_timeout(),
            entry_settle_ms: default_entry_settle(),
        }
    }
}

fn default_url() -> String {
    "https://valueaccelerator.gs.com/homepage.html".into()
}
fn default_entry_selector() -> Option<String> {
    Some(r##"a[href="#our-team-top"]"##.into())
}
fn default_navigation_timeout() -> u64 {
    60_000
}
fn default_entry_settle() -> u64 {
    3_000
}

/// `[browser]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Explicit Chromium binary; otherwise discovered from env/PATH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
        }
    }
}

/// `[discovery]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub strategy: DiscoveryStrategy,

    /// Exact role strings shown under each roster card.
    #[serde(default = "default_role_labels")]
    pub role_labels: Vec<String>,

    /// Elements tested against `role_labels`.
    #[serde(default = "default_role_selector")]
    pub role_selector: String,

    /// Clickable images for the image-marker strategy.
    #[serde(default = "default_marker_selector")]
    pub marker_selector: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strategy: DiscoveryStrategy::default(),
            role_labels: default_role_labels(),
            role_selector: default_role_selector(),
            marker_selector: default_marker_selector(),
        }
    }
}

fn default_role_labels() -> Vec<String> {
    vec!["Advisor".into(), "Value Accelerator Core".into()]
}
fn default_role_selector() -> String {
    "div".into()
}
fn default_marker_selector() -> String {
    "img.headshot".into()
}

/// `[locator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Elements considered as panel candidates.
    #[serde(default = "default_candidate_selector")]
    pub candidate_selector: String,

    /// See [`DEFAULT_PANEL_MIN_CHARS`].
    #[serde(default = "default_panel_min")]
    pub panel_min_chars: usize,

    /// See [`DEFAULT_PANEL_MAX_CHARS`].
    #[serde(default = "default_panel_max")]
    pub panel_max_chars: usize,

    /// Close control of an open panel.
    #[serde(default = "default_close_selector")]
    pub close_selector: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            candidate_selector: default_candidate_selector(),
            panel_min_chars: default_panel_min(),
            panel_max_chars: default_panel_max(),
            close_selector: default_close_selector(),
        }
    }
}

fn default_candidate_selector() -> String {
    "div".into()
}
fn default_panel_min() -> usize {
    DEFAULT_PANEL_MIN_CHARS
}
fn default_panel_max() -> usize {
    DEFAULT_PANEL_MAX_CHARS
}
fn default_close_selector() -> String {
    r#".fa-close, .close, [class*="close"]"#.into()
}

/// `[extractor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// See [`DEFAULT_DESCRIPTION_MIN_CHARS`].
    #[serde(default = "default_description_min")]
    pub description_min_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            description_min_chars: default_description_min(),
        }
    }
}

fn default_description_min() -> usize {
    DEFAULT_DESCRIPTION_MIN_CHARS
}

/// `[timing]` section. All values in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Close any leftover panel before opening the next one.
    #[serde(default = "default_true")]
    pub close_before_open: bool,

    #[serde(default = "default_pre_open_close")]
    pub pre_open_close_ms: u64,

    /// Upper bound on waiting for a panel to appear after a click.
    #[serde(default = "default_open_timeout")]
    pub open_timeout_ms: u64,

    /// Interval between readiness samples.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound on waiting for panel text to stop growing.
    #[serde(default = "default_settle_timeout")]
    pub settle_timeout_ms: u64,

    /// Wait after closing a panel, so the next click does not land on a
    /// still-closing overlay.
    #[serde(default = "default_post_close")]
    pub post_close_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            close_before_open: true,
            pre_open_close_ms: default_pre_open_close(),
            open_timeout_ms: default_open_timeout(),
            poll_interval_ms: default_poll_interval(),
            settle_timeout_ms: default_settle_timeout(),
            post_close_ms: default_post_close(),
        }
    }
}

impl TimingConfig {
    pub fn pre_open_close(&self) -> Duration {
        Duration::from_millis(self.pre_open_close_ms)
    }
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
    pub fn post_close(&self) -> Duration {
        Duration::from_millis(self.post_close_ms)
    }
}

fn default_pre_open_close() -> u64 {
    300
}
fn default_open_timeout() -> u64 {
    1_500
}
fn default_poll_interval() -> u64 {
    100
}
fn default_settle_timeout() -> u64 {
    500
}
fn default_post_close() -> u64 {
    500
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default = "default_json_file")]
    pub json_file: String,

    #[serde(default = "default_csv_file")]
    pub csv_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            json_file: default_json_file(),
            csv_file: default_csv_file(),
        }
    }
}

impl OutputConfig {
    pub fn json_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.json_file)
    }

    pub fn csv_path(&self) -> PathBuf {
        Path::new(&self.dir).join(&self.csv_file)
    }
}

fn default_output_dir() -> String {
    ".".into()
}
fn default_json_file() -> String {
    "team_data.json".into()
}
fn default_csv_file() -> String {
    "team_data.csv".into()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Harvest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration of the extraction engine, merged from config file and CLI flags.
#[derive(Debug, Clone, Default)]
pub struct HarvestConfig {
    pub discovery: DiscoveryConfig,
    pub locator: LocatorConfig,
    pub extractor: ExtractorConfig,
    pub timing: TimingConfig,
}

impl From<&AppConfig> for HarvestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            discovery: config.discovery.clone(),
            locator: config.locator.clone(),
            extractor: config.extractor.clone(),
            timing: config.timing.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rosterscrape/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| RosterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rosterscrape/rosterscrape.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RosterError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RosterError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RosterError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RosterError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RosterError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject configurations the engine cannot run with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    Url::parse(&config.target.url).map_err(|e| {
        RosterError::config(format!("target.url '{}' is not a valid URL: {e}", config.target.url))
    })?;

    let locator = &config.locator;
    if locator.panel_min_chars >= locator.panel_max_chars {
        return Err(RosterError::config(format!(
            "locator.panel_min_chars ({}) must be below locator.panel_max_chars ({})",
            locator.panel_min_chars, locator.panel_max_chars
        )));
    }

    if config.discovery.strategy == DiscoveryStrategy::RoleText
        && config
            .discovery
            .role_labels
            .iter()
            .all(|label| label.trim().is_empty())
    {
        return Err(RosterError::config(
            "discovery.role_labels must not be empty for the role-text strategy",
        ));
    }

    if config.timing.poll_interval_ms == 0 {
        return Err(RosterError::config("timing.poll_interval_ms must be positive"));
    }

    Ok(())
}
