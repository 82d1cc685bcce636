//! Browser session abstraction used by the extraction engine.
//!
//! The engine never talks to a browser directly; it asks a [`BrowserSession`]
//! for DOM snapshots and for clicks/scrolls addressed by CSS selector.
//! - [`ChromiumSession`] drives a real Chromium via chromiumoxide
//! - [`ReplaySession`] replays captured page snapshots in memory

pub mod chromium;
pub mod replay;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rosterscrape_shared::{Result, WaitPolicy};

pub use chromium::{ChromiumSession, find_chromium};
pub use replay::{ReplaySession, SessionCall, MODAL_SLOT};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A single browser page the engine can read from and act upon.
///
/// Implementations must be safe to call sequentially from one task; the
/// engine never issues concurrent calls.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to `url`, waiting according to `policy` for at most `timeout`.
    async fn navigate(
        &self,
        url: &str,
        policy: WaitPolicy,
        timeout: Duration,
    ) -> Result<NavigationResult>;

    /// Serialized markup of the currently rendered document.
    async fn content(&self) -> Result<String>;

    /// Click the first element matching `selector`.
    /// Returns `false` when nothing matched.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Scroll the first element matching `selector` to its maximum offset,
    /// then every scrollable ancestor. Returns `false` when nothing matched.
    async fn scroll_to_end(&self, selector: &str) -> Result<bool>;

    /// Suspend for `duration`.
    async fn wait(&self, duration: Duration);

    /// Shut the session down.
    async fn close(&self) -> Result<()>;
}
