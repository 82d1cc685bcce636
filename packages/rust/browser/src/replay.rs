//! In-memory session that replays captured page snapshots.
//!
//! A replay is built from one page snapshot containing [`MODAL_SLOT`] plus
//! per-item panel markup. Clicking an element carrying `data-item="<key>"`
//! renders that item's panel into the slot; clicking a close control
//! (`data-close` attribute or a class containing `close`) empties it again.
//! Waits elapse instantly and every call is recorded for inspection.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};

use rosterscrape_shared::{Result, RosterError, WaitPolicy};

use crate::{BrowserSession, NavigationResult};

/// Placeholder in the page snapshot where an open panel is rendered.
pub const MODAL_SLOT: &str = "<!--modal-->";

/// One recorded session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Navigate(String),
    Content,
    Click(String),
    ScrollToEnd(String),
    Wait(Duration),
    Close,
}

#[derive(Debug, Clone)]
struct ReplayPanel {
    markup: String,
    /// Markup once the panel has been scrolled (lazily rendered content).
    after_scroll: Option<String>,
}

#[derive(Debug, Default)]
struct ReplayState {
    /// Open item key and whether its panel was scrolled.
    open: Option<(String, bool)>,
    calls: Vec<SessionCall>,
}

/// Scripted [`BrowserSession`] over captured markup.
#[derive(Debug)]
pub struct ReplaySession {
    page: String,
    panels: HashMap<String, ReplayPanel>,
    failing_clicks: HashSet<String>,
    navigation_error: Option<String>,
    content_error: Option<String>,
    state: Mutex<ReplayState>,
}

impl ReplaySession {
    /// Replay `page`, which should contain [`MODAL_SLOT`] where panels render.
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            panels: HashMap::new(),
            failing_clicks: HashSet::new(),
            navigation_error: None,
            content_error: None,
            state: Mutex::new(ReplayState::default()),
        }
    }

    /// Render `markup` when the trigger for `item` is clicked.
    /// Items without a panel simply never open.
    pub fn with_panel(mut self, item: impl Into<String>, markup: impl Into<String>) -> Self {
        self.panels.insert(
            item.into(),
            ReplayPanel {
                markup: markup.into(),
                after_scroll: None,
            },
        );
        self
    }

    /// Like [`Self::with_panel`], but the panel only reaches `after_scroll`
    /// once it has been scrolled.
    pub fn with_lazy_panel(
        mut self,
        item: impl Into<String>,
        initial: impl Into<String>,
        after_scroll: impl Into<String>,
    ) -> Self {
        self.panels.insert(
            item.into(),
            ReplayPanel {
                markup: initial.into(),
                after_scroll: Some(after_scroll.into()),
            },
        );
        self
    }

    /// Make clicks on the trigger for `item` fail with a browser error.
    pub fn with_failing_click(mut self, item: impl Into<String>) -> Self {
        self.failing_clicks.insert(item.into());
        self
    }

    /// Make every navigation fail with `message`.
    pub fn with_navigation_error(mut self, message: impl Into<String>) -> Self {
        self.navigation_error = Some(message.into());
        self
    }

    /// Make every snapshot request fail with `message`.
    pub fn with_content_error(mut self, message: impl Into<String>) -> Self {
        self.content_error = Some(message.into());
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.state().calls.clone()
    }

    /// Sum of all requested waits.
    pub fn waited(&self) -> Duration {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                SessionCall::Wait(d) => Some(*d),
                _ => None,
            })
            .sum()
    }

    /// Key of the currently open item, if any.
    pub fn open_item(&self) -> Option<String> {
        self.state().open.as_ref().map(|(item, _)| item.clone())
    }

    fn state(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, state: &ReplayState) -> String {
        let Some((item, scrolled)) = &state.open else {
            return self.page.clone();
        };
        let Some(panel) = self.panels.get(item) else {
            return self.page.clone();
        };
        let markup = match (&panel.after_scroll, scrolled) {
            (Some(after), true) => after,
            _ => &panel.markup,
        };
        self.page.replacen(MODAL_SLOT, markup, 1)
    }

    fn click_now(&self, selector: &str) -> Result<bool> {
        let mut state = self.state();
        state.calls.push(SessionCall::Click(selector.to_string()));

        let doc = Html::parse_document(&self.render(&state));
        let sel = parse_selector(selector)?;
        let Some(el) = doc.select(&sel).next() else {
            return Ok(false);
        };

        if let Some(item) = el.value().attr("data-item") {
            if self.failing_clicks.contains(item) {
                return Err(RosterError::Browser(format!(
                    "replayed click failure on item {item}"
                )));
            }
            if self.panels.contains_key(item) {
                state.open = Some((item.to_string(), false));
            }
        } else if el.value().attr("data-close").is_some()
            || el.value().classes().any(|c| c.contains("close"))
        {
            state.open = None;
        }

        Ok(true)
    }

    fn scroll_now(&self, selector: &str) -> Result<bool> {
        let mut state = self.state();
        state.calls.push(SessionCall::ScrollToEnd(selector.to_string()));

        let doc = Html::parse_document(&self.render(&state));
        let sel = parse_selector(selector)?;
        if doc.select(&sel).next().is_none() {
            return Ok(false);
        }

        if let Some((_, scrolled)) = state.open.as_mut() {
            *scrolled = true;
        }
        Ok(true)
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| RosterError::parse(format!("invalid selector '{selector}': {e}")))
}

#[async_trait]
impl BrowserSession for ReplaySession {
    async fn navigate(
        &self,
        url: &str,
        _policy: WaitPolicy,
        _timeout: Duration,
    ) -> Result<NavigationResult> {
        self.state().calls.push(SessionCall::Navigate(url.to_string()));

        if let Some(message) = &self.navigation_error {
            return Err(RosterError::Navigation(format!("{url}: {message}")));
        }

        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 0,
        })
    }

    async fn content(&self) -> Result<String> {
        let mut state = self.state();
        state.calls.push(SessionCall::Content);
        if let Some(message) = &self.content_error {
            return Err(RosterError::Browser(format!("replayed snapshot failure: {message}")));
        }
        Ok(self.render(&state))
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        self.click_now(selector)
    }

    async fn scroll_to_end(&self, selector: &str) -> Result<bool> {
        self.scroll_now(selector)
    }

    async fn wait(&self, duration: Duration) {
        self.state().calls.push(SessionCall::Wait(duration));
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state();
        state.open = None;
        state.calls.push(SessionCall::Close);
        Ok(())
    }
}
