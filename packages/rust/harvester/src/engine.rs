//! Item iteration controller.
//!
//! Drives one open/settle/extract/close cycle per roster item, strictly in
//! sequence, against a [`BrowserSession`]. Snapshots are parsed on demand and
//! never held across a suspension point.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use rosterscrape_browser::BrowserSession;
use rosterscrape_shared::{HarvestConfig, PersonRecord, Result};

use crate::accumulator::RecordAccumulator;
use crate::dom::DomSnapshot;
use crate::extractor::Extractor;
use crate::locator::{Locator, ModalState};
use crate::strategies::{ItemDiscovery, discovery_from_config};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Phases of one item cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Opening,
    Settling,
    Extracting,
    Closing,
    Recorded,
    Skipped,
}

/// Why an item produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No panel appeared after the click (or the trigger was gone).
    ModalNotDetected,
    /// A panel appeared but yielded no name.
    ExtractionIncomplete,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModalNotDetected => f.write_str("modal not detected"),
            Self::ExtractionIncomplete => f.write_str("extraction incomplete"),
        }
    }
}

/// Result of one item cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Recorded { name: String },
    Skipped(SkipReason),
    Faulted { message: String },
}

/// Summary of a completed harvest.
#[derive(Debug, Clone)]
pub struct HarvestResult {
    /// Items discovered before the loop.
    pub total_items: usize,
    pub recorded: usize,
    pub skipped_no_modal: usize,
    pub skipped_incomplete: usize,
    /// Session faults isolated to one item (index, message).
    pub faults: Vec<(usize, String)>,
    pub duration: Duration,
    /// Discovery strategy used.
    pub strategy: String,
}

impl HarvestResult {
    pub fn skipped(&self) -> usize {
        self.skipped_no_modal + self.skipped_incomplete
    }

    fn tally(&mut self, index: usize, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Recorded { .. } => self.recorded += 1,
            ItemOutcome::Skipped(SkipReason::ModalNotDetected) => self.skipped_no_modal += 1,
            ItemOutcome::Skipped(SkipReason::ExtractionIncomplete) => self.skipped_incomplete += 1,
            ItemOutcome::Faulted { message } => self.faults.push((index, message.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Receives per-item progress from the harvester.
pub trait HarvestProgress: Send + Sync {
    /// Called once, after items were counted.
    fn items_found(&self, total: usize);
    /// Called after every item cycle. `index` is zero-based.
    fn item_done(&self, index: usize, total: usize, outcome: &ItemOutcome);
}

/// No-op progress for headless/test usage.
pub struct SilentProgress;

impl HarvestProgress for SilentProgress {
    fn items_found(&self, _total: usize) {}
    fn item_done(&self, _index: usize, _total: usize, _outcome: &ItemOutcome) {}
}

// ---------------------------------------------------------------------------
// Harvester
// ---------------------------------------------------------------------------

/// Element to scroll while a panel settles, plus its current text length.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SettleTarget {
    selector: String,
    text_len: usize,
}

enum Extraction {
    NoModal,
    Incomplete,
    Record(PersonRecord),
}

/// Sequential detail-view harvester.
pub struct Harvester {
    config: HarvestConfig,
    discovery: Box<dyn ItemDiscovery>,
    locator: Locator,
    extractor: Extractor,
}

impl Harvester {
    /// Build a harvester; invalid selectors in config are rejected here.
    pub fn new(config: HarvestConfig) -> Result<Self> {
        Ok(Self {
            discovery: discovery_from_config(&config.discovery)?,
            locator: Locator::new(&config.locator)?,
            extractor: Extractor::new(&config.extractor),
            config,
        })
    }

    pub fn strategy(&self) -> &str {
        self.discovery.name()
    }

    /// Count items, then run one cycle per item.
    ///
    /// Only a failure to count is returned as an error; faults inside an
    /// item cycle are logged and the run continues with the next item.
    #[instrument(skip_all, fields(strategy = %self.discovery.name()))]
    pub async fn run(
        &self,
        session: &dyn BrowserSession,
        progress: &dyn HarvestProgress,
    ) -> Result<(HarvestResult, RecordAccumulator)> {
        let start = Instant::now();

        let markup = session.content().await?;
        let total = self.discovery.count(&DomSnapshot::parse(&markup));
        info!(total, "roster items found");
        progress.items_found(total);

        let mut result = HarvestResult {
            total_items: total,
            recorded: 0,
            skipped_no_modal: 0,
            skipped_incomplete: 0,
            faults: Vec::new(),
            duration: Duration::ZERO,
            strategy: self.discovery.name().to_string(),
        };
        let mut records = RecordAccumulator::new();

        for index in 0..total {
            let outcome = match self.harvest_item(session, index, &mut records).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(item = index + 1, total, error = %e, "item failed");
                    self.close_panel(session).await;
                    ItemOutcome::Faulted {
                        message: e.to_string(),
                    }
                }
            };

            result.tally(index, &outcome);
            progress.item_done(index, total, &outcome);
        }

        result.duration = start.elapsed();
        info!(
            recorded = result.recorded,
            skipped = result.skipped(),
            faults = result.faults.len(),
            duration_ms = result.duration.as_millis() as u64,
            "harvest complete"
        );

        Ok((result, records))
    }

    /// One Idle -> Opening -> Settling -> Extracting -> Closing cycle.
    async fn harvest_item(
        &self,
        session: &dyn BrowserSession,
        index: usize,
        records: &mut RecordAccumulator,
    ) -> Result<ItemOutcome> {
        let item = index + 1;
        let timing = &self.config.timing;
        trace_phase(item, CyclePhase::Idle);

        if timing.close_before_open {
            self.close_leftover(session).await;
            session.wait(timing.pre_open_close()).await;
        }

        // --- Opening ---
        trace_phase(item, CyclePhase::Opening);
        let markup = session.content().await?;
        let Some(trigger) = self
            .discovery
            .trigger(&DomSnapshot::parse(&markup), index)
        else {
            warn!(item, "trigger no longer present, skipping");
            return Ok(ItemOutcome::Skipped(SkipReason::ModalNotDetected));
        };

        if !session.click(&trigger).await? {
            warn!(item, %trigger, "trigger click matched nothing, skipping");
            return Ok(ItemOutcome::Skipped(SkipReason::ModalNotDetected));
        }

        let Some(target) = self.await_open(session).await? else {
            warn!(item, "no modal detected, skipping");
            trace_phase(item, CyclePhase::Skipped);
            return Ok(ItemOutcome::Skipped(SkipReason::ModalNotDetected));
        };

        // --- Settling ---
        trace_phase(item, CyclePhase::Settling);
        self.settle(session, target).await?;

        // --- Extracting ---
        trace_phase(item, CyclePhase::Extracting);
        let markup = session.content().await?;
        let outcome = match self.extract(&markup) {
            Extraction::Record(record) => {
                info!(
                    item,
                    name = %record.name,
                    team = %record.team,
                    description = %record.description_preview(50),
                    "recorded"
                );
                let name = record.name.clone();
                records.push(record);
                ItemOutcome::Recorded { name }
            }
            Extraction::Incomplete => {
                warn!(item, "panel yielded no name, skipping");
                ItemOutcome::Skipped(SkipReason::ExtractionIncomplete)
            }
            Extraction::NoModal => {
                warn!(item, "panel vanished before extraction, skipping");
                ItemOutcome::Skipped(SkipReason::ExtractionIncomplete)
            }
        };

        // --- Closing ---
        trace_phase(item, CyclePhase::Closing);
        self.close_panel(session).await;

        trace_phase(
            item,
            match outcome {
                ItemOutcome::Recorded { .. } => CyclePhase::Recorded,
                _ => CyclePhase::Skipped,
            },
        );
        Ok(outcome)
    }

    /// Poll for an open panel until `open_timeout` worth of waits elapsed.
    ///
    /// The first sample is taken one poll interval after the click, so a
    /// panel still fading out from the previous item is not mistaken for
    /// the new one.
    async fn await_open(&self, session: &dyn BrowserSession) -> Result<Option<SettleTarget>> {
        let timing = &self.config.timing;
        let mut waited = Duration::ZERO;

        loop {
            session.wait(timing.poll_interval()).await;
            waited += timing.poll_interval();

            let markup = session.content().await?;
            if let Some(target) = self.settle_target(&markup) {
                debug!(waited_ms = waited.as_millis() as u64, "modal open");
                return Ok(Some(target));
            }
            if waited >= timing.open_timeout() {
                return Ok(None);
            }
        }
    }

    /// Scroll the panel, then wait until its text length stops changing.
    /// Gives up silently after `settle_timeout`.
    async fn settle(&self, session: &dyn BrowserSession, target: SettleTarget) -> Result<()> {
        let timing = &self.config.timing;
        session.scroll_to_end(&target.selector).await?;

        let mut last_len = target.text_len;
        let mut waited = Duration::ZERO;
        while waited < timing.settle_timeout() {
            session.wait(timing.poll_interval()).await;
            waited += timing.poll_interval();

            let markup = session.content().await?;
            let Some(current) = self.settle_target(&markup) else {
                debug!("modal closed while settling");
                return Ok(());
            };
            debug!(text_len = current.text_len, last_len, "settle sample");
            if current.text_len == last_len {
                return Ok(());
            }
            last_len = current.text_len;
        }

        debug!(
            settle_timeout_ms = timing.settle_timeout_ms,
            "panel still changing, extracting anyway"
        );
        Ok(())
    }

    /// Close any panel left open by an earlier item.
    async fn close_leftover(&self, session: &dyn BrowserSession) {
        if let Err(e) = session.click(self.locator.close_selector()).await {
            debug!(error = %e, "pre-open close failed");
        }
    }

    /// Best-effort close followed by the post-close wait.
    async fn close_panel(&self, session: &dyn BrowserSession) {
        match session.click(self.locator.close_selector()).await {
            Ok(true) => {}
            Ok(false) => debug!("no close control found"),
            Err(e) => debug!(error = %e, "close failed"),
        }
        session.wait(self.config.timing.post_close()).await;
    }

    fn settle_target(&self, markup: &str) -> Option<SettleTarget> {
        let doc = DomSnapshot::parse(markup);
        match self.locator.locate(&doc) {
            ModalState::Open { settle_target, .. } => Some(SettleTarget {
                selector: settle_target.css_path(),
                text_len: settle_target.text_len,
            }),
            ModalState::NoModal { .. } => None,
        }
    }

    fn extract(&self, markup: &str) -> Extraction {
        let doc = DomSnapshot::parse(markup);
        match self.locator.locate(&doc) {
            ModalState::NoModal { .. } => Extraction::NoModal,
            ModalState::Open { panel: None, .. } => Extraction::Incomplete,
            ModalState::Open {
                panel: Some(panel), ..
            } => match self.extractor.extract(panel.element) {
                Some(record) => Extraction::Record(record),
                None => Extraction::Incomplete,
            },
        }
    }
}

fn trace_phase(item: usize, phase: CyclePhase) {
    debug!(item, ?phase, "phase");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rosterscrape_browser::{ReplaySession, SessionCall};
    use rosterscrape_shared::{DiscoveryStrategy, RosterError};

    use super::*;
    use crate::testing::load_fixture;

    fn replay() -> ReplaySession {
        ReplaySession::new(load_fixture("team_page.html"))
    }

    fn harvester() -> Harvester {
        Harvester::new(HarvestConfig::default()).unwrap()
    }

    fn names(records: &RecordAccumulator) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[derive(Default)]
    struct RecordingProgress {
        found: Mutex<Option<usize>>,
        outcomes: Mutex<Vec<(usize, ItemOutcome)>>,
    }

    impl HarvestProgress for RecordingProgress {
        fn items_found(&self, total: usize) {
            *self.found.lock().unwrap() = Some(total);
        }
        fn item_done(&self, index: usize, _total: usize, outcome: &ItemOutcome) {
            self.outcomes.lock().unwrap().push((index, outcome.clone()));
        }
    }

    #[tokio::test]
    async fn undetected_modal_is_skipped_and_run_continues() {
        let session = replay()
            .with_panel("0", load_fixture("modal_complete.html"))
            .with_panel("2", load_fixture("modal_bob.html"));
        let progress = RecordingProgress::default();

        let (result, records) = harvester().run(&session, &progress).await.unwrap();

        assert_eq!(result.total_items, 3);
        assert_eq!(result.recorded, 2);
        assert_eq!(result.skipped_no_modal, 1);
        assert!(result.faults.is_empty());
        assert_eq!(names(&records), ["Alice Moreau", "Bob Lindqvist"]);
        assert_eq!(records.as_slice()[1].team, "Beta");

        assert_eq!(*progress.found.lock().unwrap(), Some(3));
        let outcomes = progress.outcomes.lock().unwrap();
        assert_eq!(
            outcomes[1],
            (1, ItemOutcome::Skipped(SkipReason::ModalNotDetected))
        );
        assert!(session.open_item().is_none());
    }

    #[tokio::test]
    async fn session_fault_is_isolated_to_its_item() {
        let session = replay()
            .with_panel("0", load_fixture("modal_complete.html"))
            .with_panel("1", load_fixture("modal_dl_layout.html"))
            .with_panel("2", load_fixture("modal_bob.html"))
            .with_failing_click("1");

        let (result, records) = harvester().run(&session, &SilentProgress).await.unwrap();

        assert_eq!(result.recorded, 2);
        assert_eq!(result.faults.len(), 1);
        assert_eq!(result.faults[0].0, 1);
        assert!(result.faults[0].1.contains("replayed click failure"));
        assert_eq!(names(&records), ["Alice Moreau", "Bob Lindqvist"]);
    }

    #[tokio::test]
    async fn nameless_panel_is_incomplete_and_closed() {
        let session = replay().with_panel("0", load_fixture("modal_empty_name.html"));

        let (result, records) = harvester().run(&session, &SilentProgress).await.unwrap();

        assert_eq!(result.skipped_incomplete, 1);
        assert_eq!(result.skipped_no_modal, 2);
        assert!(records.is_empty());
        assert!(session.open_item().is_none());
    }

    #[tokio::test]
    async fn lazy_panel_is_scrolled_until_it_settles() {
        let session = replay().with_lazy_panel(
            "0",
            load_fixture("modal_labels_only.html"),
            load_fixture("modal_complete.html"),
        );

        let (_, records) = harvester().run(&session, &SilentProgress).await.unwrap();

        assert_eq!(names(&records), ["Alice Moreau"]);
        assert!(records.as_slice()[0].description.len() > 200);
        assert!(
            session
                .calls()
                .iter()
                .any(|call| matches!(call, SessionCall::ScrollToEnd(_)))
        );
    }

    #[tokio::test]
    async fn waits_stay_within_configured_budgets() {
        let session = replay();
        let config = HarvestConfig::default();
        let timing = config.timing.clone();

        let (result, _) = Harvester::new(config)
            .unwrap()
            .run(&session, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.skipped_no_modal, 3);
        let per_item = timing.pre_open_close() + timing.open_timeout();
        assert_eq!(session.waited(), per_item * 3);
    }

    #[tokio::test]
    async fn presence_is_sampled_one_poll_after_the_click() {
        let session = replay().with_panel("0", load_fixture("modal_complete.html"));
        let config = HarvestConfig::default();

        harvester().run(&session, &SilentProgress).await.unwrap();

        let calls = session.calls();
        let trigger_click = calls
            .iter()
            .position(|call| {
                matches!(call, SessionCall::Click(sel) if *sel != config.locator.close_selector)
            })
            .expect("trigger clicked");
        assert_eq!(
            calls[trigger_click + 1],
            SessionCall::Wait(config.timing.poll_interval())
        );
        assert_eq!(calls[trigger_click + 2], SessionCall::Content);
    }

    #[tokio::test]
    async fn image_marker_strategy_targets_the_same_items() {
        let mut config = HarvestConfig::default();
        config.discovery.strategy = DiscoveryStrategy::ImageMarker;
        let session = replay().with_panel("2", load_fixture("modal_bob.html"));

        let harvester = Harvester::new(config).unwrap();
        assert_eq!(harvester.strategy(), "image-marker");

        let (result, records) = harvester.run(&session, &SilentProgress).await.unwrap();
        assert_eq!(result.strategy, "image-marker");
        assert_eq!(names(&records), ["Bob Lindqvist"]);
    }

    #[tokio::test]
    async fn count_failure_is_fatal() {
        let session = replay().with_content_error("target closed");

        let err = harvester().run(&session, &SilentProgress).await.unwrap_err();
        assert!(matches!(err, RosterError::Browser(_)));
    }

    #[tokio::test]
    async fn repeated_runs_produce_identical_records() {
        let build = || replay().with_panel("0", load_fixture("modal_complete.html"));

        let (_, first) = harvester().run(&build(), &SilentProgress).await.unwrap();
        let (_, second) = harvester().run(&build(), &SilentProgress).await.unwrap();

        assert_eq!(
            serde_json::to_string(first.as_slice()).unwrap(),
            serde_json::to_string(second.as_slice()).unwrap()
        );
    }
}
