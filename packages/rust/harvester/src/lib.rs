//! Detail-view extraction engine.
//!
//! This crate provides:
//! - [`dom`]: text predicates and element helpers over parsed snapshots
//! - [`locator`]: detects the open detail panel and picks the right container
//! - [`extractor`]: reads labelled fields and the biography into a record
//! - [`strategies`]: pluggable item discovery (role text, image marker)
//! - [`engine`]: the sequential open/settle/extract/close controller

pub mod accumulator;
pub mod dom;
pub mod engine;
pub mod extractor;
pub mod locator;
pub mod strategies;

pub use accumulator::RecordAccumulator;
pub use dom::DomSnapshot;
pub use engine::{
    CyclePhase, HarvestProgress, HarvestResult, Harvester, ItemOutcome, SilentProgress, SkipReason,
};
pub use extractor::Extractor;
pub use locator::{Candidate, Locator, ModalState, Panel};
pub use strategies::{
    ImageMarkerDiscovery, ItemDiscovery, RoleTextDiscovery, discovery_from_config,
};

#[cfg(test)]
pub(crate) mod testing {
    use rosterscrape_browser::MODAL_SLOT;

    pub fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    /// The fixture page with `panel_fixture` rendered into its modal slot.
    pub fn page_with(panel_fixture: &str) -> String {
        load_fixture("team_page.html").replacen(MODAL_SLOT, &load_fixture(panel_fixture), 1)
    }
}
