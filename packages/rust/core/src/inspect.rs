//! Offline inspection of saved page snapshots.
//!
//! Runs the locator and extractor over a captured document without a
//! browser, for checking extraction and calibrating the panel window.

use serde::Serialize;

use rosterscrape_harvester::{Candidate, DomSnapshot, Extractor, Locator, ModalState};
use rosterscrape_shared::{HarvestConfig, PersonRecord, Result};

/// What the engine would see in a snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SnapshotExtraction {
    /// Fewer than two label-bearing candidates.
    NoModal { candidates: usize },
    /// A panel is open but none of its containers is inside the length window.
    OutsideWindow { candidates: Vec<Candidate> },
    /// A panel was located but yielded no name.
    Incomplete { panel: Candidate },
    Extracted { panel: Candidate, record: PersonRecord },
}

/// Locate and extract the open panel in `markup`.
pub fn extract_snapshot(markup: &str, config: &HarvestConfig) -> Result<SnapshotExtraction> {
    let locator = Locator::new(&config.locator)?;
    let extractor = Extractor::new(&config.extractor);
    let doc = DomSnapshot::parse(markup);

    Ok(match locator.locate(&doc) {
        ModalState::NoModal { candidates } => SnapshotExtraction::NoModal { candidates },
        ModalState::Open { panel: None, .. } => SnapshotExtraction::OutsideWindow {
            candidates: locator.calibrate(&doc),
        },
        ModalState::Open {
            panel: Some(panel), ..
        } => {
            let summary = Candidate {
                selector: panel.css_path(),
                text_len: panel.text_len,
                in_window: true,
            };
            match extractor.extract(panel.element) {
                Some(record) => SnapshotExtraction::Extracted {
                    panel: summary,
                    record,
                },
                None => SnapshotExtraction::Incomplete { panel: summary },
            }
        }
    })
}

/// Every label-bearing candidate in `markup` with its text length.
pub fn calibrate_snapshot(markup: &str, config: &HarvestConfig) -> Result<Vec<Candidate>> {
    let locator = Locator::new(&config.locator)?;
    Ok(locator.calibrate(&DomSnapshot::parse(markup)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn page_with(panel: &str) -> String {
        load_fixture("team_page.html").replacen("<!--modal-->", &load_fixture(panel), 1)
    }

    #[test]
    fn extracts_record_from_saved_snapshot() {
        let result =
            extract_snapshot(&page_with("modal_bob.html"), &HarvestConfig::default()).unwrap();
        match result {
            SnapshotExtraction::Extracted { panel, record } => {
                assert_eq!(record.name, "Bob Lindqvist");
                assert_eq!(record.investment_strategy, "Buyout");
                assert!(panel.selector.starts_with("html > body"));
            }
            other => panic!("expected a record, got {other:?}"),
        }
    }

    #[test]
    fn reports_why_nothing_was_extracted() {
        let config = HarvestConfig::default();

        let closed = extract_snapshot(&load_fixture("team_page.html"), &config).unwrap();
        assert!(matches!(closed, SnapshotExtraction::NoModal { candidates: 1 }));

        let loading = extract_snapshot(&page_with("modal_labels_only.html"), &config).unwrap();
        match loading {
            SnapshotExtraction::OutsideWindow { candidates } => {
                assert!(candidates.iter().all(|c| !c.in_window));
            }
            other => panic!("expected outside-window, got {other:?}"),
        }

        let nameless = extract_snapshot(&page_with("modal_empty_name.html"), &config).unwrap();
        assert!(matches!(nameless, SnapshotExtraction::Incomplete { .. }));
    }

    #[test]
    fn extraction_serializes_with_status_tag() {
        let result = extract_snapshot(&page_with("modal_complete.html"), &HarvestConfig::default())
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "extracted");
        assert_eq!(json["record"]["centerOfExcellence"], "Digital");
    }

    #[test]
    fn calibration_lists_candidates() {
        let candidates =
            calibrate_snapshot(&page_with("modal_complete.html"), &HarvestConfig::default())
                .unwrap();
        assert_eq!(candidates.iter().filter(|c| c.in_window).count(), 1);
    }
}
