//! Detail panel detection.
//!
//! A panel is recognised purely by its text: every schema label must appear
//! in it. Because wrappers of the panel (and usually the page itself) also
//! contain every label, the locator picks the first candidate whose text
//! length falls inside a configured window.

use scraper::{ElementRef, Selector};
use serde::Serialize;

use rosterscrape_shared::{LocatorConfig, Result, SCHEMA_LABELS};

use crate::dom::{self, DomSnapshot, TextPredicate};

/// Minimum number of label-bearing candidates for a panel to count as open.
///
/// The page wrapper alone always yields one; an open panel adds at least
/// itself.
const MIN_CANDIDATES: usize = 2;

/// A label-bearing element and its text length.
#[derive(Debug, Clone, Copy)]
pub struct Panel<'a> {
    pub element: ElementRef<'a>,
    pub text_len: usize,
}

impl Panel<'_> {
    /// Selector addressing this element in the live page.
    pub fn css_path(&self) -> String {
        dom::css_path(self.element)
    }
}

/// What the locator sees in a snapshot.
#[derive(Debug)]
pub enum ModalState<'a> {
    NoModal {
        candidates: usize,
    },
    Open {
        /// The disambiguated panel, `None` while its content is still below
        /// the window.
        panel: Option<Panel<'a>>,
        /// Element to scroll while the panel settles.
        settle_target: Panel<'a>,
    },
}

/// A candidate as reported by `calibrate`.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub selector: String,
    pub text_len: usize,
    pub in_window: bool,
}

/// Finds the open detail panel in a snapshot.
#[derive(Debug, Clone)]
pub struct Locator {
    candidate_selector: Selector,
    labels: TextPredicate,
    min_chars: usize,
    max_chars: usize,
    close_selector: String,
}

impl Locator {
    pub fn new(config: &LocatorConfig) -> Result<Self> {
        // Validate early; the close selector is only ever evaluated in the page.
        dom::compile_selector(&config.close_selector)?;

        Ok(Self {
            candidate_selector: dom::compile_selector(&config.candidate_selector)?,
            labels: TextPredicate::ContainsAll(
                SCHEMA_LABELS.iter().map(|l| l.to_string()).collect(),
            ),
            min_chars: config.panel_min_chars,
            max_chars: config.panel_max_chars,
            close_selector: config.close_selector.clone(),
        })
    }

    pub fn close_selector(&self) -> &str {
        &self.close_selector
    }

    fn in_window(&self, text_len: usize) -> bool {
        text_len > self.min_chars && text_len < self.max_chars
    }

    /// Every element containing all schema labels, in document order.
    pub fn candidates<'a>(&self, doc: &'a DomSnapshot) -> Vec<Panel<'a>> {
        doc.query(None, &self.candidate_selector, &self.labels)
            .into_iter()
            .map(|element| Panel {
                element,
                text_len: dom::text_len(element),
            })
            .collect()
    }

    pub fn locate<'a>(&self, doc: &'a DomSnapshot) -> ModalState<'a> {
        let candidates = self.candidates(doc);
        if candidates.len() < MIN_CANDIDATES {
            return ModalState::NoModal {
                candidates: candidates.len(),
            };
        }

        let panel = candidates
            .iter()
            .copied()
            .find(|c| self.in_window(c.text_len));

        // Smallest candidate is the most specific container holding all labels.
        let settle_target = match panel {
            Some(panel) => panel,
            None => candidates
                .iter()
                .copied()
                .min_by_key(|c| c.text_len)
                .unwrap_or(candidates[0]),
        };

        ModalState::Open {
            panel,
            settle_target,
        }
    }

    /// The disambiguated panel, if one is open and inside the window.
    pub fn panel<'a>(&self, doc: &'a DomSnapshot) -> Option<Panel<'a>> {
        match self.locate(doc) {
            ModalState::Open { panel, .. } => panel,
            ModalState::NoModal { .. } => None,
        }
    }

    /// All candidates with their window membership, for threshold tuning.
    pub fn calibrate(&self, doc: &DomSnapshot) -> Vec<Candidate> {
        self.candidates(doc)
            .into_iter()
            .map(|c| Candidate {
                selector: c.css_path(),
                text_len: c.text_len,
                in_window: self.in_window(c.text_len),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{load_fixture, page_with};

    fn locator() -> Locator {
        Locator::new(&LocatorConfig::default()).unwrap()
    }

    #[test]
    fn closed_page_has_single_candidate() {
        let doc = DomSnapshot::parse(&load_fixture("team_page.html"));
        let state = locator().locate(&doc);
        assert!(matches!(state, ModalState::NoModal { candidates: 1 }));
    }

    #[test]
    fn open_panel_is_disambiguated_by_length() {
        let doc = DomSnapshot::parse(&page_with("modal_complete.html"));
        let locator = locator();
        assert!(matches!(locator.locate(&doc), ModalState::Open { panel: Some(_), .. }));

        let panel = locator.panel(&doc).expect("panel in window");
        assert!(panel.text_len > 900 && panel.text_len < 5000);
        assert_eq!(panel.element.value().attr("class"), Some("person-detail"));
    }

    #[test]
    fn label_only_panel_settles_on_smallest_candidate() {
        let doc = DomSnapshot::parse(&page_with("modal_labels_only.html"));
        match locator().locate(&doc) {
            ModalState::Open {
                panel,
                settle_target,
            } => {
                assert!(panel.is_none());
                assert_eq!(settle_target.element.value().attr("class"), Some("detail-fields"));
            }
            other => panic!("expected open modal, got {other:?}"),
        }
    }

    #[test]
    fn calibration_reports_every_candidate() {
        let doc = DomSnapshot::parse(&page_with("modal_complete.html"));
        let report = locator().calibrate(&doc);

        assert!(report.len() >= 2);
        assert_eq!(report.iter().filter(|c| c.in_window).count(), 1);
        // Page wrapper comes first and is far above the window
        assert!(report[0].text_len >= 5000);
        assert!(!report[0].in_window);
        assert!(report.iter().all(|c| c.selector.starts_with("html > body")));
    }

    #[test]
    fn window_bounds_are_exclusive() {
        let config = LocatorConfig {
            panel_min_chars: 10,
            panel_max_chars: 20,
            ..LocatorConfig::default()
        };
        let locator = Locator::new(&config).unwrap();
        assert!(!locator.in_window(10));
        assert!(locator.in_window(11));
        assert!(locator.in_window(19));
        assert!(!locator.in_window(20));
    }

    #[test]
    fn invalid_selectors_are_rejected() {
        let config = LocatorConfig {
            close_selector: ".close[".into(),
            ..LocatorConfig::default()
        };
        assert!(Locator::new(&config).is_err());
    }
}
