//! Turns a located detail panel into a [`PersonRecord`].

use scraper::ElementRef;

use rosterscrape_shared::{
    is_schema_label, ExtractorConfig, PersonRecord, LABEL_CENTER_OF_EXCELLENCE,
    LABEL_INVESTMENT_STRATEGY, LABEL_NAME, LABEL_REGION, LABEL_TEAM, SCHEMA_LABELS,
};

use crate::dom;

/// Reads labelled fields and the biography out of a panel.
#[derive(Debug, Clone)]
pub struct Extractor {
    description_min_chars: usize,
}

impl Extractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            description_min_chars: config.description_min_chars,
        }
    }

    /// Extract a record from `panel`. Returns `None` when no name was found;
    /// every other field falls back to an empty string.
    pub fn extract(&self, panel: ElementRef<'_>) -> Option<PersonRecord> {
        let record = PersonRecord {
            name: field_value(panel, LABEL_NAME),
            team: field_value(panel, LABEL_TEAM),
            region: field_value(panel, LABEL_REGION),
            center_of_excellence: field_value(panel, LABEL_CENTER_OF_EXCELLENCE),
            investment_strategy: field_value(panel, LABEL_INVESTMENT_STRATEGY),
            description: self.description(panel),
        };

        record.is_valid().then_some(record)
    }

    /// Longest leaf text above the threshold that does not mention a label.
    pub fn description(&self, panel: ElementRef<'_>) -> String {
        dom::leaf_texts(panel)
            .into_iter()
            .filter(|text| text.chars().count() > self.description_min_chars)
            .filter(|text| !SCHEMA_LABELS.iter().any(|label| text.contains(label)))
            .fold(String::new(), |longest, text| {
                if text.chars().count() > longest.chars().count() {
                    text
                } else {
                    longest
                }
            })
    }
}

/// Value shown next to `label` inside `panel`, or an empty string.
///
/// The label is the first element whose own text equals it exactly. The value
/// is its next element sibling, or failing that the next sibling of the
/// label's parent (for layouts like `<dt><span>Name</span></dt><dd>..</dd>`).
pub fn field_value(panel: ElementRef<'_>, label: &str) -> String {
    let Some(label_el) = panel
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| dom::own_text(*el) == label)
    else {
        return String::new();
    };

    if let Some(value) = dom::next_element_sibling(label_el)
        .map(|sibling| dom::text_content(sibling).trim().to_string())
        .filter(|text| !text.is_empty() && !is_schema_label(text))
    {
        return value;
    }

    dom::parent_element(label_el)
        .filter(|parent| parent.id() != panel.id() && dom::is_within(*parent, panel))
        .and_then(dom::next_element_sibling)
        // A sibling holding a label element is the next label/value pair.
        .filter(|sibling| !holds_label_element(*sibling))
        .map(|sibling| dom::text_content(sibling).trim().to_string())
        .unwrap_or_default()
}

/// Whether `el` or any element below it has own text equal to a schema label.
fn holds_label_element(el: ElementRef<'_>) -> bool {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| is_schema_label(&dom::own_text(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomSnapshot;
    use crate::locator::Locator;
    use crate::testing::page_with;
    use rosterscrape_shared::LocatorConfig;

    fn extract_from(panel_fixture: &str) -> Option<PersonRecord> {
        let doc = DomSnapshot::parse(&page_with(panel_fixture));
        let locator = Locator::new(&LocatorConfig::default()).unwrap();
        let panel = locator.panel(&doc).expect("panel located");
        Extractor::new(&ExtractorConfig::default()).extract(panel.element)
    }

    #[test]
    fn complete_panel_extracts_every_field() {
        let record = extract_from("modal_complete.html").expect("record");
        assert_eq!(record.name, "Alice Moreau");
        assert_eq!(record.team, "Alpha");
        assert_eq!(record.region, "EMEA");
        assert_eq!(record.center_of_excellence, "Digital");
        assert_eq!(record.investment_strategy, "Growth Equity");
        assert!(record.description.starts_with("Alice Moreau joined the accelerator"));
        assert!(record.description.ends_with("long-distance cyclist."));
    }

    #[test]
    fn missing_team_yields_empty_field() {
        let record = extract_from("modal_missing_team.html").expect("record");
        assert_eq!(record.name, "Erin Walsh");
        assert_eq!(record.team, "");
        assert_eq!(record.region, "North America");
        assert_eq!(record.investment_strategy, "Private Credit");
        assert!(record.description.starts_with("Erin Walsh supports"));
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(extract_from("modal_empty_name.html").is_none());
    }

    #[test]
    fn definition_list_layout_uses_parent_sibling() {
        let record = extract_from("modal_dl_layout.html").expect("record");
        assert_eq!(record.name, "Dana Ito");
        assert_eq!(record.team, "Gamma");
        assert_eq!(record.center_of_excellence, "Commercial");
        // <br> children keep the bio a leaf
        assert!(record.description.starts_with("Dana Ito advises"));
        assert!(record.description.ends_with("Based in Singapore."));
    }

    #[test]
    fn description_is_longest_long_text_without_labels() {
        let doc = DomSnapshot::parse(
            r#"<html><body><div id="p">
                <p>short text</p>
                <p>aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa</p>
                <p>Team bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb</p>
                <p>cccccccccccccccccccccccccccccccccccccccccccccccccc</p>
            </div></body></html>"#,
        );
        let panel = doc.select(None, &dom::compile_selector("#p").unwrap())[0];
        let extractor = Extractor::new(&ExtractorConfig {
            description_min_chars: 30,
        });
        assert_eq!(extractor.description(panel), "c".repeat(50));

        let strict = Extractor::new(&ExtractorConfig {
            description_min_chars: 50,
        });
        assert_eq!(strict.description(panel), "");
    }

    #[test]
    fn value_equal_to_a_label_is_not_taken() {
        let doc = DomSnapshot::parse(
            r#"<html><body><div id="p">
                <div><div>Name</div><div>Region</div></div>
                <div><div>Team</div><div>Delta</div></div>
            </div></body></html>"#,
        );
        let panel = doc.select(None, &dom::compile_selector("#p").unwrap())[0];
        assert_eq!(field_value(panel, LABEL_NAME), "");
        assert_eq!(field_value(panel, LABEL_TEAM), "Delta");
    }

    #[test]
    fn parent_sibling_value_may_contain_label_words() {
        let doc = DomSnapshot::parse(
            r#"<html><body><dl id="p">
                <dt><span>Name</span></dt><dd>Nora Namewright</dd>
                <dt><span>Team</span></dt><dd>Teams Platform</dd>
                <dt><span>Region</span></dt><dd>Regional Coverage</dd>
                <dt><span>Investment Strategy</span></dt><dd></dd>
            </dl></body></html>"#,
        );
        let panel = doc.select(None, &dom::compile_selector("#p").unwrap())[0];
        assert_eq!(field_value(panel, LABEL_NAME), "Nora Namewright");
        assert_eq!(field_value(panel, LABEL_TEAM), "Teams Platform");
        assert_eq!(field_value(panel, LABEL_REGION), "Regional Coverage");
        assert_eq!(field_value(panel, LABEL_INVESTMENT_STRATEGY), "");
    }

    #[test]
    fn extraction_is_idempotent() {
        let first = extract_from("modal_complete.html").expect("record");
        let second = extract_from("modal_complete.html").expect("record");
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
