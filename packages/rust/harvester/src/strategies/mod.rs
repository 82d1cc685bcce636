//! Item discovery strategies.
//!
//! A strategy decides how many roster items a page holds and which element
//! opens the detail panel of the `i`-th one. Triggers are re-resolved from a
//! fresh snapshot for every item, so strategies stay stateless.

mod image_marker;
mod role_text;

use scraper::ElementRef;

use rosterscrape_shared::{DiscoveryConfig, DiscoveryStrategy, Result};

use crate::dom::{self, DomSnapshot};

pub use image_marker::ImageMarkerDiscovery;
pub use role_text::RoleTextDiscovery;

/// Counts roster items and resolves their click targets.
pub trait ItemDiscovery: Send + Sync {
    /// Strategy name for tracing.
    fn name(&self) -> &str;

    /// Click targets of every item, in document order.
    fn triggers<'a>(&self, doc: &'a DomSnapshot) -> Vec<ElementRef<'a>>;

    /// Number of items on the page.
    fn count(&self, doc: &DomSnapshot) -> usize {
        self.triggers(doc).len()
    }

    /// Live-page selector of the `index`-th trigger, if it still exists.
    fn trigger(&self, doc: &DomSnapshot, index: usize) -> Option<String> {
        self.triggers(doc).get(index).map(|el| dom::css_path(*el))
    }
}

/// Build the strategy selected in config.
pub fn discovery_from_config(config: &DiscoveryConfig) -> Result<Box<dyn ItemDiscovery>> {
    let discovery: Box<dyn ItemDiscovery> = match config.strategy {
        DiscoveryStrategy::RoleText => Box::new(RoleTextDiscovery::new(
            &config.role_selector,
            &config.role_labels,
        )?),
        DiscoveryStrategy::ImageMarker => {
            Box::new(ImageMarkerDiscovery::new(&config.marker_selector)?)
        }
    };
    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::load_fixture;

    #[test]
    fn strategies_agree_on_fixture_page() {
        let doc = DomSnapshot::parse(&load_fixture("team_page.html"));

        let mut config = DiscoveryConfig::default();
        let role_text = discovery_from_config(&config).unwrap();
        config.strategy = DiscoveryStrategy::ImageMarker;
        let image_marker = discovery_from_config(&config).unwrap();

        assert_eq!(role_text.name(), "role-text");
        assert_eq!(image_marker.name(), "image-marker");
        assert_eq!(role_text.count(&doc), 3);
        assert_eq!(image_marker.count(&doc), 3);

        for i in 0..3 {
            assert_eq!(role_text.trigger(&doc, i), image_marker.trigger(&doc, i));
        }
        assert!(role_text.trigger(&doc, 3).is_none());
    }

    #[test]
    fn bad_selector_in_config_is_an_error() {
        let config = DiscoveryConfig {
            strategy: DiscoveryStrategy::ImageMarker,
            marker_selector: "img[".into(),
            ..DiscoveryConfig::default()
        };
        assert!(discovery_from_config(&config).is_err());
    }
}
