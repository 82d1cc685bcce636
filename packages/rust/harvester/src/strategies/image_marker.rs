use scraper::{ElementRef, Selector};

use rosterscrape_shared::Result;

use crate::dom::{self, DomSnapshot};

use super::ItemDiscovery;

/// Items are the clickable images matching a marker selector.
#[derive(Debug, Clone)]
pub struct ImageMarkerDiscovery {
    marker: Selector,
}

impl ImageMarkerDiscovery {
    pub fn new(marker_selector: &str) -> Result<Self> {
        Ok(Self {
            marker: dom::compile_selector(marker_selector)?,
        })
    }
}

impl ItemDiscovery for ImageMarkerDiscovery {
    fn name(&self) -> &str {
        "image-marker"
    }

    fn triggers<'a>(&self, doc: &'a DomSnapshot) -> Vec<ElementRef<'a>> {
        doc.select(None, &self.marker)
    }
}
