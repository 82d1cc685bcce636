use scraper::{ElementRef, Selector};

use rosterscrape_shared::Result;

use crate::dom::{self, DomSnapshot, TextPredicate};

use super::ItemDiscovery;

/// Items are the cards showing a role string; the trigger is the card's image.
///
/// Role elements are those whose trimmed text is exactly one of the role
/// labels. The clickable target is the first `<img>` inside the role
/// element's parent, or the parent itself when the card has no image.
#[derive(Debug, Clone)]
pub struct RoleTextDiscovery {
    role_selector: Selector,
    roles: TextPredicate,
    image: Selector,
}

impl RoleTextDiscovery {
    pub fn new(role_selector: &str, role_labels: &[String]) -> Result<Self> {
        Ok(Self {
            role_selector: dom::compile_selector(role_selector)?,
            roles: TextPredicate::ExactlyOneOf(
                role_labels
                    .iter()
                    .map(|label| label.trim().to_string())
                    .filter(|label| !label.is_empty())
                    .collect(),
            ),
            image: dom::compile_selector("img")?,
        })
    }
}

impl ItemDiscovery for RoleTextDiscovery {
    fn name(&self) -> &str {
        "role-text"
    }

    fn triggers<'a>(&self, doc: &'a DomSnapshot) -> Vec<ElementRef<'a>> {
        doc.query(None, &self.role_selector, &self.roles)
            .into_iter()
            .map(|role| match dom::parent_element(role) {
                Some(card) => card.select(&self.image).next().unwrap_or(card),
                None => role,
            })
            .collect()
    }
}
