//! Read-only queries over a parsed snapshot of the rendered document.
//!
//! Every engine decision is made against a [`DomSnapshot`] taken right before
//! it; elements are addressed back in the live page through [`css_path`].

use scraper::{ElementRef, Html, Selector};

use rosterscrape_shared::{Result, RosterError};

/// Tag whose presence alone does not disqualify a leaf element.
const LINE_BREAK_TAG: &str = "br";

/// Compile a CSS selector, reporting invalid input as a parse error.
pub fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| RosterError::parse(format!("invalid selector '{selector}': {e}")))
}

// ---------------------------------------------------------------------------
// Text predicates
// ---------------------------------------------------------------------------

/// Predicate over an element's text content.
#[derive(Debug, Clone)]
pub enum TextPredicate {
    /// Trimmed text equals one of the strings.
    ExactlyOneOf(Vec<String>),
    /// Text contains every one of the strings.
    ContainsAll(Vec<String>),
}

impl TextPredicate {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::ExactlyOneOf(options) => {
                let trimmed = text.trim();
                options.iter().any(|o| o == trimmed)
            }
            Self::ContainsAll(needles) => needles.iter().all(|n| text.contains(n.as_str())),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A parsed, immutable copy of the document at one instant.
pub struct DomSnapshot {
    html: Html,
}

impl DomSnapshot {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// The document element (`<html>`).
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// Elements matching `selector` in document order, optionally inside `scope`.
    pub fn select<'a>(
        &'a self,
        scope: Option<ElementRef<'a>>,
        selector: &Selector,
    ) -> Vec<ElementRef<'a>> {
        match scope {
            Some(scope) => scope.select(selector).collect(),
            None => self.html.select(selector).collect(),
        }
    }

    /// Elements matching `selector` whose text content satisfies `predicate`.
    pub fn query<'a>(
        &'a self,
        scope: Option<ElementRef<'a>>,
        selector: &Selector,
        predicate: &TextPredicate,
    ) -> Vec<ElementRef<'a>> {
        self.select(scope, selector)
            .into_iter()
            .filter(|el| predicate.matches(&text_content(*el)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Element helpers
// ---------------------------------------------------------------------------

/// Concatenated text of all descendant text nodes (`textContent`).
pub fn text_content(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// Length of [`text_content`] in characters.
pub fn text_len(el: ElementRef<'_>) -> usize {
    el.text().map(|t| t.chars().count()).sum()
}

/// Trimmed text of the element's own text-node children only.
pub fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Element children of `el`.
pub fn child_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.children().filter_map(ElementRef::wrap)
}

/// An element with no element children, or only line breaks.
pub fn is_leaf(el: ElementRef<'_>) -> bool {
    child_elements(el).all(|child| child.value().name() == LINE_BREAK_TAG)
}

/// Trimmed, non-empty texts of the leaf elements below `scope`, in document order.
pub fn leaf_texts(scope: ElementRef<'_>) -> Vec<String> {
    scope
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() != LINE_BREAK_TAG && is_leaf(*el))
        .map(|el| text_content(el).trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

/// The next sibling that is an element.
pub fn next_element_sibling(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// The parent, if it is an element.
pub fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

/// Whether `el` is `ancestor` or lies below it.
pub fn is_within(el: ElementRef<'_>, ancestor: ElementRef<'_>) -> bool {
    el.id() == ancestor.id() || el.ancestors().any(|node| node.id() == ancestor.id())
}

/// A CSS selector that addresses exactly `el` from the document root,
/// e.g. `html > body:nth-child(2) > div:nth-child(3)`.
pub fn css_path(el: ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    let mut current = Some(el);

    while let Some(node) = current {
        let name = node.value().name();
        let parent = parent_element(node);
        match parent {
            Some(_) => {
                let position = node
                    .prev_siblings()
                    .filter(|sibling| sibling.value().is_element())
                    .count()
                    + 1;
                segments.push(format!("{name}:nth-child({position})"));
            }
            None => segments.push(name.to_string()),
        }
        current = parent;
    }

    segments.reverse();
    segments.join(" > ")
}
