//! Locator evaluation over parsed HTML.
//!
//! Mirrors what the generated XPath does in a live page, for markup that is
//! already in hand.

use super::{ElementSelector, Locator};
use scraper::{ElementRef, Html};

impl ElementSelector {
    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        let value = element.value();
        if let Some(tag) = &self.tag {
            if !value.name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if value.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes
            .iter()
            .all(|class| value.classes().any(|c| c == class))
    }
}

impl Locator {
    /// Matches in document order.
    pub fn find_in<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match self {
            Locator::Element { selector } => elements(document)
                .filter(|el| selector.matches(el))
                .collect(),
            Locator::ElementWithText { selector, text } => {
                let needle = text.to_lowercase();
                elements(document)
                    .filter(|el| selector.matches(el) && normalized_text(el).contains(&needle))
                    .collect()
            }
            Locator::SiblingOfText { text, selector } => {
                let needle = text.to_lowercase();
                let Some(anchor) = elements(document).find(|el| owns_text(el, &needle)) else {
                    return Vec::new();
                };

                let mut before: Vec<ElementRef<'a>> = anchor
                    .prev_siblings()
                    .filter_map(ElementRef::wrap)
                    .filter(|el| selector.matches(el))
                    .collect();
                before.reverse();
                before.extend(
                    anchor
                        .next_siblings()
                        .filter_map(ElementRef::wrap)
                        .filter(|el| selector.matches(el)),
                );
                before
            }
        }
    }
}

/// Hidden through the `hidden` attribute or an inline style, on the element
/// or any ancestor.
pub fn is_hidden(element: &ElementRef<'_>) -> bool {
    std::iter::once(*element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| {
            let value = el.value();
            let style: String = value
                .attr("style")
                .unwrap_or_default()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_lowercase();
            value.attr("hidden").is_some()
                || style.contains("display:none")
                || style.contains("visibility:hidden")
        })
}

pub fn is_disabled(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("disabled").is_some() || value.classes().any(|c| c == "disabled")
}

fn elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document.root_element().descendants().filter_map(ElementRef::wrap)
}

fn normalized_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn owns_text(element: &ElementRef<'_>, needle: &str) -> bool {
    element.children().any(|child| {
        child
            .value()
            .as_text()
            .map(|text| text.to_lowercase().contains(needle))
            .unwrap_or(false)
    })
}
