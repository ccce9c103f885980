use crate::errors::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// A simple `tag#id.class` selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSelector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl ElementSelector {
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }

    pub fn to_css(&self) -> String {
        let mut css = self.tag.clone().unwrap_or_default();
        if let Some(id) = &self.id {
            css.push('#');
            css.push_str(id);
        }
        for class in &self.classes {
            css.push('.');
            css.push_str(class);
        }
        if css.is_empty() {
            css.push('*');
        }
        css
    }

    /// XPath step (`tag[predicates]`) matching this selector.
    pub fn to_xpath_step(&self) -> String {
        let mut conditions = Vec::new();
        if let Some(id) = &self.id {
            conditions.push(format!("@id={}", xpath_literal(id)));
        }
        for class in &self.classes {
            conditions.push(format!(
                "contains(concat(' ', normalize-space(@class), ' '), {})",
                xpath_literal(&format!(" {} ", class))
            ));
        }

        let tag = self.tag.as_deref().unwrap_or("*");
        if conditions.is_empty() {
            tag.to_string()
        } else {
            format!("{}[{}]", tag, conditions.join(" and "))
        }
    }
}

impl FromStr for ElementSelector {
    type Err = BrowserError;

    fn from_str(input: &str) -> Result<Self> {
        let input = input.trim();
        let invalid = || BrowserError::InvalidSelector(input.to_string());

        let mut selector = ElementSelector {
            tag: None,
            id: None,
            classes: Vec::new(),
        };

        let is_name_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
        let tag_len = input.find(|c: char| !is_name_char(c)).unwrap_or(input.len());
        if tag_len > 0 {
            selector.tag = Some(input[..tag_len].to_ascii_lowercase());
        }

        let mut rest = &input[tag_len..];
        while let Some(marker) = rest.chars().next() {
            if marker != '#' && marker != '.' {
                return Err(invalid());
            }
            let body = &rest[1..];
            let len = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
            if len == 0 {
                return Err(invalid());
            }
            let name = body[..len].to_string();
            match marker {
                '#' if selector.id.is_none() => selector.id = Some(name),
                '.' => selector.classes.push(name),
                _ => return Err(invalid()),
            }
            rest = &body[len..];
        }

        if selector.tag.is_none() && selector.id.is_none() && selector.classes.is_empty() {
            return Err(invalid());
        }
        Ok(selector)
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// How to find candidate elements in one document.
///
/// Text matching is a case-insensitive substring test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Locator {
    /// Every element matching the selector.
    Element { selector: ElementSelector },
    /// Elements matching the selector whose text contains `text`.
    ElementWithText {
        selector: ElementSelector,
        text: String,
    },
    /// Siblings of the first element owning a text node that contains
    /// `text`, filtered by the selector, in document order.
    SiblingOfText {
        text: String,
        selector: ElementSelector,
    },
}

impl Locator {
    pub fn element(selector: ElementSelector) -> Self {
        Locator::Element { selector }
    }

    pub fn to_xpath(&self) -> String {
        match self {
            Locator::Element { selector } => format!("//{}", selector.to_xpath_step()),
            Locator::ElementWithText { selector, text } => format!(
                "//{}[{}]",
                selector.to_xpath_step(),
                contains_ignore_case("normalize-space(.)", text)
            ),
            Locator::SiblingOfText { text, selector } => {
                let anchor = format!("(//*[text()[{}]])[1]", contains_ignore_case(".", text));
                let step = selector.to_xpath_step();
                format!(
                    "{anchor}/preceding-sibling::{step} | {anchor}/following-sibling::{step}"
                )
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Element { selector } => write!(f, "{}", selector),
            Locator::ElementWithText { selector, text } => {
                write!(f, "{}:has-text({:?})", selector, text)
            }
            Locator::SiblingOfText { text, selector } => {
                write!(f, "text({:?}) ~ {}", text, selector)
            }
        }
    }
}

/// A re-resolvable reference to one matched element: the locator, the
/// frame it was found in (`None` for the top document) and the match index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    pub locator: Locator,
    pub frame: Option<usize>,
    pub index: usize,
}

impl ElementHandle {
    pub fn first(locator: Locator, frame: Option<usize>) -> Self {
        Self {
            locator,
            frame,
            index: 0,
        }
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(frame) = self.frame {
            write!(f, "frame[{}] >> ", frame)?;
        }
        write!(f, "{} >> nth={}", self.locator, self.index)
    }
}

fn contains_ignore_case(expr: &str, needle: &str) -> String {
    format!(
        "contains(translate({}, '{}', '{}'), {})",
        expr,
        UPPER,
        LOWER,
        xpath_literal(&needle.to_lowercase())
    )
}

/// Quotes a string for XPath 1.0, which has no escape sequences.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value
            .split('\'')
            .map(|part| format!("'{}'", part))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}
