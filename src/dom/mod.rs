pub mod document;
pub mod locator;

pub use document::{is_disabled, is_hidden};
pub use locator::{xpath_literal, ElementHandle, ElementSelector, Locator};
