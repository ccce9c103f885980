//! Script builders for element work that has to happen inside the page,
//! most notably anything inside an embedded frame.
//!
//! Every script is a self-invoking function that resolves the target
//! document (top document or `iframe`/`frame` number N), evaluates an XPath
//! against it and returns a primitive (lists come back JSON-encoded). An
//! unreachable document (missing or cross-origin frame) yields `null`.
//!
//! Frames are numbered depth-first in document order, nested frames
//! included. A cross-origin frame is counted but its children are not.

use crate::dom::ElementHandle;

const ALL_FRAMES: &str = r#"
    const allFrames = (root) => {
        const found = [];
        const visit = (doc) => {
            for (const frame of doc.querySelectorAll('iframe, frame')) {
                found.push(frame);
                let inner = null;
                try {
                    inner = frame.contentDocument;
                } catch (e) {}
                if (inner) {
                    visit(inner);
                }
            }
        };
        visit(root);
        return found;
    };
"#;

const RESOLVE_DOCUMENT: &str = r#"
    const frameIndex = __FRAME__;
    const doc = (function() {
        if (frameIndex === null) {
            return document;
        }
        const frame = allFrames(document)[frameIndex];
        try {
            return frame ? frame.contentDocument : null;
        } catch (e) {
            return null;
        }
    })();
    if (!doc) {
        return null;
    }
    const snapshot = doc.evaluate(
        __XPATH__, doc, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
"#;

fn with_snapshot(xpath: &str, frame: Option<usize>, body: &str) -> String {
    let frame = frame
        .map(|index| index.to_string())
        .unwrap_or_else(|| "null".to_string());
    // serde_json string encoding is a valid JS string literal
    let xpath = serde_json::Value::String(xpath.to_string()).to_string();
    let prelude = RESOLVE_DOCUMENT
        .replace("__FRAME__", &frame)
        .replace("__XPATH__", &xpath);
    format!("(function() {{{}{}{}}})()", ALL_FRAMES, prelude, body)
}

fn with_element(element: &ElementHandle, body: &str) -> String {
    let body = format!(
        r#"
    const el = snapshot.snapshotItem({});
    if (!el) {{
        return null;
    }}
    {}
"#,
        element.index, body
    );
    with_snapshot(&element.locator.to_xpath(), element.frame, &body)
}

pub fn frame_count() -> String {
    format!(
        "(function() {{{}    return allFrames(document).length;\n}})()",
        ALL_FRAMES
    )
}

pub fn count(xpath: &str, frame: Option<usize>) -> String {
    with_snapshot(xpath, frame, "\n    return snapshot.snapshotLength;\n")
}

pub fn outer_html(xpath: &str, frame: Option<usize>) -> String {
    with_snapshot(
        xpath,
        frame,
        r#"
    const markup = [];
    for (let i = 0; i < snapshot.snapshotLength; i++) {
        markup.push(snapshot.snapshotItem(i).outerHTML);
    }
    return JSON.stringify(markup);
"#,
    )
}

pub fn is_visible(element: &ElementHandle) -> String {
    with_element(
        element,
        r#"
    const rect = el.getBoundingClientRect();
    const style = (el.ownerDocument.defaultView || window).getComputedStyle(el);
    return rect.width > 0 &&
           rect.height > 0 &&
           style.visibility !== 'hidden' &&
           style.display !== 'none' &&
           parseFloat(style.opacity) > 0;
"#,
    )
}

pub fn is_enabled(element: &ElementHandle) -> String {
    with_element(
        element,
        "\n    return !el.hasAttribute('disabled') && !el.classList.contains('disabled');\n",
    )
}

pub fn scroll_into_view(element: &ElementHandle) -> String {
    with_element(
        element,
        "\n    el.scrollIntoView({ block: 'center', inline: 'nearest' });\n    return true;\n",
    )
}

/// Click from script. With `check_actionable` the element must be visible
/// and enabled first; without it the click is dispatched regardless.
pub fn click(element: &ElementHandle, check_actionable: bool) -> String {
    let guard = if check_actionable {
        r#"
    const rect = el.getBoundingClientRect();
    const style = (el.ownerDocument.defaultView || window).getComputedStyle(el);
    if (rect.width === 0 || rect.height === 0 || style.visibility === 'hidden' ||
        style.display === 'none' || el.hasAttribute('disabled')) {
        return false;
    }
"#
    } else {
        ""
    };
    with_element(element, &format!("{}\n    el.click();\n    return true;\n", guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementSelector, Locator};

    fn handle(frame: Option<usize>) -> ElementHandle {
        ElementHandle::first(
            Locator::element(ElementSelector::parse("em.icon.edit").unwrap()),
            frame,
        )
    }

    #[test]
    fn top_document_scripts_use_null_frame() {
        let script = count("//em", None);
        assert!(script.contains("const frameIndex = null;"));
        assert!(script.contains(r#"doc.evaluate("//em""#));
        assert!(script.starts_with("(function() {"));
        assert!(script.ends_with("})()"));
    }

    #[test]
    fn frame_scripts_index_into_frames() {
        let script = is_visible(&handle(Some(2)));
        assert!(script.contains("const frameIndex = 2;"));
        assert!(script.contains("snapshot.snapshotItem(0)"));
    }

    #[test]
    fn frame_numbering_descends_into_nested_frames() {
        let counted = frame_count();
        let resolved = count("//em", Some(1));

        for script in [&counted, &resolved] {
            assert!(script.contains("const allFrames = (root) =>"));
            assert!(script.contains("visit(inner);"));
        }
        assert!(counted.ends_with("return allFrames(document).length;\n})()"));
        assert!(resolved.contains("const frame = allFrames(document)[frameIndex];"));
        assert!(!resolved.contains("document.querySelectorAll('iframe, frame')["));
    }

    #[test]
    fn xpath_quotes_are_escaped() {
        let script = count(r#"//em[@title="x"]"#, None);
        assert!(script.contains(r#""//em[@title=\"x\"]""#));
    }

    #[test]
    fn forced_click_skips_the_actionability_guard() {
        assert!(click(&handle(None), true).contains("return false;"));
        assert!(!click(&handle(None), false).contains("return false;"));
    }
}
