//! Fragment validation.
//!
//! A `#fragment` resolves iff the target document has an element with that
//! `id`, or an `<a>` with that `name` (the pre-HTML5 anchor convention, still
//! common in generated docs).

use scraper::Html;

/// Whether `fragment` names an anchor in `doc`.
#[must_use]
pub fn exists(doc: &Html, fragment: &str) -> bool {
    doc.tree
        .nodes()
        .filter_map(|node| node.value().as_element())
        .any(|element| {
            element.attr("id") == Some(fragment)
                || (element.name() == "a" && element.attr("name") == Some(fragment))
        })
}

/// The broken-link reason for a fragment that resolved nowhere.
#[must_use]
pub fn missing_reason(fragment: &str) -> String {
    format!("fragment: no element with that id/name='{fragment}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_element_by_id() {
        let doc = Html::parse_document(r#"<h1 id="intro">Intro</h1>"#);
        assert!(exists(&doc, "intro"));
        assert!(!exists(&doc, "outro"));
    }

    #[test]
    fn test_finds_anchor_by_name() {
        let doc = Html::parse_document(r#"<a name="legacy"></a>"#);
        assert!(exists(&doc, "legacy"));
    }

    #[test]
    fn test_name_only_counts_on_anchors() {
        let doc = Html::parse_document(r#"<input name="q">"#);
        assert!(!exists(&doc, "q"));
    }
}
