//! Link extraction from fetched content.
//!
//! Each submodule turns one content kind into URL references: HTML documents
//! (the whatwg link-attribute matrix), stylesheets, response headers, and
//! JavaScript comment conventions. The checker stitches these together per
//! page; extraction itself never fetches.

pub mod css;
pub mod headers;
pub mod html;
pub mod js;

use crate::urlref::UrlRef;

/// The HTML element a link was found on: tag name, the attribute that carried
/// the reference, the `rel` token list, and the element text.
///
/// Absent for links that came from a header, a stylesheet, or a script
/// comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    pub tag: String,
    pub attr: Option<String>,
    pub rel: Vec<String>,
    pub text: String,
}

impl ElementRef {
    #[must_use]
    pub fn rel_contains(&self, token: &str) -> bool {
        self.rel.iter().any(|r| r == token)
    }
}

/// One reference found on a page: where it points, where it was found, and
/// (when it came from markup) the element that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub linkurl: UrlRef,
    pub pageurl: UrlRef,
    pub html: Option<ElementRef>,
}

impl Link {
    #[must_use]
    pub fn new(linkurl: UrlRef, pageurl: UrlRef, html: Option<ElementRef>) -> Self {
        Self {
            linkurl,
            pageurl,
            html,
        }
    }
}

/// Links pulled from one document, plus any parse complaints encountered on
/// the way (reported once per page, never fatal).
#[derive(Debug, Default)]
pub struct Extraction {
    pub links: Vec<Link>,
    pub errors: Vec<String>,
}
