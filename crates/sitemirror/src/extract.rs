//! Asset reference discovery
//!
//! Scans the parsed page with a fixed set of selector/attribute pairs and
//! reports every non-empty asset attribute in document order.

use crate::document::{elements, DocumentTree};
use crate::types::ResourceKind;
use ego_tree::NodeId;
use scraper::Selector;
use std::sync::LazyLock;
use url::Url;

/// Selector for each kind; the kind's attribute is read from matching elements
const RULES: &[(ResourceKind, &str)] = &[
    (ResourceKind::Stylesheet, "link[rel~=\"stylesheet\"]"),
    (ResourceKind::Script, "script[src]"),
    (ResourceKind::Image, "img"),
    (ResourceKind::Video, "video, video > source"),
];

static SELECTORS: LazyLock<Vec<(ResourceKind, Selector)>> = LazyLock::new(|| {
    RULES
        .iter()
        .filter_map(|(kind, css)| Selector::parse(css).ok().map(|sel| (*kind, sel)))
        .collect()
});

static BASE_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse("base[href]").ok());

/// An asset attribute found in the page, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredReference {
    pub kind: ResourceKind,
    /// Attribute value as written in the page
    pub value: String,
    /// Element carrying the attribute
    pub owner: NodeId,
}

/// Enumerate asset references in document order
///
/// Empty or missing attributes are skipped, as are `data:` URIs which are
/// already self-contained.
pub fn extract_references(document: &DocumentTree) -> Vec<DiscoveredReference> {
    let mut found = Vec::new();

    for element in elements(document) {
        let Some((kind, _)) = SELECTORS.iter().find(|(_, sel)| sel.matches(&element)) else {
            continue;
        };

        let Some(value) = element.value().attr(kind.attribute()) else {
            continue;
        };
        let trimmed = value.trim();
        if trimmed.is_empty() || is_data_uri(trimmed) {
            continue;
        }

        found.push(DiscoveredReference {
            kind: *kind,
            value: value.to_string(),
            owner: element.id(),
        });
    }

    found
}

/// Base URL for resolving references
///
/// The first `<base href>` wins, resolved against the page URL; otherwise
/// the page URL itself.
pub fn base_url(document: &DocumentTree, page_url: &Url) -> Url {
    base_elements(document)
        .first()
        .and_then(|&node| document.attribute(node, "href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone())
}

/// All `<base href>` elements in document order
///
/// The mirrored page must not keep any of them, or local paths would
/// resolve against the remote base.
pub fn base_elements(document: &DocumentTree) -> Vec<NodeId> {
    let Some(selector) = BASE_SELECTOR.as_ref() else {
        return Vec::new();
    };
    document.html().select(selector).map(|base| base.id()).collect()
}

fn is_data_uri(value: &str) -> bool {
    value
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}
