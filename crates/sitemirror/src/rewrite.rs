//! Attribute rewriting on task settlement

use crate::document::DocumentTree;
use crate::types::ResourceReference;

/// Point a reference's owner element at its local copy
///
/// Called once per reference, and only for references whose task
/// succeeded; failed references keep the attribute found in the source.
pub fn rewrite_reference(document: &mut DocumentTree, reference: &ResourceReference) -> bool {
    document.set_attribute(
        reference.owner,
        reference.kind.attribute(),
        reference.destination_path.as_str(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_references;
    use crate::resolve::resolve_references;
    use crate::types::CollisionPolicy;
    use url::Url;

    #[test]
    fn test_rewrites_only_the_owner_attribute() {
        let mut doc = DocumentTree::parse(
            r#"<html><head><link rel="stylesheet" href="/css/a.css?v=1"></head>
<body><img src="https://cdn.example/img/b.png" alt="b"></body></html>"#,
        );
        let base = Url::parse("https://example.com/").unwrap();
        let refs = resolve_references(
            extract_references(&doc),
            &base,
            CollisionPolicy::Suffix,
        );

        assert!(rewrite_reference(&mut doc, &refs[0]));

        let html = doc.serialize();
        assert!(html.contains(r#"href="css/a.css""#));
        assert!(html.contains(r#"src="https://cdn.example/img/b.png""#));
        assert!(html.contains(r#"alt="b""#));
    }
}
