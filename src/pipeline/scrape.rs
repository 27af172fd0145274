//! Minimal HTML attribute scraping over `tl`.
//!
//! Auth and upload both need the same primitive: "find the tag whose
//! attribute X equals Y, give me its attribute Z". A flat scan over the
//! parsed node list is enough; the pages involved are small and we never
//! need structural queries, so this avoids depending on any particular
//! selector syntax.

/// Find the first `tag_name` element whose `match_attr` equals `match_value`
/// and return its non-empty `want_attr` value.
pub(crate) fn tag_attr(
    html: &str,
    tag_name: &str,
    match_attr: &str,
    match_value: &str,
    want_attr: &str,
) -> Option<String> {
    let dom = tl::parse(html, tl::ParserOptions::default()).ok()?;

    for node in dom.nodes() {
        let Some(tag) = node.as_tag() else { continue };
        if tag.name().as_utf8_str() != tag_name {
            continue;
        }

        let attrs = tag.attributes();
        let matched = attrs
            .get(match_attr)
            .flatten()
            .map(|v| v.as_utf8_str() == match_value)
            .unwrap_or(false);
        if !matched {
            continue;
        }

        if let Some(Some(value)) = attrs.get(want_attr) {
            let value = value.as_utf8_str().to_string();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }

    None
}
