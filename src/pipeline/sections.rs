//! Document section parser: segment the exported HTML into labeled blocks.
//!
//! The export convention puts each section label in its own paragraph,
//! rendered as an em-dash followed by the label text:
//!
//! ```text
//! <p class="c4"><span class="c1">&mdash; Chairperson</span></p> ...content...
//! <p class="c4"><span class="c1">&mdash; Events</span></p> ...content...
//! ```
//!
//! ## Two-pass scan
//!
//! Pass 1 locates every marker offset; pass 2 slices the input between
//! consecutive markers. Splitting in one monolithic pattern would tie the
//! boundary semantics to regex split behaviour; with explicit offsets the
//! boundaries are the offsets, full stop. The marker pattern is the sole
//! source of truth; sections can never nest or overlap.
//!
//! The parser validates nothing about the labels themselves. Unknown labels
//! pass through unchanged; deciding what to do with them is the assembler's
//! job. Likewise an empty section (`rendered_len == 0`) is retained, so the
//! caller can log "skipped, unfilled" instead of silently losing it.

use once_cell::sync::Lazy;
use regex::Regex;

/// Section labels that control assembly instead of becoming content blocks.
pub const KEY_EMAIL_START: &str = "email-start";
pub const KEY_EMAIL_END: &str = "email-end";
pub const KEY_EMAIL_SUBJECT: &str = "email-subject";

/// The three reserved control keys, for membership checks.
pub const CONTROL_KEYS: [&str; 3] = [KEY_EMAIL_START, KEY_EMAIL_END, KEY_EMAIL_SUBJECT];

/// The structural marker preceding every section label. The class numbers
/// vary between exports; the tag shape and the em-dash entity do not.
static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<p class="c\d+"><span class="c\d+">&mdash; "#).unwrap());

/// Closing tag of the label's inline markup; everything after it is content.
const LABEL_CLOSE: &str = "</span>";

/// One semantic block of the exported document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Section {
    /// Normalized label: trimmed, lowercased, spaces → hyphens. Acts as the
    /// lookup key into the header-image mapping, or as one of the three
    /// reserved control keys.
    pub position: String,
    /// Raw markup following the label, up to the next marker.
    pub content: String,
    /// Character count of `content` with all markup stripped. `0` means the
    /// section was intentionally left unfilled and must be skipped during
    /// assembly, never treated as an error.
    pub rendered_len: usize,
}

impl Section {
    /// Whether this section's position is one of the reserved control keys.
    pub fn is_control(&self) -> bool {
        CONTROL_KEYS.contains(&self.position.as_str())
    }
}

/// Split raw exported HTML into an ordered sequence of labeled sections.
///
/// Everything before the first marker is boilerplate (document head, style
/// block) and is discarded. If the marker never matches the result is one
/// unlabeled section holding the whole body; callers treat a section count
/// of ≤ 1 as a sign the export convention changed upstream, reported but not
/// fatal.
pub fn parse_sections(raw: &str) -> Vec<Section> {
    let marker_ends: Vec<(usize, usize)> = MARKER
        .find_iter(raw)
        .map(|m| (m.start(), m.end()))
        .collect();

    if marker_ends.is_empty() {
        return vec![Section {
            position: String::new(),
            content: raw.to_string(),
            rendered_len: rendered_length(raw),
        }];
    }

    let mut sections = Vec::with_capacity(marker_ends.len());
    for (i, &(_, label_start)) in marker_ends.iter().enumerate() {
        let fragment_end = marker_ends
            .get(i + 1)
            .map(|&(next_start, _)| next_start)
            .unwrap_or(raw.len());
        let fragment = &raw[label_start..fragment_end];

        // Label runs to the close of its inline markup; the rest is content.
        let (label, content) = match fragment.find(LABEL_CLOSE) {
            Some(pos) => (&fragment[..pos], &fragment[pos + LABEL_CLOSE.len()..]),
            None => (fragment, ""),
        };

        sections.push(Section {
            position: normalize_position(label),
            content: content.to_string(),
            rendered_len: rendered_length(content),
        });
    }

    sections
}

/// Normalize a raw label into a position key: trim, lowercase, spaces → hyphens.
fn normalize_position(label: &str) -> String {
    label.trim().replace(' ', "-").to_lowercase()
}

/// Strip HTML tags from a string, keeping only text content.
pub(crate) fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Plain-text length of an HTML fragment: tags stripped, non-breaking spaces
/// treated as whitespace, surrounding whitespace trimmed.
pub(crate) fn rendered_length(html: &str) -> usize {
    strip_tags(html)
        .replace("&nbsp;", " ")
        .trim()
        .chars()
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = concat!(
        "<html><head><style>.c1{}</style></head><body>",
        r#"<p class="c7"><span class="c3">Some preamble junk</span></p>"#,
        r#"<p class="c4"><span class="c1">&mdash; Email Subject</span></p>"#,
        r#"<p class="c2"><span class="c5">Week 12 wrap-up</span></p>"#,
        r#"<p class="c4"><span class="c1">&mdash; Chairperson</span></p>"#,
        r#"<p class="c2"><span class="c5">Hello everyone!</span></p>"#,
        r#"<p class="c4"><span class="c1">&mdash; Events</span></p>"#,
        r#"<p class="c2"><span class="c5"></span></p>"#,
        "</body></html>",
    );

    #[test]
    fn splits_in_document_order() {
        let sections = parse_sections(DOC);
        let positions: Vec<&str> = sections.iter().map(|s| s.position.as_str()).collect();
        assert_eq!(positions, vec!["email-subject", "chairperson", "events"]);
    }

    #[test]
    fn preamble_is_discarded() {
        let sections = parse_sections(DOC);
        assert!(sections.iter().all(|s| !s.content.contains("preamble")));
    }

    #[test]
    fn labels_are_normalized() {
        let raw = r#"<p class="c1"><span class="c2">&mdash;   The College View </span>text"#;
        let sections = parse_sections(raw);
        assert_eq!(sections[0].position, "the-college-view");
    }

    #[test]
    fn empty_section_is_retained_with_zero_length() {
        let sections = parse_sections(DOC);
        let events = sections.iter().find(|s| s.position == "events").unwrap();
        assert_eq!(events.rendered_len, 0);
    }

    #[test]
    fn filled_section_has_positive_length() {
        let sections = parse_sections(DOC);
        let chair = sections.iter().find(|s| s.position == "chairperson").unwrap();
        assert!(chair.rendered_len > 0);
        assert!(chair.content.contains("Hello everyone!"));
    }

    #[test]
    fn no_marker_yields_single_unlabeled_section() {
        let raw = "<html><body><p>just a plain export</p></body></html>";
        let sections = parse_sections(raw);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].position, "");
        assert_eq!(sections[0].content, raw);
        assert!(sections[0].rendered_len > 0);
    }

    #[test]
    fn control_key_detection() {
        let sections = parse_sections(DOC);
        assert!(sections[0].is_control());
        assert!(!sections[1].is_control());
    }

    #[test]
    fn nbsp_only_content_counts_as_empty() {
        let raw = concat!(
            r#"<p class="c1"><span class="c2">&mdash; Treasurer</span>"#,
            r#"<p class="c3"><span class="c4">&nbsp;&nbsp;</span></p>"#,
        );
        let sections = parse_sections(raw);
        assert_eq!(sections[0].rendered_len, 0);
    }

    #[test]
    fn strip_tags_keeps_text() {
        assert_eq!(strip_tags("<p>a<b>b</b></p>"), "ab");
        assert_eq!(strip_tags("no tags"), "no tags");
    }
}
