//! Email assembler: combine parsed sections, resolved image URLs, and
//! template bodies into the final newsletter HTML.
//!
//! ## Control keys vs content blocks
//!
//! Three reserved section labels steer assembly instead of rendering as
//! content: `email-start` and `email-end` fill the opening and closing copy
//! slots, `email-subject` becomes the document title (markup stripped).
//! A control section is never rendered as a content block, even when it has
//! content.
//!
//! Everything else renders in document order through the content-block
//! template, paired with the header image registered for its position; an
//! empty image source when no mapping exists, never an error. Sections whose
//! stripped content is empty were intentionally left unfilled by the author
//! and are skipped with a log note.

use crate::config::{RunConfig, SocialEntry};
use crate::error::MailforgeError;
use crate::pipeline::sections::{
    strip_tags, Section, KEY_EMAIL_END, KEY_EMAIL_START, KEY_EMAIL_SUBJECT,
};
use crate::templates;
use minijinja::{context, Environment};
use std::collections::HashMap;
use tracing::debug;

/// Render the final newsletter document.
///
/// `header_images` maps section positions to final (already re-hosted) URLs;
/// `social` entries likewise carry final icon URLs.
pub fn assemble(
    sections: &[Section],
    header_images: &HashMap<String, String>,
    social: &[SocialEntry],
    config: &RunConfig,
) -> Result<String, MailforgeError> {
    let env = build_env(config)?;

    let mut start_slot = String::new();
    let mut end_slot = String::new();
    let mut subject_slot = String::new();
    let mut blocks = String::new();

    for section in sections {
        match section.position.as_str() {
            KEY_EMAIL_START => start_slot = section.content.clone(),
            KEY_EMAIL_END => end_slot = section.content.clone(),
            KEY_EMAIL_SUBJECT => subject_slot = section.content.clone(),
            position if section.rendered_len > 0 => {
                let header_image = header_images.get(position).cloned().unwrap_or_default();
                if header_image.is_empty() {
                    debug!("No header image mapped for section '{position}'");
                }
                let rendered = env
                    .get_template("content_block")
                    .and_then(|t| {
                        t.render(context! {
                            header_image,
                            styled_content => restyle_paragraphs(&section.content),
                        })
                    })
                    .map_err(|e| MailforgeError::TemplateFailed {
                        name: "content_block",
                        detail: e.to_string(),
                    })?;
                blocks.push_str(&rendered);
            }
            position => {
                debug!("Skipping section '{position}' (not filled in)");
            }
        }
    }

    // The <title> wants plain text, not exported markup.
    let subject_text = strip_tags(&subject_slot).trim().to_string();

    let start_html = env
        .get_template("start")
        .and_then(|t| {
            t.render(context! {
                email_subject => subject_text,
                header_image => header_images.get("logo").cloned().unwrap_or_default(),
                email_start => restyle_paragraphs(&start_slot),
            })
        })
        .map_err(|e| MailforgeError::TemplateFailed {
            name: "start",
            detail: e.to_string(),
        })?;

    let end_html = env
        .get_template("end")
        .and_then(|t| t.render(context! { email_end => restyle_paragraphs(&end_slot) }))
        .map_err(|e| MailforgeError::TemplateFailed {
            name: "end",
            detail: e.to_string(),
        })?;

    let mut social_html = String::new();
    for entry in social {
        let rendered = env
            .get_template("social_block")
            .and_then(|t| {
                t.render(context! {
                    social_link => entry.link.clone(),
                    social_image => entry.image.clone(),
                })
            })
            .map_err(|e| MailforgeError::TemplateFailed {
                name: "social_block",
                detail: e.to_string(),
            })?;
        social_html.push_str(&rendered);
    }

    let tail = config
        .templates
        .tail
        .as_deref()
        .unwrap_or(templates::DEFAULT_TAIL);

    Ok(format!("{start_html}{blocks}{end_html}{social_html}{tail}"))
}

/// Build the template environment, preferring config overrides over the
/// built-in bodies. Template names carry no `.html` suffix on purpose: the
/// section content *is* HTML and must not be escaped again.
fn build_env(config: &RunConfig) -> Result<Environment<'_>, MailforgeError> {
    let t = &config.templates;
    let mut env = Environment::new();

    let pairs: [(&str, &str); 4] = [
        ("start", t.start.as_deref().unwrap_or(templates::DEFAULT_START)),
        (
            "content_block",
            t.content_block
                .as_deref()
                .unwrap_or(templates::DEFAULT_CONTENT_BLOCK),
        ),
        (
            "social_block",
            t.social_block
                .as_deref()
                .unwrap_or(templates::DEFAULT_SOCIAL_BLOCK),
        ),
        ("end", t.end.as_deref().unwrap_or(templates::DEFAULT_END)),
    ];

    for (name, body) in pairs {
        env.add_template(name, body)
            .map_err(|e| MailforgeError::TemplateFailed {
                name: "environment",
                detail: format!("{name}: {e}"),
            })?;
    }

    Ok(env)
}

/// Rewrite exported class-styled paragraphs to inline email-safe styling.
/// Email clients drop `<style>` blocks, so the class selectors the exporter
/// relies on never arrive.
fn restyle_paragraphs(html: &str) -> String {
    html.replace("<p class=", templates::PARAGRAPH_STYLE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(position: &str, content: &str) -> Section {
        Section {
            position: position.to_string(),
            content: content.to_string(),
            rendered_len: crate::pipeline::sections::rendered_length(content),
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_section_is_skipped_without_error() {
        // Scenario: 3 sections, the 2nd unfilled, exactly 2 content blocks,
        // original relative order preserved.
        let sections = vec![
            section("chairperson", "<p>first section text</p>"),
            section("secretary", "<span></span>"),
            section("events", "<p>third section text</p>"),
        ];
        let config = RunConfig::default();
        let html = assemble(&sections, &HashMap::new(), &[], &config).unwrap();

        let first = html.find("first section text").expect("first block present");
        let third = html.find("third section text").expect("third block present");
        assert!(first < third, "blocks out of order");
        assert!(!html.contains("secretary"));
    }

    #[test]
    fn control_keys_fill_slots_not_blocks() {
        let sections = vec![
            section("email-subject", "<span>The <b>Big</b> Week</span>"),
            section("email-start", "<p>welcome copy</p>"),
            section("email-end", "<p>goodbye copy</p>"),
        ];
        let config = RunConfig::default();
        let html = assemble(&sections, &HashMap::new(), &[], &config).unwrap();

        assert!(html.contains("<title>The Big Week</title>"));
        assert!(html.contains("welcome copy"));
        assert!(html.contains("goodbye copy"));
    }

    #[test]
    fn control_key_never_renders_as_content_even_when_non_empty() {
        let sections = vec![section("email-subject", "<p>non-empty subject</p>")];
        let config = RunConfig::default();
        let html = assemble(&sections, &headers(&[("email-subject", "https://x/y.png")]), &[], &config).unwrap();

        // The subject lands in the title slot only; no content block exists,
        // so the header image mapped under the control key is never used.
        assert!(!html.contains("https://x/y.png"));
    }

    #[test]
    fn unmapped_position_renders_empty_image_src() {
        let sections = vec![section("unknown-role", "<p>hello</p>")];
        let config = RunConfig::default();
        let html = assemble(&sections, &HashMap::new(), &[], &config).unwrap();

        assert!(html.contains("hello"));
        assert!(html.contains(r#"src="""#));
    }

    #[test]
    fn header_image_resolved_per_position() {
        let sections = vec![section("events", "<p>what's on</p>")];
        let config = RunConfig::default();
        let html = assemble(
            &sections,
            &headers(&[("events", "https://i.example/events.png"), ("logo", "https://i.example/logo.png")]),
            &[],
            &config,
        )
        .unwrap();

        assert!(html.contains("https://i.example/events.png"));
        assert!(html.contains("https://i.example/logo.png"));
    }

    #[test]
    fn social_entries_render_independently() {
        let social = vec![
            SocialEntry {
                link: "https://example.social/club".into(),
                image: "https://i.example/icon.png".into(),
            },
            SocialEntry {
                link: "https://video.example/club".into(),
                image: "https://i.example/icon2.png".into(),
            },
        ];
        let config = RunConfig::default();
        let html = assemble(&[], &HashMap::new(), &social, &config).unwrap();

        assert!(html.contains("https://example.social/club"));
        assert!(html.contains("https://i.example/icon2.png"));
    }

    #[test]
    fn paragraphs_are_restyled_inline() {
        let sections = vec![section("events", r#"<p class="c2">styled</p>"#)];
        let config = RunConfig::default();
        let html = assemble(&sections, &HashMap::new(), &[], &config).unwrap();

        assert!(html.contains(r#"<p dir="ltr" style="#));
        assert!(!html.contains(r#"<p class="c2">"#));
    }

    #[test]
    fn template_override_is_used() {
        let mut config = RunConfig::default();
        config.templates.content_block = Some("<!-- block -->{{ styled_content }}".into());
        let sections = vec![section("events", "<p>x</p>")];
        let html = assemble(&sections, &HashMap::new(), &[], &config).unwrap();

        assert!(html.contains("<!-- block -->"));
    }
}
