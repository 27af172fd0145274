//! Eager (whole-run) newsletter generation entry points.
//!
//! A run walks the full pipeline: scan the bundle, resolve every image to a
//! hosted URL (cache first, uploads for the rest), segment the document into
//! sections, and assemble the final HTML. Partial failure is the norm, not
//! the exception; a missing header image or one failed upload degrades the
//! output and shows up in [`RunStats`], but only auth failures and a missing
//! document abort the run.

use crate::assemble::assemble;
use crate::config::{RunConfig, SocialEntry};
use crate::error::MailforgeError;
use crate::pipeline::bundle::scan_bundle;
use crate::pipeline::cache::UploadCache;
use crate::pipeline::resolve::{resolve_images, UploadJob};
use crate::pipeline::sections::{parse_sections, Section};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Logical-name prefix for header images supplied by configuration.
const CONFIG_PREFIX: &str = "config_";
/// Logical-name prefix for social icons supplied by configuration.
const SOCIAL_PREFIX: &str = "config_social_";

/// Counters for one generation run.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct RunStats {
    /// Distinct image-resolution jobs (bundle images + config images).
    pub images_total: usize,
    /// Jobs resolved from the cache without network.
    pub images_cached: usize,
    /// Distinct images uploaded this run.
    pub images_uploaded: usize,
    /// Jobs that failed and stayed unmapped.
    pub images_failed: usize,
    /// Sections found in the document.
    pub sections_total: usize,
    /// Sections rendered as content blocks.
    pub sections_rendered: usize,
    /// Wall-clock duration of the whole run.
    pub duration_ms: u64,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunOutput {
    /// The assembled newsletter document.
    pub html: String,
    /// The parsed sections, for callers that want to inspect or report.
    pub sections: Vec<Section>,
    pub stats: RunStats,
}

/// Generate a newsletter from an extracted bundle directory.
///
/// # Errors
/// Fatal only: bundle/document problems, authentication failures (always
/// before the first upload), template errors, cancellation. Per-image
/// failures degrade the output and are counted in `stats.images_failed`.
pub async fn generate(
    bundle_dir: impl AsRef<Path>,
    config: &RunConfig,
) -> Result<RunOutput, MailforgeError> {
    let start = Instant::now();
    let bundle_dir = bundle_dir.as_ref();
    info!("Starting newsletter run for bundle {}", bundle_dir.display());

    // ── Step 1: Locate document and images ───────────────────────────────
    let bundle = scan_bundle(bundle_dir)?;
    let raw_html = std::fs::read_to_string(&bundle.document).map_err(|e| {
        MailforgeError::DocumentUnreadable {
            path: bundle.document.clone(),
            source: e,
        }
    })?;

    // ── Step 2: Build the job list ───────────────────────────────────────
    // Bundle images by filename, config images under prefixed logical names.
    // Config entries that are not files on disk (already-hosted URLs) skip
    // the pipeline and pass through untouched.
    let mut jobs: Vec<UploadJob> = Vec::new();
    let mut bundle_names: HashSet<String> = HashSet::new();

    for image in &bundle.images {
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        bundle_names.insert(name.clone());
        jobs.push(UploadJob::new(image, name));
    }

    for (position, image) in &config.header_images {
        if Path::new(image).is_file() {
            jobs.push(UploadJob::new(image, format!("{CONFIG_PREFIX}{position}")));
        }
    }

    for entry in &config.social {
        if Path::new(&entry.image).is_file() {
            let base = Path::new(&entry.image)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            jobs.push(UploadJob::new(&entry.image, format!("{SOCIAL_PREFIX}{base}")));
        }
    }

    // ── Step 3: Resolve all images through the cache / host ──────────────
    let cache = UploadCache::load(&config.cache_path);
    let images_total = jobs.len();
    let resolution = resolve_images(&jobs, cache, config).await?;
    if !resolution.failures.is_empty() {
        warn!(
            "{} image(s) failed to upload and will be unresolved in the output",
            resolution.failures.len()
        );
    }

    // ── Step 4: Fold resolved URLs back into the configuration ──────────
    let header_images = resolved_header_images(&config.header_images, &resolution.urls);
    let social = resolved_social(&config.social, &resolution.urls);

    // ── Step 5: Rewrite bundle image references, then segment ────────────
    let rewritten = rewrite_image_refs(&raw_html, &resolution.urls, &bundle_names);
    let sections = parse_sections(&rewritten);
    if sections.len() <= 1 {
        warn!(
            "Only {} section(s) found; the export format may have changed upstream",
            sections.len()
        );
    }
    info!("Total sections found: {}", sections.len());

    // ── Step 6: Assemble ─────────────────────────────────────────────────
    let html = assemble(&sections, &header_images, &social, config)?;

    let stats = RunStats {
        images_total,
        images_cached: resolution.cached,
        images_uploaded: resolution.uploaded,
        images_failed: resolution.failures.len(),
        sections_total: sections.len(),
        sections_rendered: sections
            .iter()
            .filter(|s| !s.is_control() && s.rendered_len > 0)
            .count(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} sections rendered, {} cached / {} uploaded / {} failed images, {}ms",
        stats.sections_rendered,
        stats.sections_total,
        stats.images_cached,
        stats.images_uploaded,
        stats.images_failed,
        stats.duration_ms
    );

    Ok(RunOutput {
        html,
        sections,
        stats,
    })
}

/// Generate and write the newsletter to a dated file in the output directory.
///
/// Uses atomic write (temp file + rename) to prevent partial files. Returns
/// the path written and the run stats.
pub async fn generate_to_file(
    bundle_dir: impl AsRef<Path>,
    config: &RunConfig,
) -> Result<(PathBuf, RunStats), MailforgeError> {
    let output = generate(bundle_dir, config).await?;

    let stamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let path = config.output_dir.join(format!("newsletter-{stamp}.html"));

    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        MailforgeError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        }
    })?;

    let tmp_path = path.with_extension("html.tmp");
    std::fs::write(&tmp_path, &output.html).map_err(|e| MailforgeError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp_path, &path).map_err(|e| MailforgeError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    })?;

    info!("Newsletter written to {}", path.display());
    Ok((path, output.stats))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Replace local header-image paths with their uploaded URLs; positions
/// whose upload failed (or that were URLs already) keep their original value.
fn resolved_header_images(
    configured: &HashMap<String, String>,
    urls: &HashMap<String, String>,
) -> HashMap<String, String> {
    configured
        .iter()
        .map(|(position, image)| {
            let resolved = urls
                .get(&format!("{CONFIG_PREFIX}{position}"))
                .cloned()
                .unwrap_or_else(|| image.clone());
            (position.clone(), resolved)
        })
        .collect()
}

/// Same fold for social icons, keyed by icon filename.
fn resolved_social(configured: &[SocialEntry], urls: &HashMap<String, String>) -> Vec<SocialEntry> {
    configured
        .iter()
        .map(|entry| {
            let base = Path::new(&entry.image)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let image = urls
                .get(&format!("{SOCIAL_PREFIX}{base}"))
                .cloned()
                .unwrap_or_else(|| entry.image.clone());
            SocialEntry {
                link: entry.link.clone(),
                image,
            }
        })
        .collect()
}

/// Rewrite `src` references to bundle images with their hosted URLs.
/// Exporters vary the relative prefix, so all known spellings are covered.
fn rewrite_image_refs(
    html: &str,
    urls: &HashMap<String, String>,
    bundle_names: &HashSet<String>,
) -> String {
    let mut out = html.to_string();
    for name in bundle_names {
        let Some(url) = urls.get(name) else { continue };
        for prefix in ["images/", "tmp/images/", "./images/", "../images/"] {
            out = out.replace(
                &format!(r#"src="{prefix}{name}""#),
                &format!(r#"src="{url}""#),
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_refs_rewritten_for_all_prefixes() {
        let mut urls = HashMap::new();
        urls.insert("image1.png".to_string(), "https://i.example/1.png".to_string());
        let names: HashSet<String> = ["image1.png".to_string()].into();

        let html = concat!(
            r#"<img src="images/image1.png">"#,
            r#"<img src="./images/image1.png">"#,
            r#"<img src="../images/image1.png">"#,
        );
        let out = rewrite_image_refs(html, &urls, &names);
        assert_eq!(out.matches("https://i.example/1.png").count(), 3);
        assert!(!out.contains("images/image1.png"));
    }

    #[test]
    fn unresolved_refs_left_alone() {
        let urls = HashMap::new();
        let names: HashSet<String> = ["image1.png".to_string()].into();
        let html = r#"<img src="images/image1.png">"#;
        assert_eq!(rewrite_image_refs(html, &urls, &names), html);
    }

    #[test]
    fn header_positions_fold_in_uploaded_urls() {
        let configured: HashMap<String, String> = [
            ("logo".to_string(), "./assets/1.png".to_string()),
            ("events".to_string(), "./assets/7.png".to_string()),
        ]
        .into();
        let urls: HashMap<String, String> =
            [("config_logo".to_string(), "https://i.example/logo.png".to_string())].into();

        let resolved = resolved_header_images(&configured, &urls);
        assert_eq!(resolved["logo"], "https://i.example/logo.png");
        // Failed/remote entries keep their configured value.
        assert_eq!(resolved["events"], "./assets/7.png");
    }

    #[test]
    fn social_urls_pass_through_when_remote() {
        let configured = vec![SocialEntry {
            link: "https://example.social/club".into(),
            image: "https://i.example/hosted-icon.png".into(),
        }];
        let resolved = resolved_social(&configured, &HashMap::new());
        assert_eq!(resolved[0].image, "https://i.example/hosted-icon.png");
    }
}
