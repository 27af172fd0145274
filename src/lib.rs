//! # mailforge
//!
//! Assemble a templated HTML newsletter from an exported word-processing
//! document, re-hosting its images through a content-addressed upload cache.
//!
//! ## Why this crate?
//!
//! Word-processor HTML exports are unsendable as email: styling lives in a
//! `<style>` block clients strip, images are relative file references, and
//! the actual content is buried between boilerplate. This crate segments the
//! export into semantically labeled sections (the author marks each one with
//! an em-dash label paragraph), pushes every image through a free image host
//! exactly once (byte-identical images are deduplicated against a persistent
//! digest → URL cache), and renders the result through email-safe templates.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bundle dir
//!  │
//!  ├─ 1. Bundle    locate the exported HTML + image files
//!  ├─ 2. Sections  two-pass marker scan into labeled blocks
//!  ├─ 3. Hash      blake3 digest per image (content-addressed)
//!  ├─ 4. Cache     digest → URL map; hits skip the network entirely
//!  ├─ 5. Auth      scraped CSRF login + API token (only when misses exist)
//!  ├─ 6. Upload    bounded-concurrency multipart uploads, per-job failures
//!  └─ 7. Assemble  MiniJinja templates → final newsletter HTML
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mailforge::{generate_to_file, RunConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder()
//!         .credentials("me@example.com", "secret")
//!         .header_image("chairperson", "./assets/header_images/2.png")
//!         .build()?;
//!     let (path, stats) = generate_to_file("./bundle", &config).await?;
//!     println!("wrote {} ({} uploads, {} cached)",
//!         path.display(), stats.images_uploaded, stats.images_cached);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure philosophy
//!
//! Only what makes the whole run meaningless is fatal: no document, broken
//! authentication, invalid configuration. Everything else degrades: a failed
//! upload leaves one image unresolved, a corrupt cache file becomes an empty
//! cache, a hosted page without a direct link falls back to the landing-page
//! URL, and a document whose section markers vanished still produces output
//! (with a loud warning that the export convention drifted).
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mailforge` binary (clap + anyhow + toml + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod config;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod templates;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::assemble;
pub use config::{HostCredentials, RunConfig, RunConfigBuilder, SocialEntry, TemplateSet};
pub use error::{MailforgeError, UploadJobError};
pub use generate::{generate, generate_to_file, RunOutput, RunStats};
pub use pipeline::resolve::{resolve_images, ImageHost, ResolutionOutcome, UploadJob};
pub use pipeline::sections::{parse_sections, Section};
pub use pipeline::upload::UploadedImage;
