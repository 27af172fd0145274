//! Pipeline stages for newsletter generation.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets us swap implementations (e.g. a fake
//! image host in tests) without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! bundle ──▶ sections          ──────────────▶ assemble
//!    │                                            ▲
//!    └──▶ hash ──▶ cache ──▶ auth ──▶ upload ─────┘
//!                   (resolve orchestrates the lower path)
//! ```
//!
//! 1. [`bundle`]  : locate the exported document and its images on disk
//! 2. [`sections`]: segment the document into labeled content blocks
//! 3. [`hash`]    : content digests keying the upload cache
//! 4. [`cache`]   : persisted digest → URL map, loaded once, saved incrementally
//! 5. [`auth`]    : scraped CSRF/session/token login against the image host
//! 6. [`upload`]  : multipart upload plus direct-URL resolution; the only
//!    stage allowed to fail per-job
//! 7. [`resolve`] : orchestrates 3–6 behind a bounded worker pool
//!
//! `scrape` is a shared helper: the one HTML-attribute lookup primitive
//! that auth and upload both scrape pages with.

pub mod auth;
pub mod bundle;
pub mod cache;
pub mod hash;
pub mod resolve;
pub(crate) mod scrape;
pub mod sections;
pub mod upload;
