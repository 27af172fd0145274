//! Upload orchestrator: partition jobs into cache hits and misses, drive the
//! host for misses only, and produce the logical-name → URL map.
//!
//! ## Invariants
//!
//! * **No needless auth.** Authentication happens at most once per run, only
//!   when at least one upload is actually required, and always completes
//!   before the first upload starts. A fully cached run never touches the
//!   session client at all.
//! * **Serialised cache writes.** Uploads run through a bounded worker pool,
//!   but the cache is a single shared mutable resource: every insert goes
//!   through one mutex and the file is saved after each successful upload,
//!   so partial progress survives a later failure.
//! * **Per-job failure containment.** A failed upload leaves its logical
//!   names unmapped and is reported in the outcome; it is not retried within
//!   the run and never aborts the other jobs.
//!
//! Byte-identical files collapse to one digest before the hit/miss split,
//! so `a.png` and `b.png` with the same bytes cost one upload and share one
//! URL.

use crate::config::RunConfig;
use crate::error::{MailforgeError, UploadJobError};
use crate::pipeline::auth::PostimagesSession;
use crate::pipeline::cache::UploadCache;
use crate::pipeline::hash::digest_file;
use crate::pipeline::upload::{upload_image, UploadedImage};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One image to resolve: a local file plus the logical name the assembler
/// will look it up under. Transient, never persisted.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub path: PathBuf,
    pub logical_name: String,
}

impl UploadJob {
    pub fn new(path: impl Into<PathBuf>, logical_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            logical_name: logical_name.into(),
        }
    }
}

/// The seam between the orchestrator and the external host.
///
/// Production uses [`PostimagesHost`]; tests inject a fake to count calls
/// and script failures without touching the network.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Authenticate and prepare for uploads. Called at most once per run,
    /// and only when at least one cache miss exists. A failure here is
    /// fatal to the whole run.
    async fn connect(&self) -> Result<(), MailforgeError>;

    /// Upload one image. Failures are per-job, never fatal.
    async fn upload(&self, path: &Path, logical_name: &str)
        -> Result<UploadedImage, UploadJobError>;
}

/// Production [`ImageHost`]: the scraped-session postimages.org protocol.
pub struct PostimagesHost {
    session: PostimagesSession,
    token: OnceLock<String>,
}

impl PostimagesHost {
    pub fn new(
        credentials: crate::config::HostCredentials,
        timeout_secs: u64,
    ) -> Result<Self, MailforgeError> {
        Ok(Self {
            session: PostimagesSession::new(credentials, timeout_secs)?,
            token: OnceLock::new(),
        })
    }
}

#[async_trait]
impl ImageHost for PostimagesHost {
    async fn connect(&self) -> Result<(), MailforgeError> {
        self.session.authenticate().await?;
        let token = self.session.fetch_api_token().await?;
        let _ = self.token.set(token);
        Ok(())
    }

    async fn upload(
        &self,
        path: &Path,
        logical_name: &str,
    ) -> Result<UploadedImage, UploadJobError> {
        let token = self
            .token
            .get()
            .ok_or_else(|| UploadJobError::RequestFailed {
                name: logical_name.to_string(),
                reason: "host not connected".to_string(),
            })?;
        upload_image(&self.session, token, path, logical_name).await
    }
}

/// What `resolve_images` produced.
#[derive(Debug, Default)]
pub struct ResolutionOutcome {
    /// Logical name → final URL for every job that resolved.
    pub urls: HashMap<String, String>,
    /// Per-job failures; their logical names are absent from `urls`.
    pub failures: Vec<UploadJobError>,
    /// Jobs resolved straight from the cache, without network.
    pub cached: usize,
    /// Distinct images actually uploaded this run.
    pub uploaded: usize,
}

/// Resolve every job to a final URL, uploading only cache misses.
///
/// Takes ownership of the loaded cache; the cache file is saved after each
/// successful upload and once more at the end.
///
/// # Errors
/// Fatal only: authentication failures (before any upload is attempted) and
/// cancellation. Per-job upload failures land in the outcome instead.
pub async fn resolve_images(
    jobs: &[UploadJob],
    cache: UploadCache,
    config: &RunConfig,
) -> Result<ResolutionOutcome, MailforgeError> {
    let mut outcome = ResolutionOutcome::default();

    // ── Digest every job and group logical names by content ──────────────
    // digest → (path of first sighting, every logical name with these bytes)
    let mut by_digest: HashMap<String, (PathBuf, Vec<String>)> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for job in jobs {
        let digest = match digest_file(&job.path) {
            Ok(d) => d,
            Err(e) => {
                warn!("'{}': cannot hash {}: {}", job.logical_name, job.path.display(), e);
                outcome.failures.push(UploadJobError::RequestFailed {
                    name: job.logical_name.clone(),
                    reason: format!("read '{}': {e}", job.path.display()),
                });
                continue;
            }
        };
        let entry = by_digest
            .entry(digest.clone())
            .or_insert_with(|| {
                order.push(digest);
                (job.path.clone(), Vec::new())
            });
        entry.1.push(job.logical_name.clone());
    }

    // ── Partition into hits and misses ───────────────────────────────────
    let mut misses: Vec<(String, PathBuf, Vec<String>)> = Vec::new();
    for digest in order {
        let (path, names) = by_digest.remove(&digest).expect("digest was just inserted");
        if let Some(url) = cache.get(&digest) {
            debug!("Cached: {:?} -> {}", names, url);
            outcome.cached += names.len();
            for name in names {
                outcome.urls.insert(name, url.to_string());
            }
        } else {
            misses.push((digest, path, names));
        }
    }

    if misses.is_empty() {
        info!("All {} images found in cache; no uploads needed", jobs.len());
        return Ok(outcome);
    }

    if config.cancel.load(Ordering::Relaxed) {
        return Err(MailforgeError::Cancelled);
    }

    // ── Authenticate once, before the first upload ───────────────────────
    info!("Uploading {} new images", misses.len());
    let host = resolve_host(config)?;
    host.connect().await?;

    // ── Bounded worker pool over the misses ──────────────────────────────
    let cache = Arc::new(Mutex::new(cache));
    let cancel = Arc::clone(&config.cancel);

    let results: Vec<Option<(Vec<String>, Result<String, UploadJobError>)>> =
        stream::iter(misses.into_iter().map(|(digest, path, names)| {
            let host = Arc::clone(&host);
            let cache = Arc::clone(&cache);
            let cancel = Arc::clone(&cancel);
            async move {
                // Cooperative cancellation: skip jobs not yet started; an
                // in-flight upload is never interrupted.
                if cancel.load(Ordering::Relaxed) {
                    return None;
                }
                let name = names.first().cloned().unwrap_or_default();
                match host.upload(&path, &name).await {
                    Ok(uploaded) => {
                        let url = uploaded.best_url().to_string();
                        let mut cache = cache.lock().await;
                        cache.insert(digest, url.clone());
                        cache.save();
                        Some((names, Ok(url)))
                    }
                    Err(e) => Some((names, Err(e))),
                }
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    let mut skipped = false;
    for result in results {
        match result {
            None => skipped = true,
            Some((names, Ok(url))) => {
                outcome.uploaded += 1;
                info!("Uploaded: {:?} -> {}", names, url);
                for name in names {
                    outcome.urls.insert(name, url.clone());
                }
            }
            Some((names, Err(e))) => {
                warn!("Upload failed, skipping {:?}: {}", names, e);
                outcome.failures.push(e);
            }
        }
    }

    cache.lock().await.save();

    if skipped {
        return Err(MailforgeError::Cancelled);
    }
    Ok(outcome)
}

/// Pick the image host, most specific first: a pre-built host from the
/// config, else the production postimages host from the credentials.
fn resolve_host(config: &RunConfig) -> Result<Arc<dyn ImageHost>, MailforgeError> {
    if let Some(ref host) = config.host {
        return Ok(Arc::clone(host));
    }

    let credentials = config.credentials.clone().ok_or_else(|| {
        MailforgeError::InvalidConfig(
            "image uploads required but no host credentials configured; \
             set credentials or inject a custom host"
                .into(),
        )
    })?;

    Ok(Arc::new(PostimagesHost::new(
        credentials,
        config.request_timeout_secs,
    )?))
}
