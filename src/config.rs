//! Configuration types for a newsletter generation run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. Keeping every knob in one struct makes it trivial to
//! share configs across tasks, log them, and diff two runs to understand why
//! their outputs differ.
//!
//! The header-image mapping and the social list were process-wide globals in
//! earlier incarnations of this tool; here they are explicit fields so a run
//! owns its whole configuration and nothing mutates behind its back.

use crate::error::MailforgeError;
use crate::pipeline::resolve::ImageHost;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Login credentials for the external image host.
#[derive(Clone)]
pub struct HostCredentials {
    /// Account email; also used as the login-success marker (the host echoes
    /// it into the page body on a successful login).
    pub email: String,
    pub password: String,
}

impl fmt::Debug for HostCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One social-media footer entry: a link plus its icon.
///
/// `image` may be a local file path (uploaded and re-hosted like any other
/// image) or an already-hosted URL (passed through untouched).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SocialEntry {
    pub link: String,
    pub image: String,
}

/// Override the built-in template bodies from [`crate::templates`].
///
/// Each body is a MiniJinja template; see the module docs of
/// [`crate::templates`] for the variables each one receives.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    pub start: Option<String>,
    pub content_block: Option<String>,
    pub social_block: Option<String>,
    pub end: Option<String>,
    pub tail: Option<String>,
}

/// Configuration for a newsletter generation run.
///
/// Built via [`RunConfig::builder()`] or [`RunConfig::default()`].
///
/// # Example
/// ```rust
/// use mailforge::RunConfig;
///
/// let config = RunConfig::builder()
///     .header_image("chairperson", "./assets/header_images/2.png")
///     .concurrency(2)
///     .cache_path("image_cache.json")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Section position → header image (local path or URL). Default: empty.
    ///
    /// Looked up by the assembler for every rendered content block; a
    /// position with no entry renders with an empty image source rather than
    /// failing the run.
    pub header_images: HashMap<String, String>,

    /// Social footer entries rendered after the end block. Default: empty.
    pub social: Vec<SocialEntry>,

    /// Credentials for the image host. Required only when at least one image
    /// misses the cache; a fully cached run never authenticates.
    pub credentials: Option<HostCredentials>,

    /// Pre-constructed image host. Takes precedence over `credentials`.
    /// Useful in tests or when the caller needs custom transport behaviour.
    pub host: Option<Arc<dyn ImageHost>>,

    /// Path of the persisted digest → URL cache file. Default: `image_cache.json`.
    ///
    /// The file is plain JSON so a human can inspect or prune it. A missing
    /// or corrupt file degrades to an empty cache, never an error.
    pub cache_path: PathBuf,

    /// Directory for generated newsletters. Default: `emails`.
    /// Created on demand.
    pub output_dir: PathBuf,

    /// Number of concurrent uploads. Range 1–8, default 3.
    ///
    /// The host tolerates a handful of parallel requests but has no
    /// documented rate limit; a small pool keeps runs fast without tripping
    /// its informal tolerance. Cache writes stay serialised regardless.
    pub concurrency: usize,

    /// Per-request timeout in seconds for every network call. Default: 30.
    pub request_timeout_secs: u64,

    /// Cooperative cancel flag, checked between jobs (never mid-upload).
    /// Raise it from another task to stop the run cleanly.
    pub cancel: Arc<AtomicBool>,

    /// Template body overrides; `None` fields use the built-in defaults.
    pub templates: TemplateSet,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            header_images: HashMap::new(),
            social: Vec::new(),
            credentials: None,
            host: None,
            cache_path: PathBuf::from("image_cache.json"),
            output_dir: PathBuf::from("emails"),
            concurrency: 3,
            request_timeout_secs: 30,
            cancel: Arc::new(AtomicBool::new(false)),
            templates: TemplateSet::default(),
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("header_images", &self.header_images.len())
            .field("social", &self.social.len())
            .field("credentials", &self.credentials)
            .field("host", &self.host.as_ref().map(|_| "<dyn ImageHost>"))
            .field("cache_path", &self.cache_path)
            .field("output_dir", &self.output_dir)
            .field("concurrency", &self.concurrency)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunConfig`].
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Add one position → header image entry.
    pub fn header_image(mut self, position: impl Into<String>, image: impl Into<String>) -> Self {
        self.config
            .header_images
            .insert(position.into(), image.into());
        self
    }

    /// Replace the whole header-image mapping.
    pub fn header_images(mut self, map: HashMap<String, String>) -> Self {
        self.config.header_images = map;
        self
    }

    pub fn social(mut self, entries: Vec<SocialEntry>) -> Self {
        self.config.social = entries;
        self
    }

    pub fn credentials(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some(HostCredentials {
            email: email.into(),
            password: password.into(),
        });
        self
    }

    pub fn host(mut self, host: Arc<dyn ImageHost>) -> Self {
        self.config.host = Some(host);
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = path.into();
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.clamp(1, 8);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.config.cancel = flag;
        self
    }

    pub fn templates(mut self, templates: TemplateSet) -> Self {
        self.config.templates = templates;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, MailforgeError> {
        let c = &self.config;
        if c.concurrency == 0 || c.concurrency > 8 {
            return Err(MailforgeError::InvalidConfig(format!(
                "concurrency must be 1–8, got {}",
                c.concurrency
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(MailforgeError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = RunConfig::default();
        assert_eq!(c.concurrency, 3);
        assert_eq!(c.cache_path, PathBuf::from("image_cache.json"));
        assert_eq!(c.output_dir, PathBuf::from("emails"));
        assert!(c.credentials.is_none());
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = RunConfig::builder().concurrency(100).build().unwrap();
        assert_eq!(c.concurrency, 8);
        let c = RunConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let c = RunConfig::builder()
            .credentials("me@example.com", "hunter2")
            .build()
            .unwrap();
        let dbg = format!("{:?}", c.credentials);
        assert!(dbg.contains("me@example.com"));
        assert!(!dbg.contains("hunter2"));
    }
}
