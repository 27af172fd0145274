//! Upload client: push one image through the host and resolve its direct URL.
//!
//! ## Protocol
//!
//! The upload endpoint is the same one the host's own uploader widget talks
//! to: a multipart POST carrying the account token, fixed option fields, a
//! fresh random per-request session identifier, and the file bytes. A 200
//! response must parse as JSON with `status: "OK"` and a hosted-page `url`.
//!
//! The hosted-page URL is a human landing page, not hotlink-safe. A second
//! GET against it yields the embeddable direct URL from the `og:image` meta
//! tag, falling back to the `#download` anchor. When both are missing the
//! result is degraded, not failed: the landing-page URL is still usable and
//! the caller accepts either field.
//!
//! All failures here are per-job [`UploadJobError`]s; one bad image never
//! aborts the run.

use crate::error::UploadJobError;
use crate::pipeline::auth::PostimagesSession;
use crate::pipeline::scrape::tag_attr;
use std::path::Path;
use tracing::{debug, warn};

const UPLOAD_URL: &str = "https://postimages.org/json/rr";

/// Result of one successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Human-facing landing page for the uploaded image.
    pub page_url: String,
    /// Raw image resource suitable for embedding. `None` when the landing
    /// page carried neither extraction target (degraded, non-fatal).
    pub direct_url: Option<String>,
}

impl UploadedImage {
    /// The URL to embed: direct when resolved, landing page otherwise.
    pub fn best_url(&self) -> &str {
        self.direct_url.as_deref().unwrap_or(&self.page_url)
    }
}

/// Upload one image through an authenticated session.
///
/// `logical_name` only labels errors and logs; the uploaded filename is the
/// on-disk one.
pub async fn upload_image(
    session: &PostimagesSession,
    token: &str,
    path: &Path,
    logical_name: &str,
) -> Result<UploadedImage, UploadJobError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| UploadJobError::RequestFailed {
            name: logical_name.to_string(),
            reason: format!("read '{}': {e}", path.display()),
        })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("image/*")
        .map_err(|e| UploadJobError::RequestFailed {
            name: logical_name.to_string(),
            reason: e.to_string(),
        })?;

    // Field set mirrors the host's own uploader widget. upload_session is a
    // fresh random identifier per request; session_upload is epoch millis.
    let form = reqwest::multipart::Form::new()
        .text("token", token.to_string())
        .text("optsize", "0")
        .text("expire", "0")
        .text(
            "session_upload",
            chrono::Utc::now().timestamp_millis().to_string(),
        )
        .text("numfiles", "1")
        .text("upload_session", uuid::Uuid::new_v4().simple().to_string())
        .part("file", part);

    debug!("Uploading {} as '{}'", path.display(), logical_name);
    let response = session
        .http()
        .post(UPLOAD_URL)
        .multipart(form)
        .send()
        .await
        .map_err(|e| transport_error(logical_name, session.timeout_secs(), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(UploadJobError::Rejected {
            name: logical_name.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| transport_error(logical_name, session.timeout_secs(), e))?;
    let page_url = parse_upload_response(&body, logical_name)?;

    // Second hop: the landing page carries the hotlinkable URL.
    let direct_url = resolve_direct_url(session, &page_url).await;
    if direct_url.is_none() {
        warn!(
            "'{}': hosted page has no og:image or download link; using page URL",
            logical_name
        );
    }

    Ok(UploadedImage {
        page_url,
        direct_url,
    })
}

/// Validate the upload response body and pull out the hosted-page URL.
pub(crate) fn parse_upload_response(body: &str, name: &str) -> Result<String, UploadJobError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| UploadJobError::MalformedResponse {
            name: name.to_string(),
            detail: e.to_string(),
        })?;

    let status_ok = value.get("status").and_then(|s| s.as_str()) == Some("OK");
    let url = value.get("url").and_then(|u| u.as_str());

    match (status_ok, url) {
        (true, Some(url)) => Ok(url.to_string()),
        _ => Err(UploadJobError::StatusFlagMissing {
            name: name.to_string(),
        }),
    }
}

/// Fetch the hosted page and extract the direct image URL from it.
/// Any failure, transport or extraction, degrades to `None`.
async fn resolve_direct_url(session: &PostimagesSession, page_url: &str) -> Option<String> {
    let response = session.http().get(page_url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let html = response.text().await.ok()?;
    extract_direct_url(&html)
}

/// og:image meta first, `#download` anchor as fallback.
pub(crate) fn extract_direct_url(html: &str) -> Option<String> {
    tag_attr(html, "meta", "property", "og:image", "content")
        .or_else(|| tag_attr(html, "a", "id", "download", "href"))
}

fn transport_error(name: &str, timeout_secs: u64, e: reqwest::Error) -> UploadJobError {
    if e.is_timeout() {
        UploadJobError::Timeout {
            name: name.to_string(),
            secs: timeout_secs,
        }
    } else {
        UploadJobError::RequestFailed {
            name: name.to_string(),
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_response_yields_page_url() {
        let body = r#"{"status":"OK","url":"https://postimg.cc/abc123"}"#;
        assert_eq!(
            parse_upload_response(body, "x.png").unwrap(),
            "https://postimg.cc/abc123"
        );
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = parse_upload_response("<html>maintenance</html>", "x.png").unwrap_err();
        assert!(matches!(err, UploadJobError::MalformedResponse { .. }));
    }

    #[test]
    fn missing_status_flag_is_rejected() {
        // Valid JSON but no status field; the job fails, the run survives.
        let err = parse_upload_response(r#"{"url":"https://postimg.cc/abc"}"#, "x.png").unwrap_err();
        assert!(matches!(err, UploadJobError::StatusFlagMissing { .. }));
    }

    #[test]
    fn error_status_flag_is_rejected() {
        let err =
            parse_upload_response(r#"{"status":"ERR","url":"https://x"}"#, "x.png").unwrap_err();
        assert!(matches!(err, UploadJobError::StatusFlagMissing { .. }));
    }

    #[test]
    fn direct_url_from_og_image() {
        let html = r#"<head><meta property="og:image" content="https://i.postimg.cc/x/y.png"></head>"#;
        assert_eq!(
            extract_direct_url(html),
            Some("https://i.postimg.cc/x/y.png".into())
        );
    }

    #[test]
    fn direct_url_falls_back_to_download_anchor() {
        let html = r#"<body><a id="download" href="https://i.postimg.cc/dl/y.png">Download</a></body>"#;
        assert_eq!(
            extract_direct_url(html),
            Some("https://i.postimg.cc/dl/y.png".into())
        );
    }

    #[test]
    fn no_extraction_target_is_none() {
        assert_eq!(extract_direct_url("<body><p>gallery</p></body>"), None);
    }

    #[test]
    fn best_url_prefers_direct() {
        let img = UploadedImage {
            page_url: "https://postimg.cc/abc".into(),
            direct_url: Some("https://i.postimg.cc/direct.png".into()),
        };
        assert_eq!(img.best_url(), "https://i.postimg.cc/direct.png");

        let degraded = UploadedImage {
            page_url: "https://postimg.cc/abc".into(),
            direct_url: None,
        };
        assert_eq!(degraded.best_url(), "https://postimg.cc/abc");
    }
}
