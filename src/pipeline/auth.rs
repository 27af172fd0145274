//! Session client for the postimages.org host.
//!
//! The host has no public upload API; the protocol below is what its own
//! web frontend speaks, reproduced step for step:
//!
//! 1. `GET /login`: establishes the session cookie and serves the form.
//! 2. Scrape the hidden `csrf_hash` input from the form. Its absence means
//!    the host changed its markup, which is fatal: nothing downstream can
//!    work without it.
//! 3. `POST /login` with email, password, and the scraped token, reusing
//!    the cookies from step 1.
//! 4. Success is HTTP 200 *and* the account email echoed in the body; the
//!    host returns 200 for failed logins too, so the status alone proves
//!    nothing.
//!
//! Token retrieval (`GET /login/api`) then scrapes the per-account upload
//! token from an `api_key` input, id-keyed with a name-keyed fallback.
//!
//! Every step shares one cookie-bearing [`reqwest::Client`], and no step is
//! retried: an auth failure aborts the run before any upload starts, so a
//! retry loop here would only mask a broken form or bad credentials.

use crate::config::HostCredentials;
use crate::error::MailforgeError;
use crate::pipeline::scrape::tag_attr;
use std::time::Duration;
use tracing::{debug, info};

const LOGIN_URL: &str = "https://postimages.org/login";
const API_TOKEN_URL: &str = "https://postimages.org/login/api";

/// The host serves a degraded page to unknown agents; present a browser.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// An authenticated session against the image host.
///
/// Wraps one cookie-bearing HTTP client shared by every protocol step.
/// Created fresh per run and discarded at run end; re-authentication is the
/// accepted cost of never persisting session state.
pub struct PostimagesSession {
    http: reqwest::Client,
    credentials: HostCredentials,
    timeout_secs: u64,
}

impl PostimagesSession {
    /// Build the session's HTTP client. Does not touch the network.
    pub fn new(credentials: HostCredentials, timeout_secs: u64) -> Result<Self, MailforgeError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| MailforgeError::Internal(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            http,
            credentials,
            timeout_secs,
        })
    }

    /// The shared cookie-bearing client, for the upload step.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Perform the CSRF-token login flow.
    ///
    /// # Errors
    /// [`MailforgeError::CsrfTokenMissing`] when the form has no hidden
    /// token, [`MailforgeError::LoginRejected`] when the host refuses the
    /// credentials, transport variants otherwise. All fatal.
    pub async fn authenticate(&self) -> Result<(), MailforgeError> {
        debug!("Fetching login page");
        let page = self
            .http
            .get(LOGIN_URL)
            .send()
            .await
            .map_err(|e| self.transport_error("login page", e))?;
        let page_body = page
            .text()
            .await
            .map_err(|e| self.transport_error("login page", e))?;

        let csrf = extract_csrf_token(&page_body).ok_or(MailforgeError::CsrfTokenMissing)?;
        debug!("Extracted CSRF token ({} chars)", csrf.len());

        let form = [
            ("csrf_hash", csrf.as_str()),
            ("email", self.credentials.email.as_str()),
            ("password", self.credentials.password.as_str()),
        ];

        let response = self
            .http
            .post(LOGIN_URL)
            .form(&form)
            .send()
            .await
            .map_err(|e| self.transport_error("login", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error("login", e))?;

        // 200 alone is not success; the host echoes the account email into
        // the page body only when the login actually took.
        if !status.is_success() || !body.contains(&self.credentials.email) {
            return Err(MailforgeError::LoginRejected {
                status: status.as_u16(),
            });
        }

        info!("Logged in to image host as {}", self.credentials.email);
        Ok(())
    }

    /// Retrieve the per-account upload token from the authenticated API page.
    ///
    /// # Errors
    /// [`MailforgeError::ApiTokenMissing`] when neither the id-keyed nor the
    /// name-keyed `api_key` input is present.
    pub async fn fetch_api_token(&self) -> Result<String, MailforgeError> {
        debug!("Fetching API token page");
        let response = self
            .http
            .get(API_TOKEN_URL)
            .send()
            .await
            .map_err(|e| self.transport_error("token fetch", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailforgeError::AuthRequestFailed {
                step: "token fetch",
                reason: format!("HTTP {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error("token fetch", e))?;

        let token = extract_api_token(&body).ok_or(MailforgeError::ApiTokenMissing)?;
        info!("Retrieved upload token ({} chars)", token.len());
        Ok(token)
    }

    fn transport_error(&self, step: &'static str, e: reqwest::Error) -> MailforgeError {
        if e.is_timeout() {
            MailforgeError::AuthTimeout {
                step,
                secs: self.timeout_secs,
            }
        } else {
            MailforgeError::AuthRequestFailed {
                step,
                reason: e.to_string(),
            }
        }
    }
}

/// Pull the hidden CSRF token out of the login form markup.
pub(crate) fn extract_csrf_token(html: &str) -> Option<String> {
    tag_attr(html, "input", "name", "csrf_hash", "value")
}

/// Pull the account's upload token out of the API page markup.
/// Id-keyed input first, name-keyed as fallback.
pub(crate) fn extract_api_token(html: &str) -> Option<String> {
    tag_attr(html, "input", "id", "api_key", "value")
        .or_else(|| tag_attr(html, "input", "name", "api_key", "value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_FORM: &str = r#"
        <form method="post" action="/login">
          <input type="hidden" name="csrf_hash" value="a1b2c3d4e5">
          <input type="email" name="email">
          <input type="password" name="password">
        </form>"#;

    #[test]
    fn csrf_token_is_extracted() {
        assert_eq!(extract_csrf_token(LOGIN_FORM), Some("a1b2c3d4e5".into()));
    }

    #[test]
    fn missing_csrf_field_is_none() {
        let html = "<form><input type=\"email\" name=\"email\"></form>";
        assert_eq!(extract_csrf_token(html), None);
    }

    #[test]
    fn api_token_prefers_id_keyed_input() {
        let html = concat!(
            r#"<input name="api_key" value="by-name">"#,
            r#"<input id="api_key" value="by-id">"#,
        );
        assert_eq!(extract_api_token(html), Some("by-id".into()));
    }

    #[test]
    fn api_token_falls_back_to_name() {
        let html = r#"<input type="text" name="api_key" value="fallback-token">"#;
        assert_eq!(extract_api_token(html), Some("fallback-token".into()));
    }

    #[test]
    fn api_token_absent_is_none() {
        assert_eq!(extract_api_token("<p>not logged in</p>"), None);
    }
}
