//! Browser cookie export parser and reqwest jar loader.
//!
//! Accepts the two JSON shapes browser extensions export: an object mapping
//! cookie names to values, or an array of cookie objects with at least `name`
//! and `value`. Cookies are loaded into a `reqwest::cookie::Jar` scoped to the
//! portal host, or to the cookie's own domain when the export names one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use reqwest::cookie::Jar;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

/// A single cookie from an export file.
///
/// The value is redacted in Debug output to prevent accidental logging of
/// session credentials.
#[derive(Clone, Deserialize)]
pub struct SessionCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value (sensitive, never log).
    value: String,
    /// Domain the cookie belongs to (e.g. `.example.edu`); `None` means the portal host.
    #[serde(default)]
    pub domain: Option<String>,
    /// URL path scope.
    #[serde(default)]
    pub path: Option<String>,
    /// Whether the cookie should only be sent over HTTPS.
    #[serde(default)]
    pub secure: bool,
}

impl SessionCookie {
    /// Creates a host-only cookie for the portal.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
        }
    }

    /// Returns the cookie value.
    ///
    /// Cookie values are sensitive, avoid logging the return value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("path", &self.path)
            .field("secure", &self.secure)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CookieExport {
    Map(BTreeMap<String, String>),
    List(Vec<SessionCookie>),
}

/// Parses a JSON cookie export in either shape.
///
/// Entries with an empty name are dropped.
///
/// # Errors
///
/// Returns the parser error when the text is neither shape.
#[instrument(level = "debug", skip(text))]
pub fn parse_cookie_export(text: &str) -> Result<Vec<SessionCookie>, serde_json::Error> {
    let cookies = match serde_json::from_str::<CookieExport>(text)? {
        CookieExport::Map(map) => map
            .into_iter()
            .map(|(name, value)| SessionCookie::new(name, value))
            .collect::<Vec<_>>(),
        CookieExport::List(list) => list,
    };

    Ok(cookies
        .into_iter()
        .filter(|cookie| {
            let keep = !cookie.name.trim().is_empty();
            if !keep {
                warn!("skipping cookie without a name");
            }
            keep
        })
        .collect())
}

/// Loads cookies into a `reqwest::cookie::Jar`.
///
/// Each cookie is converted to a `Set-Cookie` header string and added to the
/// jar against the portal URL (host-only) or its own domain.
///
/// # Returns
///
/// An `Arc<Jar>` suitable for passing to `reqwest::ClientBuilder::cookie_provider()`.
#[instrument(level = "debug", skip(cookies, portal), fields(count = cookies.len()))]
pub fn load_cookies_into_jar(cookies: &[SessionCookie], portal: &Url) -> Arc<Jar> {
    let jar = Arc::new(Jar::default());

    for cookie in cookies {
        match origin_url(cookie, portal) {
            Some(origin) => {
                jar.add_cookie_str(&build_set_cookie_string(cookie), &origin);
                debug!(
                    domain = cookie.domain.as_deref().unwrap_or_default(),
                    name = %cookie.name,
                    "loaded cookie into jar"
                );
            }
            None => warn!(
                domain = cookie.domain.as_deref().unwrap_or_default(),
                name = %cookie.name,
                "skipping cookie with unparseable domain"
            ),
        }
    }

    jar
}

/// Builds a `Set-Cookie` header string. Without an explicit domain the cookie
/// stays host-only.
fn build_set_cookie_string(cookie: &SessionCookie) -> String {
    let mut parts = vec![format!("{}={}", cookie.name, cookie.value())];
    if let Some(domain) = cookie.domain.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("Domain={domain}"));
    }
    parts.push(format!("Path={}", cookie.path.as_deref().unwrap_or("/")));
    if cookie.secure {
        parts.push("Secure".to_string());
    }
    parts.join("; ")
}

/// URL the cookie is set against: the portal itself, or the cookie's domain
/// (leading dot stripped) with the portal's scheme.
fn origin_url(cookie: &SessionCookie, portal: &Url) -> Option<Url> {
    match cookie.domain.as_deref().filter(|d| !d.is_empty()) {
        None => Some(portal.clone()),
        Some(domain) => {
            let host = domain.strip_prefix('.').unwrap_or(domain);
            let scheme = if cookie.secure { "https" } else { portal.scheme() };
            let port = portal
                .port()
                .filter(|_| portal.host_str() == Some(host))
                .map(|port| format!(":{port}"))
                .unwrap_or_default();
            Url::parse(&format!("{scheme}://{host}{port}/")).ok()
        }
    }
}
