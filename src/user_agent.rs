//! Client identity header sent with every portal request.
//!
//! The portal rejects default HTTP library identifiers, so requests present
//! themselves as a desktop browser.

/// Browser User-Agent used for all portal traffic.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Tool identifier, logged once per run so log files say which build wrote them.
#[must_use]
pub fn tool_identifier() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("coursevault/{version}")
}
