//! Serialized page bodies embedded in portal "page" documents.
//!
//! The portal ships wiki-style page content as a JSON string inside an inline
//! script (`"body":"..."`). Extraction is two-stage: pull the string out with a
//! pattern, unescape it (JSON backslash escapes, then HTML entities), and only
//! then parse the recovered fragment. This depends on one portal markup
//! version and is kept behind [`extract_embedded_page`] so it can be replaced
//! on its own when that markup changes.

use std::collections::HashMap;
use std::sync::LazyLock;

use htmd::HtmlToMarkdown;
use htmd::options::{HeadingStyle, Options};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use super::page::{AnchorMatch, collect_downloadable_anchors};

#[allow(clippy::expect_used)]
static BODY_PAYLOAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""body":"((?:[^"\\]|\\.)*)""#).expect("body payload regex is valid") // Static pattern
});

#[allow(clippy::expect_used)]
static TEXTAREA: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("textarea").expect("static CSS selector is valid"));

/// A page body recovered from its serialized payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPage {
    fragment: String,
    /// Downloadable links in document order.
    pub candidates: Vec<AnchorMatch>,
}

impl EmbeddedPage {
    /// The unescaped HTML fragment.
    #[must_use]
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Maps each candidate's original href to its local filename.
    #[must_use]
    pub fn local_rewrites(&self) -> HashMap<String, String> {
        self.candidates
            .iter()
            .map(|candidate| (candidate.original_href.clone(), candidate.link.name.clone()))
            .collect()
    }

    /// Renders the fragment as Markdown, pointing links found in `rewrites`
    /// at their local filenames.
    #[must_use]
    pub fn to_markdown(&self, rewrites: &HashMap<String, String>) -> String {
        html_to_markdown(&rewrite_hrefs(&self.fragment, rewrites))
    }
}

/// Locates the serialized body in a raw page and classifies its links.
///
/// Returns `None` when the payload is not present.
#[must_use]
#[instrument(level = "debug", skip(raw_html, base_url), fields(html_len = raw_html.len()))]
pub fn extract_embedded_page(raw_html: &str, base_url: &str) -> Option<EmbeddedPage> {
    let Some(fragment) = extract_body_payload(raw_html) else {
        debug!("no serialized page body found");
        return None;
    };

    let parsed = Html::parse_fragment(&fragment);
    let candidates = collect_downloadable_anchors(parsed.root_element(), base_url);
    debug!(candidates = candidates.len(), "classified embedded links");

    Some(EmbeddedPage {
        fragment,
        candidates,
    })
}

/// Stage one and two: find the payload string and unescape it.
#[must_use]
pub fn extract_body_payload(raw_html: &str) -> Option<String> {
    let captured = BODY_PAYLOAD.captures(raw_html)?.get(1)?.as_str();
    let unescaped = unescape_json_string(captured);
    Some(decode_html_entities(&unescaped))
}

fn unescape_json_string(escaped: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{escaped}\"")).unwrap_or_else(|error| {
        warn!(%error, "page body is not a valid JSON string, using it verbatim");
        escaped.to_string()
    })
}

/// Decodes character references without interpreting markup.
///
/// Textarea content is RCDATA: references are decoded, tags stay literal.
fn decode_html_entities(text: &str) -> String {
    if !text.contains('&') || text.to_ascii_lowercase().contains("</textarea") {
        return text.to_string();
    }
    // The parser drops one newline right after the start tag.
    let wrapped = Html::parse_fragment(&format!("<textarea>\n{text}</textarea>"));
    wrapped
        .select(&TEXTAREA)
        .next()
        .map_or_else(|| text.to_string(), |area| area.text().collect())
}

/// Points every anchor whose href is a key of `rewrites` at the mapped value.
///
/// The fragment is re-serialized first, so attribute values are compared in
/// one canonical escaping.
fn rewrite_hrefs(fragment: &str, rewrites: &HashMap<String, String>) -> String {
    let parsed = Html::parse_fragment(fragment);
    let mut html = parsed.root_element().inner_html();
    for (original, local) in rewrites {
        html = html.replace(
            &format!("href=\"{}\"", escape_attribute(original)),
            &format!("href=\"{}\"", escape_attribute(local)),
        );
    }
    html
}

/// Attribute escaping as the HTML serializer writes it.
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn html_to_markdown(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            ..Options::default()
        })
        .skip_tags(vec!["script", "style", "head"])
        .build();
    match converter.convert(html) {
        Ok(markdown) => {
            let body = markdown.trim();
            if body.is_empty() {
                String::new()
            } else {
                format!("{body}\n")
            }
        }
        Err(error) => {
            warn!(%error, "could not convert page body to Markdown, keeping HTML");
            html.to_string()
        }
    }
}
