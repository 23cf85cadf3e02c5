//! Structured extraction from portal HTML pages.
//!
//! Each function takes the raw HTML of one page and returns what it found.
//! Missing structure yields an empty result; nothing here fails.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, trace};

use super::link::{derive_filename, is_downloadable, sanitize_path_segment, strip_download_prefix};

/// Module name used when a module container has no name element.
pub const UNKNOWN_MODULE_NAME: &str = "UnknownModule";

/// Marker carried by the portal's explicit "download this file" links.
pub const DOWNLOAD_MARKER: &str = "/download?download_frd=1";

macro_rules! selector {
    ($name:ident, $css:literal) => {
        #[allow(clippy::expect_used)]
        static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect("static CSS selector is valid"));
    };
}

selector!(COURSE_ROW, "tr.course-list-table-row");
selector!(COURSE_NAME, ".course-list-course-title-column .name");
selector!(COURSE_ID, ".course-list-star-column [data-course-id]");
selector!(MODULE_CONTAINER, "div.item-group-condensed.context_module");
selector!(MODULE_NAME, "span.name");
selector!(MODULE_ITEM, "li.context_module_item");
selector!(ITEM_LINK, "a.item_link");
selector!(EXPLICIT_DOWNLOAD, r#"a[download="true"]"#);
selector!(ANCHOR_WITH_HREF, "a[href]");

/// A course row from the course list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseListing {
    /// Portal-assigned course id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A module as listed on a course's modules page, before its items are visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStub {
    /// Sanitized module name.
    pub name: String,
    /// Items in page order.
    pub items: Vec<ModuleItem>,
}

/// One entry of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleItem {
    /// Link text.
    pub title: String,
    /// Absolute item URL.
    pub url: String,
}

/// A link judged to be a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    /// Local filename.
    pub name: String,
    /// Absolute download URL.
    pub url: String,
}

/// Extracts the course list.
///
/// Rows missing either the name element or the `data-course-id` attribute are
/// skipped.
#[must_use]
#[instrument(level = "debug", skip(html), fields(html_len = html.len()))]
pub fn parse_courses(html: &str) -> Vec<CourseListing> {
    let document = Html::parse_document(html);
    let mut courses = Vec::new();

    for row in document.select(&COURSE_ROW) {
        let name = row.select(&COURSE_NAME).next().map(element_text);
        let id = row
            .select(&COURSE_ID)
            .next()
            .and_then(|el| el.value().attr("data-course-id"))
            .map(str::trim);

        match (name, id) {
            (Some(name), Some(id)) => courses.push(CourseListing {
                id: id.to_string(),
                name,
            }),
            _ => trace!("skipping course row without name or id"),
        }
    }

    if courses.is_empty() {
        debug!("no course rows found");
    }
    courses
}

/// Extracts modules and their items from a course's modules page.
#[must_use]
#[instrument(level = "debug", skip(html, base_url), fields(html_len = html.len()))]
pub fn parse_modules_and_items(html: &str, course_id: &str, base_url: &str) -> Vec<ModuleStub> {
    let document = Html::parse_document(html);
    let mut modules = Vec::new();

    for container in document.select(&MODULE_CONTAINER) {
        let raw_name = container
            .select(&MODULE_NAME)
            .next()
            .map(element_text)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_MODULE_NAME.to_string());
        let name = sanitize_path_segment(&raw_name);

        let items = container
            .select(&MODULE_ITEM)
            .filter_map(|li| li.select(&ITEM_LINK).next())
            .filter_map(|link| {
                let href = link.value().attr("href")?.trim();
                (!href.is_empty()).then(|| ModuleItem {
                    title: element_text(link),
                    url: resolve_href(base_url, href),
                })
            })
            .collect();

        modules.push(ModuleStub { name, items });
    }

    if modules.is_empty() {
        debug!("no module containers found");
    }
    modules
}

/// Finds the file link on an item page.
///
/// The portal's explicit download anchor wins; otherwise the first anchor the
/// link classifier accepts is returned.
#[must_use]
#[instrument(level = "debug", skip(html, base_url), fields(html_len = html.len()))]
pub fn parse_file_download_link(html: &str, base_url: &str) -> Option<FileLink> {
    let document = Html::parse_document(html);

    if let Some(anchor) = document.select(&EXPLICIT_DOWNLOAD).next()
        && let Some(href) = anchor.value().attr("href")
        && href.contains(DOWNLOAD_MARKER)
    {
        let url = resolve_href(base_url, href);
        let text = element_text(anchor);
        let name = sanitize_path_segment(strip_download_prefix(&text).trim());
        let name = if name.is_empty() {
            derive_filename(&url, &text)
        } else {
            name
        };
        return Some(FileLink { name, url });
    }

    first_downloadable_anchor(document.root_element(), base_url)
}

/// Collects every downloadable anchor under `root`, in document order.
#[must_use]
pub fn collect_downloadable_anchors(root: ElementRef<'_>, base_url: &str) -> Vec<AnchorMatch> {
    root.select(&ANCHOR_WITH_HREF)
        .filter_map(|anchor| classify_anchor(anchor, base_url))
        .collect()
}

/// A downloadable anchor together with the href it was written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorMatch {
    /// Resolved link.
    pub link: FileLink,
    /// The href exactly as it appeared in the document.
    pub original_href: String,
}

fn first_downloadable_anchor(root: ElementRef<'_>, base_url: &str) -> Option<FileLink> {
    root.select(&ANCHOR_WITH_HREF)
        .find_map(|anchor| classify_anchor(anchor, base_url))
        .map(|matched| matched.link)
}

fn classify_anchor(anchor: ElementRef<'_>, base_url: &str) -> Option<AnchorMatch> {
    let href = anchor.value().attr("href")?;
    if is_skippable_href(href) {
        return None;
    }
    let text = element_text(anchor);
    let url = resolve_href(base_url, href);
    if !is_downloadable(&url, &text) {
        return None;
    }
    Some(AnchorMatch {
        link: FileLink {
            name: derive_filename(&url, &text),
            url,
        },
        original_href: href.to_string(),
    })
}

/// Empty, in-page and `mailto:` links never point at files.
fn is_skippable_href(href: &str) -> bool {
    href.is_empty() || href.starts_with('#') || href.starts_with("mailto:")
}

/// Makes root-relative hrefs absolute against the portal base URL.
#[must_use]
pub fn resolve_href(base_url: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{href}", base_url.trim_end_matches('/'))
    } else {
        href.to_string()
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
