//! Link classification and local filename derivation.
//!
//! Decides whether a hyperlink found on a portal page points at a downloadable
//! file, and turns it into a filesystem-safe name. Everything here is pure.

use std::sync::LazyLock;

use regex::Regex;

/// Extensions that make a URL a file regardless of its anchor text.
pub const DOWNLOADABLE_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx", ".zip", ".rar", ".7z", ".tar",
    ".gz", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".svg", ".mp3", ".mp4", ".avi", ".mov",
    ".wav", ".txt", ".csv", ".json", ".xml", ".html", ".css", ".js", ".py", ".java", ".cpp",
    ".c", ".h", ".sql", ".db", ".sqlite", ".rtf", ".odt", ".ods", ".odp",
];

/// Anchor text fragments that suggest a file (checked case-insensitively).
const FILE_TEXT_INDICATORS: &[&str] = &[
    "download",
    "attachment",
    "file",
    ".pdf",
    ".doc",
    ".ppt",
    ".xls",
    "handout",
    "worksheet",
    "assignment",
    "syllabus",
    "slides",
];

/// Anchor text fragments that mark navigation rather than content.
const NAVIGATION_TEXT_INDICATORS: &[&str] = &[
    "http://www.",
    "https://www.",
    "wiki",
    "page",
    "module",
    "discussion",
    "assignment submission",
    "grade",
    "course",
];

/// Name used when neither the URL nor the anchor text yields anything usable.
pub const PLACEHOLDER_FILENAME: &str = "downloaded_file";

/// Replaces a path segment that consists only of dots.
pub const DOT_SEGMENT_PLACEHOLDER: &str = "_";

/// Characters stripped from every name used as a path segment.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Portal routes that serve file content.
#[allow(clippy::expect_used)]
static PORTAL_FILE_ROUTES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/courses/\d+/files/\d+",
        r"/files/\d+",
        r"/download\?download_frd=1",
        r"/courses/\d+/file_contents/",
        r"/users/\d+/files/\d+",
        r"instructure\.com.*files",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("portal file route regex is valid")) // Static pattern
    .collect()
});

/// Which rule decided a link's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// URL ends in (or carries before `?`/`#`) an allow-listed extension.
    Extension,
    /// URL matches a portal file route.
    PortalRoute,
    /// Anchor text reads like a file.
    FileText,
    /// Anchor text reads like navigation and the URL has no file extension.
    Navigation,
    /// Nothing matched.
    Unrecognized,
}

impl LinkKind {
    /// Returns true when the link should be treated as a downloadable file.
    #[must_use]
    pub fn is_file(self) -> bool {
        matches!(self, Self::Extension | Self::PortalRoute | Self::FileText)
    }
}

/// Classifies a link. Rules are evaluated in order and the first match wins;
/// extension matches are authoritative, text heuristics come last.
#[must_use]
pub fn classify_link(url: &str, anchor_text: &str) -> LinkKind {
    let url_lower = url.to_lowercase();
    if has_downloadable_extension(&url_lower) {
        return LinkKind::Extension;
    }

    if PORTAL_FILE_ROUTES.iter().any(|route| route.is_match(url)) {
        return LinkKind::PortalRoute;
    }

    let text_lower = anchor_text.to_lowercase();
    if FILE_TEXT_INDICATORS
        .iter()
        .any(|indicator| text_lower.contains(indicator))
    {
        return LinkKind::FileText;
    }

    let mentions_extension = DOWNLOADABLE_EXTENSIONS
        .iter()
        .any(|ext| url_lower.contains(ext));
    if !mentions_extension
        && NAVIGATION_TEXT_INDICATORS
            .iter()
            .any(|indicator| text_lower.contains(indicator))
    {
        return LinkKind::Navigation;
    }

    LinkKind::Unrecognized
}

/// Returns true when the link likely points at a downloadable file.
#[must_use]
pub fn is_downloadable(url: &str, anchor_text: &str) -> bool {
    classify_link(url, anchor_text).is_file()
}

fn has_downloadable_extension(url_lower: &str) -> bool {
    DOWNLOADABLE_EXTENSIONS.iter().any(|ext| {
        url_lower.ends_with(ext)
            || url_lower.contains(&format!("{ext}?"))
            || url_lower.contains(&format!("{ext}#"))
    })
}

/// Derives a local filename for a link.
///
/// The last URL path segment wins when it looks like a real filename (non-empty,
/// not purely numeric, contains a `.`). Otherwise the anchor text is used, minus
/// a leading "download " and plus the URL's trailing extension when the text has
/// none. The result is always sanitized and never empty.
#[must_use]
pub fn derive_filename(url: &str, anchor_text: &str) -> String {
    let url_path = strip_query_and_fragment(url);
    let last_segment = url_path.rsplit('/').next().unwrap_or_default();

    let candidate = if looks_like_filename(last_segment) {
        last_segment.to_string()
    } else {
        let mut name = strip_download_prefix(anchor_text.trim()).to_string();
        if !name.contains('.')
            && let Some(ext) = trailing_extension(url_path)
        {
            name.push_str(ext);
        }
        name
    };

    let sanitized = sanitize_path_segment(&candidate);
    if sanitized.is_empty() {
        PLACEHOLDER_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// Removes characters that are not allowed in a file or directory name.
///
/// A name made only of dots would address the current or parent directory,
/// so it becomes [`DOT_SEGMENT_PLACEHOLDER`].
#[must_use]
pub fn sanitize_path_segment(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect();
    let trimmed = sanitized.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c == '.') {
        DOT_SEGMENT_PLACEHOLDER.to_string()
    } else {
        sanitized
    }
}

/// Strips a leading "download " (any case) from anchor text.
#[must_use]
pub fn strip_download_prefix(text: &str) -> &str {
    const PREFIX: &str = "download ";
    match text.get(..PREFIX.len()) {
        Some(head) if head.eq_ignore_ascii_case(PREFIX) => text[PREFIX.len()..].trim_start(),
        _ => text,
    }
}

fn strip_query_and_fragment(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

fn looks_like_filename(segment: &str) -> bool {
    !segment.is_empty() && !segment.chars().all(|c| c.is_ascii_digit()) && segment.contains('.')
}

/// Extension after the last `.` of the path, dot included, at most 5 chars.
fn trailing_extension(url_path: &str) -> Option<&str> {
    let dot = url_path.rfind('.')?;
    let ext = &url_path[dot..];
    (ext.len() > 1 && ext.len() <= 5 && !ext.contains('/')).then_some(ext)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_every_allowed_extension_is_downloadable_regardless_of_text() {
        for ext in DOWNLOADABLE_EXTENSIONS {
            let url = format!("https://portal.example.edu/some/file{ext}");
            assert!(
                is_downloadable(&url, "Course Home"),
                "expected {url} to be downloadable"
            );
            assert_eq!(classify_link(&url, "wiki page"), LinkKind::Extension);
        }
    }

    #[test]
    fn test_extension_before_query_or_fragment() {
        assert!(is_downloadable("https://x/notes.PDF?verifier=1", ""));
        assert!(is_downloadable("https://x/notes.pptx#slide=3", ""));
    }

    #[test]
    fn test_download_marker_with_syllabus_text() {
        assert!(is_downloadable("https://x/a?download_frd=1", "Syllabus"));
    }

    #[test]
    fn test_course_navigation_is_not_downloadable() {
        assert!(!is_downloadable("https://x/courses/5", "Course Home"));
        assert_eq!(
            classify_link("https://x/courses/5", "Course Home"),
            LinkKind::Navigation
        );
    }

    #[test]
    fn test_portal_routes() {
        for url in [
            "https://canvas.example.edu/courses/12/files/345",
            "https://canvas.example.edu/files/9",
            "https://canvas.example.edu/files/9/download?download_frd=1",
            "https://canvas.example.edu/courses/12/file_contents/course%20files/a",
            "https://canvas.example.edu/users/4/files/77",
            "https://school.instructure.com/x/files",
        ] {
            assert_eq!(classify_link(url, ""), LinkKind::PortalRoute, "{url}");
        }
    }

    #[test]
    fn test_file_text_wins_over_navigation_text() {
        // "assignment submission" also contains "assignment", which is checked first.
        assert_eq!(
            classify_link("https://x/courses/5/assignments/2", "Assignment submission"),
            LinkKind::FileText
        );
    }

    #[test]
    fn test_unrecognized_link_defaults_to_false() {
        assert_eq!(
            classify_link("https://example.com/about", "About us"),
            LinkKind::Unrecognized
        );
        assert!(!is_downloadable("https://example.com/about", "About us"));
    }

    #[test]
    fn test_derive_filename_falls_back_to_anchor_text() {
        assert_eq!(
            derive_filename(
                "https://x/files/42/download?verifier=abc",
                "Download Lecture1.pdf"
            ),
            "Lecture1.pdf"
        );
    }

    #[test]
    fn test_derive_filename_prefers_url_segment() {
        assert_eq!(
            derive_filename("https://x/static/week1-notes.pdf?x=1", "Week 1"),
            "week1-notes.pdf"
        );
    }

    #[test]
    fn test_derive_filename_numeric_segment_uses_text() {
        assert_eq!(derive_filename("https://x/files/42", "Reading list"), "Reading list");
    }

    #[test]
    fn test_derive_filename_appends_short_extension() {
        assert_eq!(
            derive_filename("https://x/get/report.docx", "report"),
            "report.docx"
        );
        assert_eq!(derive_filename("https://x/get/archive.backup", "Data"), "archive.backup");
        assert_eq!(derive_filename("https://x/a/b/c.longext", ""), "c.longext");
    }

    #[test]
    fn test_derive_filename_ignores_long_or_slashed_extensions() {
        assert_eq!(derive_filename("https://a.io/x", "Notes"), "Notes");
        assert_eq!(derive_filename("https://portal.edu/files/1", "Notes"), "Notes");
    }

    #[test]
    fn test_derive_filename_sanitizes_and_never_empty() {
        assert_eq!(derive_filename("https://x/1", "a/b:c*?"), "abc");
        assert_eq!(derive_filename("https://x/1", "  "), PLACEHOLDER_FILENAME);
        assert_eq!(derive_filename("", ""), PLACEHOLDER_FILENAME);
    }

    #[test]
    fn test_strip_download_prefix_is_case_insensitive() {
        assert_eq!(strip_download_prefix("DOWNLOAD  slides.pdf"), "slides.pdf");
        assert_eq!(strip_download_prefix("Downloads.pdf"), "Downloads.pdf");
        assert_eq!(strip_download_prefix("dl"), "dl");
    }

    #[test]
    fn test_sanitize_path_segment_removes_forbidden_chars() {
        assert_eq!(
            sanitize_path_segment(r#"Week 1: "Intro" <draft>|v2?*\/"#),
            "Week 1 Intro draftv2"
        );
    }

    #[test]
    fn test_sanitize_path_segment_replaces_dot_only_names() {
        assert_eq!(sanitize_path_segment(".."), DOT_SEGMENT_PLACEHOLDER);
        assert_eq!(sanitize_path_segment("."), DOT_SEGMENT_PLACEHOLDER);
        assert_eq!(sanitize_path_segment(" ... "), DOT_SEGMENT_PLACEHOLDER);
        assert_eq!(sanitize_path_segment("../"), DOT_SEGMENT_PLACEHOLDER);
        assert_eq!(sanitize_path_segment("..notes"), "..notes");
        assert_eq!(sanitize_path_segment(".hidden"), ".hidden");
        assert_eq!(derive_filename("https://x/files/..", ".."), DOT_SEGMENT_PLACEHOLDER);
    }
}
