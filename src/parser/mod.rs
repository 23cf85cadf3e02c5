//! Portal HTML parsing.
//!
//! Three layers, leaf first:
//! - [`link`] decides whether a hyperlink is a file and names it locally
//! - [`page`] pulls courses, modules, items and file links out of page HTML
//! - [`embedded`] recovers serialized "page" bodies and renders them as Markdown
//!
//! Everything in this module is pure: functions take HTML strings and return
//! values. A page without the expected structure yields an empty result.
//!
//! # Example
//!
//! ```
//! use coursevault_core::parser::{derive_filename, is_downloadable};
//!
//! assert!(is_downloadable("https://x/a?download_frd=1", "Syllabus"));
//! assert!(!is_downloadable("https://x/courses/5", "Course Home"));
//! assert_eq!(
//!     derive_filename("https://x/files/42/download?verifier=abc", "Download Lecture1.pdf"),
//!     "Lecture1.pdf"
//! );
//! ```

mod embedded;
mod link;
mod page;

pub use embedded::{EmbeddedPage, extract_body_payload, extract_embedded_page};
pub use link::{
    DOT_SEGMENT_PLACEHOLDER, DOWNLOADABLE_EXTENSIONS, LinkKind, PLACEHOLDER_FILENAME,
    classify_link, derive_filename, is_downloadable, sanitize_path_segment, strip_download_prefix,
};
pub use page::{
    AnchorMatch, CourseListing, DOWNLOAD_MARKER, FileLink, ModuleItem, ModuleStub,
    UNKNOWN_MODULE_NAME, collect_downloadable_anchors, parse_courses, parse_file_download_link,
    parse_modules_and_items, resolve_href,
};
