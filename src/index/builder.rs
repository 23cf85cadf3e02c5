//! Network traversal that builds a fresh index.
//!
//! Courses, then each course's modules page, then every module item page. A
//! failure fetching a course's modules or an item page is logged and that unit
//! is skipped; only an unreachable course list stops the crawl.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info, instrument, warn};

use super::error::IndexError;
use super::model::{Course, FileEntry, Index, Module, file_path, module_dir};
use crate::DISCOVERY_TARGET;
use crate::download::{FetchError, PortalClient};
use crate::parser::{
    CourseListing, EmbeddedPage, FileLink, ModuleItem, extract_embedded_page, parse_courses,
    parse_file_download_link, parse_modules_and_items, sanitize_path_segment,
};
use crate::progress::ProgressObserver;

/// URL fragment of the portal's wiki-style "page" items.
pub const PAGE_ROUTE_MARKER: &str = "/pages/";

/// What the builder needs to know about the portal and the local layout.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Portal root without a trailing slash.
    pub base_url: String,
    /// Root of the local mirror.
    pub download_dir: PathBuf,
    /// Write Markdown notes for "page" items.
    pub save_pages: bool,
}

/// Crawls the portal into an [`Index`].
pub struct IndexBuilder<'a> {
    client: &'a PortalClient,
    settings: &'a BuildSettings,
    observer: &'a dyn ProgressObserver,
}

/// Where files found on one module item go.
struct ItemContext<'c> {
    course_name: &'c str,
    module_name: &'c str,
}

impl<'a> IndexBuilder<'a> {
    #[must_use]
    pub fn new(
        client: &'a PortalClient,
        settings: &'a BuildSettings,
        observer: &'a dyn ProgressObserver,
    ) -> Self {
        Self {
            client,
            settings,
            observer,
        }
    }

    /// Builds a fresh index from the portal.
    ///
    /// `downloaded` flags reflect the disk at discovery time and totals are
    /// computed; `download_log` holds every entry found on disk.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::CourseList`] when the course list cannot be fetched.
    #[instrument(skip(self), fields(base_url = %self.settings.base_url))]
    pub async fn crawl(&self) -> Result<Index, IndexError> {
        let listings = {
            let _spinner = self.observer.spinner("Fetching course list");
            let page = self
                .client
                .get_page(&format!("{}/courses", self.settings.base_url))
                .await
                .map_err(IndexError::CourseList)?;
            parse_courses(&page.body)
        };
        info!(courses = listings.len(), "indexing courses");
        self.observer.indexing_started(listings.len());

        let mut index = Index::default();
        for listing in &listings {
            match self.index_course(listing).await {
                Ok(course) => {
                    info!(
                        course = %course.name,
                        files = course.modules.iter().map(|m| m.files.len()).sum::<usize>(),
                        "indexed course"
                    );
                    index.courses.push(course);
                }
                Err(error) => warn!(course = %listing.name, %error, "skipping course"),
            }
            self.observer.course_finished(&listing.name);
        }

        let on_disk = index
            .files()
            .filter(|file| file.downloaded)
            .map(|file| file.path.clone())
            .collect::<Vec<_>>();
        for path in &on_disk {
            index.mark_downloaded(path);
        }
        index.recompute_totals();
        Ok(index)
    }

    async fn index_course(&self, listing: &CourseListing) -> Result<Course, FetchError> {
        let modules_url = format!(
            "{}/courses/{}/modules",
            self.settings.base_url, listing.id
        );
        let page = {
            let _spinner = self.observer.spinner(&format!("Fetching {}", listing.name));
            self.client.get_page(&modules_url).await?
        };
        let stubs = parse_modules_and_items(&page.body, &listing.id, &self.settings.base_url);
        let items = stubs.iter().map(|stub| stub.items.len()).sum();
        self.observer.course_started(&listing.name, items);

        let mut seen = HashSet::new();
        let mut modules = Vec::with_capacity(stubs.len());
        for stub in stubs {
            info!(target: DISCOVERY_TARGET, module = %stub.name, "Indexing module: {}", stub.name);
            let mut module = Module::new(stub.name);
            let context = ItemContext {
                course_name: &listing.name,
                module_name: &module.name,
            };

            let mut files = Vec::new();
            for item in &stub.items {
                match self.index_item(&context, item).await {
                    Ok(found) => {
                        self.observer.item_indexed(found.len());
                        files.extend(found);
                    }
                    Err(error) => {
                        self.observer.item_indexed(0);
                        warn!(item = %item.title, %error, "skipping module item");
                    }
                }
            }

            for file in files {
                if seen.insert(file.path.clone()) {
                    module.files.push(file);
                } else {
                    debug!(path = %file.path.display(), "skipping duplicate file");
                }
            }
            modules.push(module);
        }

        Ok(Course {
            id: listing.id.clone(),
            name: listing.name.clone(),
            modules,
            ..Course::default()
        })
    }

    async fn index_item(
        &self,
        context: &ItemContext<'_>,
        item: &ModuleItem,
    ) -> Result<Vec<FileEntry>, FetchError> {
        let page = self.client.get_page(&item.url).await?;
        let base_url = &self.settings.base_url;

        if let Some(link) = parse_file_download_link(&page.body, base_url) {
            let entry = self.file_entry(context, link).await;
            info!(target: DISCOVERY_TARGET, size = entry.size, "Found file: {}", entry.name);
            return Ok(vec![entry]);
        }

        if !page.final_url.contains(PAGE_ROUTE_MARKER) {
            debug!(item = %item.title, "no file on item page");
            return Ok(Vec::new());
        }

        let links = match extract_embedded_page(&page.body, base_url) {
            Some(embedded) => {
                if self.settings.save_pages {
                    self.save_page_notes(context, &item.title, &embedded).await;
                }
                embedded
                    .candidates
                    .into_iter()
                    .map(|candidate| candidate.link)
                    .collect()
            }
            None => {
                debug!(item = %item.title, "page has no serialized body");
                Vec::new()
            }
        };

        let mut entries = Vec::with_capacity(links.len());
        for link in links {
            let entry = self.file_entry(context, link).await;
            info!(target: DISCOVERY_TARGET, size = entry.size, "Found linked file: {}", entry.name);
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn file_entry(&self, context: &ItemContext<'_>, link: FileLink) -> FileEntry {
        let size = match self.client.probe_size(&link.url).await {
            Ok(size) => size,
            Err(error) => {
                debug!(file = %link.name, %error, "could not get file size");
                0
            }
        };
        let path = file_path(
            &self.settings.download_dir,
            context.course_name,
            context.module_name,
            &link.name,
        );
        let downloaded = tokio::fs::metadata(&path)
            .await
            .is_ok_and(|meta| meta.is_file());

        FileEntry {
            name: link.name,
            url: link.url,
            size,
            downloaded,
            path,
        }
    }

    async fn save_page_notes(&self, context: &ItemContext<'_>, title: &str, page: &EmbeddedPage) {
        let markdown = page.to_markdown(&page.local_rewrites());
        let module_dir = module_dir(
            &self.settings.download_dir,
            context.course_name,
            context.module_name,
        );
        let path = module_dir.join(notes_filename(title));

        let written = match tokio::fs::create_dir_all(&module_dir).await {
            Ok(()) => tokio::fs::write(&path, markdown).await,
            Err(error) => Err(error),
        };
        match written {
            Ok(()) => debug!(path = %path.display(), "saved page notes"),
            Err(error) => warn!(path = %path.display(), %error, "could not save page notes"),
        }
    }
}

/// `<title>.md`, sanitized, with a fallback for empty titles.
fn notes_filename(title: &str) -> String {
    let stem = sanitize_path_segment(title.trim());
    if stem.is_empty() {
        "page.md".to_string()
    } else {
        format!("{stem}.md")
    }
}
