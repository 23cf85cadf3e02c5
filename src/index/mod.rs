//! The course → module → file index.
//!
//! - [`Index`] and its children are the persisted shapes, with disk reconciliation
//! - [`IndexStore`] loads and saves the index file
//! - [`IndexBuilder`] crawls the portal into a fresh index
//! - [`prepare`] picks between the saved index and a crawl

mod builder;
mod error;
mod model;
mod state;
mod store;

pub use builder::{BuildSettings, IndexBuilder, PAGE_ROUTE_MARKER};
pub use error::IndexError;
pub use model::{
    Course, FileEntry, Index, IndexSummary, Module, ReconcileReport, file_path, module_dir,
};
pub use state::{Decisions, IndexOrigin, IndexState, PreparedIndex, StaticDecisions, prepare};
pub use store::IndexStore;
