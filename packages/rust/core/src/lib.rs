//! Core pipeline orchestration and domain logic for Curricula.
//!
//! This crate ties harvesting, the intermediate document and the relational
//! import together into the two end-to-end workflows, `scrape` and `import`.

pub mod document;
pub mod identity;
pub mod importer;
pub mod pipeline;

pub use document::{load_document, save_document};
pub use importer::{ImportOutcome, ImportStats, import_entries, run_import};
pub use pipeline::{
    ImportReport, ProgressReporter, ScrapeSummary, SilentProgress, import_document,
    scrape_programs,
};
