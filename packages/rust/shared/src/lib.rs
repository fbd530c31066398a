//! Shared types, error model, and configuration for Curricula.
//!
//! This crate is the foundation depended on by all other Curricula crates.
//! It provides:
//! - [`CurriculaError`]: the unified error type
//! - Document types ([`ProgramRecord`], [`CurriculumItem`], [`DetailSections`], [`FactValue`])
//! - Configuration ([`AppConfig`], [`DatabaseConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DatabaseConfig, ImportConfig, OutputConfig, SourceConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_db_token,
};
pub use error::{CurriculaError, Result};
pub use types::{
    CurriculumItem, DetailBlock, DetailSections, DocumentEntry, FactInput, FactValue, ItemKind,
    ProgramRecord, ScrapeFailure,
};
