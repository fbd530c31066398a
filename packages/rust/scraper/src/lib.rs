//! Page harvesting for curriculum sites.
//!
//! This crate provides:
//! - [`source`]: The [`PageSource`] seam and its HTTP implementation
//! - [`listing`]: Program URL discovery from the listing page
//! - [`harvest`]: Sequential listing → program → document entry loop

pub mod harvest;
pub mod listing;
pub mod source;

pub use harvest::Harvester;
pub use listing::discover_program_urls;
pub use source::{HttpSource, PageSource};
