//! HTML extraction for curriculum pages.
//!
//! This crate provides:
//! - [`text`]: Text cleaning, label normalization, numeric parsing
//! - [`details`]: Detail fragment → canonical sections
//! - [`curriculum`]: Semester accordion → ordered module/course items
//! - [`facts`]: Program fact list → canonical and slug-keyed facts
//! - [`program`]: Whole program page → [`ProgramRecord`](curricula_shared::ProgramRecord)
//!
//! Everything here is pure: no I/O, no errors. Missing markup becomes `None`.

pub mod curriculum;
pub mod details;
pub mod facts;
pub mod program;
pub mod text;

pub use curriculum::{extract_curriculum, parse_curriculum_html};
pub use details::{parse_detail_html, section_key};
pub use facts::{KnownFact, KnownFacts, ProgramFacts, normalize_facts};
pub use program::{extract_program, fact_pairs};
pub use text::{clean_text, normalize_label, parse_number, slugify_label};
