//! Core document types for harvested curricula.
//!
//! These types define the intermediate JSON document written by the scraper
//! and read by the importer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed keys of a [`ProgramRecord`]. Extra slug-keyed facts never override these.
pub const RESERVED_RECORD_KEYS: &[&str] = &[
    "program_url",
    "program_title",
    "degree",
    "semesters",
    "mode",
    "total_ects",
    "language",
    "application_period",
    "start_dates",
    "curriculum",
];

// ---------------------------------------------------------------------------
// Fact values
// ---------------------------------------------------------------------------

/// Raw value of one program fact as found in the markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactInput {
    /// Newline-preserving text of the value element.
    Text(String),
    /// Item texts of a list inside the value element.
    List(Vec<String>),
}

/// A normalized program fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    /// Integer extracted from a numeric fact (semester count, total ECTS).
    Number(i64),
    /// Cleaned text.
    Text(String),
    /// Several values: list items, or repeated occurrences of one label.
    List(Vec<FactValue>),
    /// A fact the page lists without a value. Serialized as `null`.
    Missing,
}

impl FactValue {
    /// Render the value for a text column. Lists are joined with `"; "`,
    /// skipping missing entries.
    pub fn to_column_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .filter(|item| !item.is_missing())
                .map(FactValue::to_column_text)
                .collect::<Vec<_>>()
                .join("; "),
            Self::Missing => String::new(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The integer value, if this fact is a single number.
    pub fn as_count(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Detail sections
// ---------------------------------------------------------------------------

/// One block of a detail section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DetailBlock {
    /// A paragraph of text.
    Text { content: String },
    /// A bullet or numbered list.
    List { ordered: bool, items: Vec<String> },
}

/// The six canonical section keys of a module/course description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKey {
    Content,
    LearningOutcomes,
    TeachingMethod,
    ExamMethod,
    Literature,
    TeachingLanguage,
}

impl SectionKey {
    /// Snake-case key as used in the document and the database columns.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::LearningOutcomes => "learning_outcomes",
            Self::TeachingMethod => "teaching_method",
            Self::ExamMethod => "exam_method",
            Self::Literature => "literature",
            Self::TeachingLanguage => "teaching_language",
        }
    }
}

/// Structured description of a module or course, keyed by canonical section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailSections {
    #[serde(default)]
    pub content: Option<Vec<DetailBlock>>,
    #[serde(default)]
    pub learning_outcomes: Option<Vec<DetailBlock>>,
    #[serde(default)]
    pub teaching_method: Option<Vec<DetailBlock>>,
    #[serde(default)]
    pub exam_method: Option<Vec<DetailBlock>>,
    #[serde(default)]
    pub literature: Option<Vec<DetailBlock>>,
    #[serde(default)]
    pub teaching_language: Option<Vec<DetailBlock>>,
}

impl DetailSections {
    /// Mutable slot for a canonical key.
    pub fn slot_mut(&mut self, key: SectionKey) -> &mut Option<Vec<DetailBlock>> {
        match key {
            SectionKey::Content => &mut self.content,
            SectionKey::LearningOutcomes => &mut self.learning_outcomes,
            SectionKey::TeachingMethod => &mut self.teaching_method,
            SectionKey::ExamMethod => &mut self.exam_method,
            SectionKey::Literature => &mut self.literature,
            SectionKey::TeachingLanguage => &mut self.teaching_language,
        }
    }

    /// Read-only slot for a canonical key.
    pub fn get(&self, key: SectionKey) -> Option<&[DetailBlock]> {
        let slot = match key {
            SectionKey::Content => &self.content,
            SectionKey::LearningOutcomes => &self.learning_outcomes,
            SectionKey::TeachingMethod => &self.teaching_method,
            SectionKey::ExamMethod => &self.exam_method,
            SectionKey::Literature => &self.literature,
            SectionKey::TeachingLanguage => &self.teaching_language,
        };
        slot.as_deref()
    }

    /// True when no section was captured.
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.learning_outcomes.is_none()
            && self.teaching_method.is_none()
            && self.exam_method.is_none()
            && self.literature.is_none()
            && self.teaching_language.is_none()
    }
}

// ---------------------------------------------------------------------------
// Curriculum items
// ---------------------------------------------------------------------------

/// Whether a curriculum entry is a module (grouping) or a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemKind {
    Module,
    Course,
}

impl ItemKind {
    /// Classify a marker's type attribute. Anything not naming a module is a course.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw {
            Some(t) if t.to_lowercase().contains("modul") => Self::Module,
            _ => Self::Course,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Course => "course",
        }
    }
}

impl From<String> for ItemKind {
    fn from(s: String) -> Self {
        Self::classify(Some(&s))
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One module or course entry of a program's curriculum, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurriculumItem {
    pub kind: ItemKind,
    #[serde(default)]
    pub title: Option<String>,
    /// Weekly contact hours.
    #[serde(default)]
    pub sws: Option<f64>,
    /// Credit points.
    #[serde(default)]
    pub ects: Option<f64>,
    /// Title of the most recent module preceding this course.
    #[serde(default)]
    pub parent_module: Option<String>,
    #[serde(default)]
    pub semester: Option<u32>,
    /// Inner HTML of the detail block, kept verbatim.
    #[serde(default)]
    pub details_html: Option<String>,
    #[serde(flatten)]
    pub details: DetailSections,
}

// ---------------------------------------------------------------------------
// Program records
// ---------------------------------------------------------------------------

/// A scraped program with canonical facts, curriculum, and every other fact by slug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    #[serde(default)]
    pub program_url: String,
    #[serde(default)]
    pub program_title: Option<String>,
    #[serde(default)]
    pub degree: Option<FactValue>,
    #[serde(default)]
    pub semesters: Option<FactValue>,
    #[serde(default)]
    pub mode: Option<FactValue>,
    #[serde(default)]
    pub total_ects: Option<FactValue>,
    #[serde(default)]
    pub language: Option<FactValue>,
    #[serde(default)]
    pub application_period: Option<FactValue>,
    #[serde(default)]
    pub start_dates: Option<FactValue>,
    #[serde(default)]
    pub curriculum: Vec<CurriculumItem>,
    /// Every fact of the page keyed by slugified label (minus the fixed keys above).
    #[serde(flatten)]
    pub extra: BTreeMap<String, FactValue>,
}

/// A program whose page could not be fetched or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeFailure {
    pub program_url: String,
    pub error: String,
}

/// One entry of the intermediate document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentEntry {
    Failed(ScrapeFailure),
    Program(ProgramRecord),
}

impl DocumentEntry {
    /// URL of the program this entry describes.
    pub fn program_url(&self) -> &str {
        match self {
            Self::Failed(f) => &f.program_url,
            Self::Program(p) => &p.program_url,
        }
    }
}
