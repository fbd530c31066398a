//! Idempotent import of the intermediate document into the relational store.
//!
//! The whole document goes in under one transaction: programs, then each
//! program's modules, then its courses resolved against those modules. Any
//! failure rolls everything back.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use curricula_shared::types::SectionKey;
use curricula_shared::{
    CurriculaError, CurriculumItem, DocumentEntry, FactValue, ImportConfig, ItemKind,
    ProgramRecord, Result,
};
use curricula_storage::{
    CourseRow, DetailColumns, ImportTx, ModuleRow, ProgramRow, Storage, Table,
};

use crate::identity::{course_id, module_id, program_id};

const UNKNOWN_PROGRAM: &str = "Unknown";
const UNKNOWN_MODULE: &str = "Unknown Module";
const UNKNOWN_COURSE: &str = "Unknown Course";

/// Running counts of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub programs: usize,
    pub modules: usize,
    pub courses: usize,
    pub links: usize,
    /// Programs skipped because their curriculum was empty.
    pub empty_programs: usize,
    /// Failure entries left by the harvester.
    pub failed_entries: usize,
    /// Courses whose module could not be resolved.
    pub orphaned_courses: usize,
    /// Courses that already existed and were left untouched.
    pub existing_courses: usize,
}

/// What an import run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The store already held programs; nothing was written.
    Skipped,
    Imported(ImportStats),
}

/// Wait for the schema, skip a populated store, otherwise import `entries`.
#[instrument(skip_all, fields(entries = entries.len()))]
pub async fn run_import(
    storage: &Storage,
    entries: &[DocumentEntry],
    config: &ImportConfig,
) -> Result<ImportOutcome> {
    storage
        .wait_for_table(
            Table::StudyPrograms.as_str(),
            Duration::from_secs(config.schema_timeout_secs),
            Duration::from_millis(config.schema_poll_ms),
        )
        .await?;

    if storage.has_programs().await? {
        info!("database already populated, skipping import");
        return Ok(ImportOutcome::Skipped);
    }

    import_entries(storage, entries)
        .await
        .map(ImportOutcome::Imported)
}

/// Import `entries` in a single transaction. No populated-store check.
pub async fn import_entries(storage: &Storage, entries: &[DocumentEntry]) -> Result<ImportStats> {
    let tx = storage.begin_import().await?;

    match write_entries(&tx, entries).await {
        Ok(stats) => {
            tx.commit().await?;
            info!(
                programs = stats.programs,
                modules = stats.modules,
                courses = stats.courses,
                links = stats.links,
                "import finished"
            );
            Ok(stats)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(match e {
                CurriculaError::ImportTransaction(_) => e,
                other => CurriculaError::ImportTransaction(other.to_string()),
            })
        }
    }
}

async fn write_entries(tx: &ImportTx, entries: &[DocumentEntry]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for entry in entries {
        let program = match entry {
            DocumentEntry::Failed(failure) => {
                debug!(url = %failure.program_url, "skipping failure entry");
                stats.failed_entries += 1;
                continue;
            }
            DocumentEntry::Program(program) => program,
        };

        if program.curriculum.is_empty() {
            debug!(url = %program.program_url, "skipping program without curriculum");
            stats.empty_programs += 1;
            continue;
        }

        import_program(tx, program, &mut stats).await?;

        info!(
            program = program.program_title.as_deref().unwrap_or(UNKNOWN_PROGRAM),
            modules = stats.modules,
            courses = stats.courses,
            links = stats.links,
            "program imported"
        );
    }

    Ok(stats)
}

async fn import_program(
    tx: &ImportTx,
    program: &ProgramRecord,
    stats: &mut ImportStats,
) -> Result<()> {
    let header = program_row(program);
    let program_id = tx.upsert_program(&header).await?;
    stats.programs += 1;

    let mut modules = ModuleIndex::default();
    for item in program.curriculum.iter().filter(|i| i.kind == ItemKind::Module) {
        let title = item.title.as_deref().unwrap_or(UNKNOWN_MODULE);
        let row = ModuleRow {
            id: module_id(&program_id, title, item.semester),
            study_program_id: program_id.clone(),
            title: title.to_string(),
            semester: item.semester.map(i64::from),
            details: detail_columns(item)?,
        };
        let stored = tx.upsert_module(&row).await?;
        modules.insert(title, item.semester, stored);
        stats.modules += 1;
    }

    let language = course_language(program.language.as_ref());
    for item in program.curriculum.iter().filter(|i| i.kind == ItemKind::Course) {
        let title = item.title.as_deref().unwrap_or(UNKNOWN_COURSE);

        let Some(parent_id) = item
            .parent_module
            .as_deref()
            .and_then(|parent| modules.resolve(parent, item.semester))
        else {
            debug!(course = title, parent = ?item.parent_module, "dropping course without module");
            stats.orphaned_courses += 1;
            continue;
        };

        let ects = credit_value(item.ects);
        let row = CourseRow {
            id: course_id(parent_id, title, item.semester, ects),
            module_id: parent_id.to_string(),
            study_program_id: program_id.clone(),
            title: title.to_string(),
            ects,
            language: language.to_string(),
            sws: item.sws,
            semester: item.semester.map(i64::from),
            kind: item.kind.as_str().to_string(),
            source_url: header.source_url.clone(),
            details: detail_columns(item)?,
        };

        match tx.insert_course(&row).await? {
            Some(course_id) => {
                stats.courses += 1;
                if tx.link_course(&program_id, &course_id).await? {
                    stats.links += 1;
                }
            }
            None => stats.existing_courses += 1,
        }
    }

    Ok(())
}

fn program_row(program: &ProgramRecord) -> ProgramRow {
    let name = program
        .program_title
        .clone()
        .unwrap_or_else(|| UNKNOWN_PROGRAM.to_string());
    let source_url = if program.program_url.is_empty() {
        name.clone()
    } else {
        program.program_url.clone()
    };
    let mode = column_text(program.mode.as_ref());

    ProgramRow {
        id: program_id(&source_url, mode.as_deref()),
        name,
        degree: column_text(program.degree.as_ref()),
        semesters: program.semesters.as_ref().and_then(FactValue::as_count),
        mode,
        total_ects: program.total_ects.as_ref().and_then(FactValue::as_count),
        language: column_text(program.language.as_ref()),
        application_period: column_text(program.application_period.as_ref()),
        start_dates: column_text(program.start_dates.as_ref()),
        source_url,
    }
}

fn column_text(value: Option<&FactValue>) -> Option<String> {
    value.map(FactValue::to_column_text)
}

/// Detail sections as JSON text columns.
fn detail_columns(item: &CurriculumItem) -> Result<DetailColumns> {
    let json = |key: SectionKey| -> Result<Option<String>> {
        item.details
            .get(key)
            .map(serde_json::to_string)
            .transpose()
            .map_err(CurriculaError::from)
    };

    Ok(DetailColumns {
        details_html: item.details_html.clone(),
        content: json(SectionKey::Content)?,
        learning_outcomes: json(SectionKey::LearningOutcomes)?,
        teaching_method: json(SectionKey::TeachingMethod)?,
        exam_method: json(SectionKey::ExamMethod)?,
        literature: json(SectionKey::Literature)?,
        teaching_language: json(SectionKey::TeachingLanguage)?,
    })
}

/// Stored credit value: the integer part of the parsed ECTS, 0 when absent.
pub fn credit_value(ects: Option<f64>) -> i64 {
    ects.filter(|e| e.is_finite() && *e >= 0.0)
        .map(|e| e.trunc() as i64)
        .unwrap_or(0)
}

/// Course language from the program language: English if it mentions it, else German.
pub fn course_language(program_language: Option<&FactValue>) -> &'static str {
    let mentions_english = program_language
        .map(|l| l.to_column_text().to_lowercase().contains("engl"))
        .unwrap_or(false);
    if mentions_english { "en" } else { "de" }
}

/// Module ids of one program, keyed by (title, semester) in insertion order.
#[derive(Debug, Default)]
struct ModuleIndex {
    entries: Vec<(String, Option<u32>, String)>,
}

impl ModuleIndex {
    fn insert(&mut self, title: &str, semester: Option<u32>, id: String) {
        match self
            .entries
            .iter_mut()
            .find(|(t, s, _)| t == title && *s == semester)
        {
            Some(existing) => existing.2 = id,
            None => self.entries.push((title.to_string(), semester, id)),
        }
    }

    /// Exact (title, semester) match first. Otherwise the same title in the
    /// nearest preceding semester, then the nearest following one, then a
    /// module with no semester at all.
    fn resolve(&self, title: &str, semester: Option<u32>) -> Option<&str> {
        let same_title = || self.entries.iter().filter(move |(t, _, _)| t == title);

        if let Some((_, _, id)) = same_title().find(|(_, s, _)| *s == semester) {
            return Some(id);
        }

        let Some(wanted) = semester else {
            return same_title().next().map(|(_, _, id)| id.as_str());
        };

        let preceding = same_title()
            .filter_map(|(_, s, id)| s.filter(|s| *s < wanted).map(|s| (s, id)))
            .max_by_key(|(s, _)| *s);
        let following = same_title()
            .filter_map(|(_, s, id)| s.filter(|s| *s > wanted).map(|s| (s, id)))
            .min_by_key(|(s, _)| *s);
        let unnumbered = same_title()
            .find(|(_, s, _)| s.is_none())
            .map(|(_, _, id)| id);

        preceding
            .or(following)
            .map(|(_, id)| id)
            .or(unnumbered)
            .map(String::as_str)
    }
}
