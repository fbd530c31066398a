//! End-to-end workflows: `scrape` (listing → programs → document) and
//! `import` (document → store).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use curricula_scraper::{Harvester, PageSource};
use curricula_shared::{AppConfig, DocumentEntry, Result};
use curricula_storage::Storage;

use crate::document::{load_document, save_document};
use crate::importer::{ImportOutcome, run_import};

/// Result of a scrape run.
#[derive(Debug)]
pub struct ScrapeSummary {
    /// Programs harvested successfully.
    pub programs: usize,
    /// Programs recorded as failure entries.
    pub failed: usize,
    /// Where the document was written.
    pub output: PathBuf,
    pub elapsed: Duration,
}

/// Result of an import run.
#[derive(Debug)]
pub struct ImportReport {
    pub outcome: ImportOutcome,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each program page, successful or not.
    fn program_harvested(&self, url: &str, current: usize, total: usize, failed: bool);
    fn scrape_done(&self, summary: &ScrapeSummary);
    fn import_done(&self, report: &ImportReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn program_harvested(&self, _url: &str, _current: usize, _total: usize, _failed: bool) {}
    fn scrape_done(&self, _summary: &ScrapeSummary) {}
    fn import_done(&self, _report: &ImportReport) {}
}

/// Harvest every program linked from the listing and write the document to `output`.
///
/// Individual program failures end up in the document; only an unreachable
/// listing or an unwritable output fails the run.
#[instrument(skip_all, fields(listing = %config.source.listing_url(), output = %output.display()))]
pub async fn scrape_programs<S: PageSource>(
    source: S,
    config: &AppConfig,
    output: &Path,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeSummary> {
    let start = Instant::now();
    let harvester = Harvester::new(source, config.source.clone());

    progress.phase("Discovering programs");
    let urls = harvester.discover().await?;

    progress.phase("Harvesting programs");
    let entries = harvester
        .harvest_all(&urls, |current, total, entry| {
            let failed = matches!(entry, DocumentEntry::Failed(_));
            progress.program_harvested(entry.program_url(), current, total, failed);
        })
        .await?;

    progress.phase("Writing document");
    save_document(output, &entries)?;

    let failed = entries
        .iter()
        .filter(|e| matches!(e, DocumentEntry::Failed(_)))
        .count();
    let summary = ScrapeSummary {
        programs: entries.len() - failed,
        failed,
        output: output.to_path_buf(),
        elapsed: start.elapsed(),
    };

    info!(
        programs = summary.programs,
        failed = summary.failed,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "scrape completed"
    );
    progress.scrape_done(&summary);
    Ok(summary)
}

/// Load the document at `input` and import it into the configured store.
///
/// `token` is the remote credential, resolved by the caller before any I/O.
#[instrument(skip_all, fields(input = %input.display(), database = %config.database.url))]
pub async fn import_document(
    config: &AppConfig,
    input: &Path,
    token: Option<String>,
    progress: &dyn ProgressReporter,
) -> Result<ImportReport> {
    let start = Instant::now();

    if config.import.startup_delay_secs > 0 {
        progress.phase("Waiting for database startup");
        info!(secs = config.import.startup_delay_secs, "startup delay");
        tokio::time::sleep(Duration::from_secs(config.import.startup_delay_secs)).await;
    }

    progress.phase("Loading document");
    let entries = load_document(input)?;

    progress.phase("Connecting to database");
    let storage = Storage::connect(&config.database, token).await?;

    progress.phase("Importing");
    let outcome = run_import(&storage, &entries, &config.import).await?;

    let report = ImportReport {
        outcome,
        elapsed: start.elapsed(),
    };
    progress.import_done(&report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use curricula_shared::{CurriculaError, DatabaseConfig, ImportConfig, SourceConfig};
    use curricula_storage::Table;
    use uuid::Uuid;

    const BASE: &str = "https://example.test";
    const LISTING_PATH: &str = "/studium-weiterbildung/studienangebot";

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    /// In-memory site keyed by absolute URL.
    struct FakeSite {
        pages: HashMap<String, String>,
    }

    impl PageSource for FakeSite {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| CurriculaError::Network(format!("{url}: HTTP 404 Not Found")))
        }
    }

    fn site() -> FakeSite {
        let listing = format!(
            r#"<section class="courses">
                <a href="{LISTING_PATH}/informatik">Informatik</a>
                <a href="{LISTING_PATH}/gone">Gone</a>
            </section>"#
        );
        let mut pages = HashMap::new();
        pages.insert(format!("{BASE}{LISTING_PATH}"), listing);
        pages.insert(
            format!("{BASE}{LISTING_PATH}/informatik"),
            load_fixture("program.html"),
        );
        FakeSite { pages }
    }

    fn test_config() -> (AppConfig, PathBuf) {
        let dir = std::env::temp_dir().join(format!("curricula_pipeline_{}", Uuid::now_v7()));
        let config = AppConfig {
            source: SourceConfig {
                base_url: BASE.into(),
                listing_path: LISTING_PATH.into(),
                settle_ms: 0,
                ..Default::default()
            },
            database: DatabaseConfig {
                url: dir.join("curricula.db").to_string_lossy().into_owned(),
                ..Default::default()
            },
            import: ImportConfig {
                startup_delay_secs: 0,
                schema_timeout_secs: 1,
                schema_poll_ms: 50,
            },
            ..Default::default()
        };
        (config, dir)
    }

    async fn counts(storage: &Storage) -> [u64; 4] {
        [
            storage.count_rows(Table::StudyPrograms).await.expect("count"),
            storage.count_rows(Table::Modules).await.expect("count"),
            storage.count_rows(Table::Courses).await.expect("count"),
            storage.count_rows(Table::StudyProgramCourses).await.expect("count"),
        ]
    }

    #[tokio::test]
    async fn scrape_then_import_twice() {
        let (config, dir) = test_config();
        let document = dir.join("programs.json");

        let summary = scrape_programs(site(), &config, &document, &SilentProgress)
            .await
            .expect("scrape");
        assert_eq!(summary.programs, 1);
        assert_eq!(summary.failed, 1);
        assert!(document.exists());

        let report = import_document(&config, &document, None, &SilentProgress)
            .await
            .expect("first import");
        let ImportOutcome::Imported(stats) = &report.outcome else {
            panic!("expected import, got {:?}", report.outcome);
        };
        assert_eq!(stats.programs, 1);
        assert_eq!(stats.modules, 2);
        assert_eq!(stats.courses, 3);
        assert_eq!(stats.links, 3);
        assert_eq!(stats.failed_entries, 1);

        let storage = Storage::connect(&config.database, None).await.expect("connect");
        let before = counts(&storage).await;
        assert_eq!(before, [1, 2, 3, 3]);

        let report = import_document(&config, &document, None, &SilentProgress)
            .await
            .expect("second import");
        assert_eq!(report.outcome, ImportOutcome::Skipped);
        assert_eq!(counts(&storage).await, before);
    }

    #[tokio::test]
    async fn imports_are_deterministic_across_stores() {
        let (config, dir) = test_config();
        let document = dir.join("programs.json");
        scrape_programs(site(), &config, &document, &SilentProgress)
            .await
            .expect("scrape");

        let mut course_sets = Vec::new();
        for name in ["a.db", "b.db"] {
            let mut config = config.clone();
            config.database.url = dir.join(name).to_string_lossy().into_owned();
            import_document(&config, &document, None, &SilentProgress)
                .await
                .expect("import");

            let storage = Storage::connect(&config.database, None).await.expect("connect");
            let mut ids: Vec<_> = storage
                .list_courses()
                .await
                .expect("courses")
                .into_iter()
                .map(|c| (c.id, c.module_id, c.title))
                .collect();
            ids.sort();
            course_sets.push(ids);
        }
        assert_eq!(course_sets[0], course_sets[1]);
    }

    #[tokio::test]
    async fn unreachable_listing_fails_scrape() {
        let (config, dir) = test_config();
        let empty = FakeSite {
            pages: HashMap::new(),
        };
        let err = scrape_programs(empty, &config, &dir.join("programs.json"), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, CurriculaError::Network(_)));
    }

    #[tokio::test]
    async fn missing_document_fails_import() {
        let (config, dir) = test_config();
        let err = import_document(&config, &dir.join("absent.json"), None, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, CurriculaError::InputMissing { .. }));
    }
}
