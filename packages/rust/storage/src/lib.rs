//! libSQL storage layer for the program → module → course graph.
//!
//! The [`Storage`] struct wraps a local or remote libSQL database. Reads and
//! schema checks go through it directly; the import writes go through an
//! [`ImportTx`], which wraps a single transaction.
//!
//! **Write rules:**
//! - Programs and modules are upserted on their natural key and only get their
//!   `updated_at` touched on conflict.
//! - Courses are first-write-wins. A conflicting insert returns no id.
//! - Nothing is ever deleted.

mod migrations;

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use curricula_shared::{CurriculaError, DatabaseConfig, Result};
use libsql::{Connection, Database, Transaction, params};

/// Tables of the curriculum graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    StudyPrograms,
    Modules,
    Courses,
    StudyProgramCourses,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StudyPrograms => "study_programs",
            Self::Modules => "modules",
            Self::Courses => "courses",
            Self::StudyProgramCourses => "study_program_courses",
        }
    }
}

/// Long-form description columns shared by modules and courses.
/// Section values are JSON text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailColumns {
    pub details_html: Option<String>,
    pub content: Option<String>,
    pub learning_outcomes: Option<String>,
    pub teaching_method: Option<String>,
    pub exam_method: Option<String>,
    pub literature: Option<String>,
    pub teaching_language: Option<String>,
}

/// A `study_programs` row as written by the importer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramRow {
    pub id: String,
    pub name: String,
    pub degree: Option<String>,
    pub semesters: Option<i64>,
    pub mode: Option<String>,
    pub total_ects: Option<i64>,
    pub language: Option<String>,
    pub application_period: Option<String>,
    pub start_dates: Option<String>,
    pub source_url: String,
}

/// A `modules` row.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRow {
    pub id: String,
    pub study_program_id: String,
    pub title: String,
    pub semester: Option<i64>,
    pub details: DetailColumns,
}

/// A `courses` row.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseRow {
    pub id: String,
    pub module_id: String,
    pub study_program_id: String,
    pub title: String,
    pub ects: i64,
    pub language: String,
    pub sws: Option<f64>,
    pub semester: Option<i64>,
    pub kind: String,
    pub source_url: String,
    pub details: DetailColumns,
}

/// A stored course, as read back for summaries and checks.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCourse {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub ects: i64,
    pub language: String,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a local database at `path` and apply migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        let storage = Self::open_local(path).await?;
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Connect to the configured database, local or remote.
    ///
    /// `token` is the already-resolved credential for a remote store.
    /// Migrations run only when `config.apply_migrations` is set.
    pub async fn connect(config: &DatabaseConfig, token: Option<String>) -> Result<Self> {
        let storage = if config.is_remote() {
            let token = token.ok_or_else(|| {
                CurriculaError::config(format!(
                    "no auth token for remote database {}",
                    config.url
                ))
            })?;
            let db = libsql::Builder::new_remote(config.url.clone(), token)
                .build()
                .await
                .map_err(|e| CurriculaError::Storage(e.to_string()))?;
            let conn = db
                .connect()
                .map_err(|e| CurriculaError::Storage(e.to_string()))?;
            Self { db, conn }
        } else {
            Self::open_local(Path::new(&config.url)).await?
        };

        tracing::debug!(
            url = %config.url,
            remote = config.is_remote(),
            "connected to database"
        );

        if config.apply_migrations {
            storage.run_migrations().await?;
        }
        Ok(storage)
    }

    async fn open_local(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CurriculaError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CurriculaError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CurriculaError::Storage(e.to_string()))?;

        Ok(Self { db, conn })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CurriculaError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Schema readiness
    // -----------------------------------------------------------------------

    /// Whether `table` exists in the database.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
            )
            .await
            .map_err(|e| CurriculaError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(row) => Ok(row.is_some()),
            Err(e) => Err(CurriculaError::Storage(e.to_string())),
        }
    }

    /// Poll until `table` exists, checking every `poll`, for at most `timeout`.
    pub async fn wait_for_table(
        &self,
        table: &str,
        timeout: Duration,
        poll: Duration,
    ) -> Result<()> {
        let started = Instant::now();
        tracing::info!(table, timeout_secs = timeout.as_secs(), "waiting for schema");

        loop {
            if self.table_exists(table).await? {
                tracing::info!(
                    table,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "schema is ready"
                );
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(CurriculaError::SchemaNotReady {
                    table: table.to_string(),
                    waited_secs: timeout.as_secs(),
                });
            }
            tracing::debug!(table, "table not there yet");
            tokio::time::sleep(poll).await;
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Number of rows in `table`.
    pub async fn count_rows(&self, table: Table) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.as_str());
        let mut rows = self
            .conn
            .query(&sql, params![])
            .await
            .map_err(|e| CurriculaError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map(|n| n.max(0) as u64)
                .map_err(|e| CurriculaError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(CurriculaError::Storage(e.to_string())),
        }
    }

    /// Whether any program has been imported yet.
    pub async fn has_programs(&self) -> Result<bool> {
        Ok(self.count_rows(Table::StudyPrograms).await? > 0)
    }

    /// All stored courses, ordered by title.
    pub async fn list_courses(&self) -> Result<Vec<StoredCourse>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, module_id, title, ects, language FROM courses ORDER BY title",
                params![],
            )
            .await
            .map_err(|e| CurriculaError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(StoredCourse {
                id: row
                    .get::<String>(0)
                    .map_err(|e| CurriculaError::Storage(e.to_string()))?,
                module_id: row
                    .get::<String>(1)
                    .map_err(|e| CurriculaError::Storage(e.to_string()))?,
                title: row
                    .get::<String>(2)
                    .map_err(|e| CurriculaError::Storage(e.to_string()))?,
                ects: row
                    .get::<i64>(3)
                    .map_err(|e| CurriculaError::Storage(e.to_string()))?,
                language: row
                    .get::<String>(4)
                    .map_err(|e| CurriculaError::Storage(e.to_string()))?,
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Import transaction
    // -----------------------------------------------------------------------

    /// Open the single write transaction of an import run.
    pub async fn begin_import(&self) -> Result<ImportTx> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| CurriculaError::Storage(e.to_string()))?;
        Ok(ImportTx { tx })
    }
}

/// The write side of an import. Every error maps to
/// [`CurriculaError::ImportTransaction`]; the caller decides to roll back.
pub struct ImportTx {
    tx: Transaction,
}

impl ImportTx {
    /// Insert a program or touch the existing row with the same (name, mode).
    /// Returns the stored id.
    pub async fn upsert_program(&self, row: &ProgramRow) -> Result<String> {
        let now = Utc::now().to_rfc3339();
        // SQLite treats NULL modes as distinct, so the id clause catches a
        // repeated program without a mode.
        let rows = self
            .tx
            .query(
                "INSERT INTO study_programs
                    (id, name, description, degree, semesters, mode, total_ects, language,
                     application_period, start_dates, source_url, created_at, updated_at)
                 VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                 ON CONFLICT(name, mode) DO UPDATE SET updated_at = excluded.updated_at
                 ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at
                 RETURNING id",
                params![
                    row.id.as_str(),
                    row.name.as_str(),
                    row.degree.as_deref(),
                    row.semesters,
                    row.mode.as_deref(),
                    row.total_ects,
                    row.language.as_deref(),
                    row.application_period.as_deref(),
                    row.start_dates.as_deref(),
                    row.source_url.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(tx_error)?;

        returned_id(rows)
            .await?
            .ok_or_else(|| CurriculaError::ImportTransaction("program upsert returned no id".into()))
    }

    /// Insert a module or touch the existing row with the same (program, title).
    /// Returns the stored id.
    pub async fn upsert_module(&self, row: &ModuleRow) -> Result<String> {
        let now = Utc::now().to_rfc3339();
        let d = &row.details;
        let rows = self
            .tx
            .query(
                "INSERT INTO modules
                    (id, study_program_id, title, semester, details_html, content,
                     learning_outcomes, teaching_method, exam_method, literature,
                     teaching_language, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                 ON CONFLICT(study_program_id, title) DO UPDATE SET updated_at = excluded.updated_at
                 ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at
                 RETURNING id",
                params![
                    row.id.as_str(),
                    row.study_program_id.as_str(),
                    row.title.as_str(),
                    row.semester,
                    d.details_html.as_deref(),
                    d.content.as_deref(),
                    d.learning_outcomes.as_deref(),
                    d.teaching_method.as_deref(),
                    d.exam_method.as_deref(),
                    d.literature.as_deref(),
                    d.teaching_language.as_deref(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(tx_error)?;

        returned_id(rows)
            .await?
            .ok_or_else(|| CurriculaError::ImportTransaction("module upsert returned no id".into()))
    }

    /// Insert a course unless one already exists. Returns the id of the new
    /// row, or `None` when the existing row was kept.
    pub async fn insert_course(&self, row: &CourseRow) -> Result<Option<String>> {
        let now = Utc::now().to_rfc3339();
        let d = &row.details;
        let rows = self
            .tx
            .query(
                "INSERT INTO courses
                    (id, module_id, title, description, ects, language, sws, semester, kind,
                     details_html, content, learning_outcomes, teaching_method, exam_method,
                     literature, teaching_language, source_url, study_program_id,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                         ?14, ?15, ?16, ?17, ?18, ?18)
                 ON CONFLICT DO NOTHING
                 RETURNING id",
                params![
                    row.id.as_str(),
                    row.module_id.as_str(),
                    row.title.as_str(),
                    row.ects,
                    row.language.as_str(),
                    row.sws,
                    row.semester,
                    row.kind.as_str(),
                    d.details_html.as_deref(),
                    d.content.as_deref(),
                    d.learning_outcomes.as_deref(),
                    d.teaching_method.as_deref(),
                    d.exam_method.as_deref(),
                    d.literature.as_deref(),
                    d.teaching_language.as_deref(),
                    row.source_url.as_str(),
                    row.study_program_id.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(tx_error)?;

        returned_id(rows).await
    }

    /// Link a course to a program. Returns `false` when the link already existed.
    pub async fn link_course(&self, study_program_id: &str, course_id: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let affected = self
            .tx
            .execute(
                "INSERT INTO study_program_courses (study_program_id, course_id, created_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT DO NOTHING",
                params![study_program_id, course_id, now.as_str()],
            )
            .await
            .map_err(tx_error)?;
        Ok(affected > 0)
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(tx_error)
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await.map_err(tx_error)
    }
}

fn tx_error(e: libsql::Error) -> CurriculaError {
    CurriculaError::ImportTransaction(e.to_string())
}

/// First column of the first row of a `RETURNING id` statement.
async fn returned_id(mut rows: libsql::Rows) -> Result<Option<String>> {
    match rows.next().await {
        Ok(Some(row)) => row.get::<String>(0).map(Some).map_err(tx_error),
        Ok(None) => Ok(None),
        Err(e) => Err(tx_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("curricula_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn program(id: &str, name: &str, mode: Option<&str>) -> ProgramRow {
        ProgramRow {
            id: id.into(),
            name: name.into(),
            degree: Some("BSc".into()),
            semesters: Some(6),
            mode: mode.map(String::from),
            total_ects: Some(180),
            language: Some("Deutsch".into()),
            application_period: None,
            start_dates: Some("September; Februar".into()),
            source_url: format!("https://example.com/{id}"),
        }
    }

    async fn module_rows(storage: &Storage, program_id: &str) -> Vec<(String, String)> {
        let mut rows = storage
            .conn
            .query(
                "SELECT id, title FROM modules WHERE study_program_id = ?1 ORDER BY title",
                params![program_id],
            )
            .await
            .expect("query modules");
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.expect("row") {
            out.push((
                row.get::<String>(0).expect("id"),
                row.get::<String>(1).expect("title"),
            ));
        }
        out
    }

    fn course(id: &str, module_id: &str, program_id: &str, title: &str) -> CourseRow {
        CourseRow {
            id: id.into(),
            module_id: module_id.into(),
            study_program_id: program_id.into(),
            title: title.into(),
            ects: 5,
            language: "de".into(),
            sws: Some(2.0),
            semester: Some(1),
            kind: "course".into(),
            source_url: "https://example.com/p1".into(),
            details: DetailColumns::default(),
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
        for table in ["study_programs", "modules", "courses", "study_program_courses"] {
            assert!(storage.table_exists(table).await.expect("check"), "{table}");
        }
        assert!(!storage.has_programs().await.expect("count"));
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("curricula_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn unmigrated_store_times_out() {
        let tmp = std::env::temp_dir().join(format!("curricula_test_{}.db", Uuid::now_v7()));
        let config = DatabaseConfig {
            url: tmp.to_string_lossy().into_owned(),
            apply_migrations: false,
            ..Default::default()
        };
        let storage = Storage::connect(&config, None).await.expect("connect");

        let err = storage
            .wait_for_table("study_programs", Duration::ZERO, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, CurriculaError::SchemaNotReady { .. }));
    }

    #[tokio::test]
    async fn migrated_store_is_ready_immediately() {
        let storage = test_storage().await;
        storage
            .wait_for_table("study_programs", Duration::ZERO, Duration::from_millis(10))
            .await
            .expect("ready");
    }

    #[tokio::test]
    async fn program_upsert_returns_existing_id() {
        let storage = test_storage().await;
        let tx = storage.begin_import().await.expect("begin");

        let first = tx
            .upsert_program(&program("p1", "Informatik", Some("Vollzeit")))
            .await
            .expect("insert");
        // Same natural key, different derived id: the stored id wins.
        let second = tx
            .upsert_program(&program("p2", "Informatik", Some("Vollzeit")))
            .await
            .expect("upsert");
        assert_eq!(first, "p1");
        assert_eq!(second, "p1");

        // Same id without a mode does not fail either.
        tx.upsert_program(&program("p3", "Pflege", None)).await.expect("insert");
        tx.upsert_program(&program("p3", "Pflege", None)).await.expect("repeat");

        tx.commit().await.expect("commit");
        assert_eq!(storage.count_rows(Table::StudyPrograms).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn courses_are_first_write_wins() {
        let storage = test_storage().await;
        let tx = storage.begin_import().await.expect("begin");

        let program_id = tx
            .upsert_program(&program("p1", "Informatik", Some("Vollzeit")))
            .await
            .expect("program");
        let module_id = tx
            .upsert_module(&ModuleRow {
                id: "m1".into(),
                study_program_id: program_id.clone(),
                title: "Basics".into(),
                semester: Some(1),
                details: DetailColumns::default(),
            })
            .await
            .expect("module");

        let inserted = tx
            .insert_course(&course("c1", &module_id, &program_id, "Intro"))
            .await
            .expect("course");
        assert_eq!(inserted.as_deref(), Some("c1"));

        let mut changed = course("c2", &module_id, &program_id, "Intro");
        changed.ects = 10;
        let skipped = tx.insert_course(&changed).await.expect("conflict");
        assert_eq!(skipped, None);

        assert!(tx.link_course(&program_id, "c1").await.expect("link"));
        assert!(!tx.link_course(&program_id, "c1").await.expect("duplicate link"));
        tx.commit().await.expect("commit");

        let courses = storage.list_courses().await.expect("list");
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].id, "c1");
        assert_eq!(courses[0].ects, 5);
        assert_eq!(
            storage.count_rows(Table::StudyProgramCourses).await.expect("count"),
            1
        );
        assert_eq!(
            module_rows(&storage, &program_id).await,
            vec![("m1".to_string(), "Basics".to_string())]
        );
    }

    #[tokio::test]
    async fn rollback_discards_everything() {
        let storage = test_storage().await;
        let tx = storage.begin_import().await.expect("begin");
        tx.upsert_program(&program("p1", "Informatik", Some("Vollzeit")))
            .await
            .expect("program");
        tx.rollback().await.expect("rollback");

        assert!(!storage.has_programs().await.expect("count"));
    }

    #[tokio::test]
    async fn remote_without_token_is_config_error() {
        let config = DatabaseConfig {
            url: "libsql://campus.example.turso.io".into(),
            ..Default::default()
        };
        let result = Storage::connect(&config, None).await;
        assert!(matches!(result, Err(CurriculaError::Config { .. })));
    }
}
