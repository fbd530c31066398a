//! SQL migration definitions for the curriculum store.
//!
//! Migrations are applied in order on connect, unless the schema is managed
//! by another process (see `DatabaseConfig::apply_migrations`).

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: study_programs, modules, courses, study_program_courses",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS study_programs (
    id                 TEXT PRIMARY KEY,
    name               TEXT NOT NULL,
    description        TEXT,
    degree             TEXT,
    semesters          INTEGER,
    mode               TEXT,
    total_ects         INTEGER,
    language           TEXT,
    application_period TEXT,
    start_dates        TEXT,
    source_url         TEXT,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    UNIQUE(name, mode)
);

CREATE TABLE IF NOT EXISTS modules (
    id                TEXT PRIMARY KEY,
    study_program_id  TEXT NOT NULL REFERENCES study_programs(id) ON DELETE CASCADE,
    title             TEXT NOT NULL,
    semester          INTEGER,
    details_html      TEXT,
    content           TEXT,
    learning_outcomes TEXT,
    teaching_method   TEXT,
    exam_method       TEXT,
    literature        TEXT,
    teaching_language TEXT,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE(study_program_id, title)
);

CREATE INDEX IF NOT EXISTS idx_modules_program ON modules(study_program_id);

CREATE TABLE IF NOT EXISTS courses (
    id                TEXT PRIMARY KEY,
    module_id         TEXT NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
    title             TEXT NOT NULL,
    description       TEXT,
    ects              INTEGER NOT NULL DEFAULT 0,
    language          TEXT NOT NULL,
    sws               REAL,
    semester          INTEGER,
    kind              TEXT NOT NULL,
    details_html      TEXT,
    content           TEXT,
    learning_outcomes TEXT,
    teaching_method   TEXT,
    exam_method       TEXT,
    literature        TEXT,
    teaching_language TEXT,
    source_url        TEXT,
    study_program_id  TEXT REFERENCES study_programs(id) ON DELETE CASCADE,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    CONSTRAINT uq_courses_module_title UNIQUE(module_id, title)
);

CREATE INDEX IF NOT EXISTS idx_courses_module ON courses(module_id);

CREATE TABLE IF NOT EXISTS study_program_courses (
    study_program_id TEXT NOT NULL REFERENCES study_programs(id) ON DELETE CASCADE,
    course_id        TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    created_at       TEXT NOT NULL,
    PRIMARY KEY (study_program_id, course_id)
);

INSERT OR IGNORE INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
