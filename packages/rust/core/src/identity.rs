//! Deterministic identifiers derived from natural keys.
//!
//! Every id is a UUID v5 in the URL namespace over the `:`-joined key parts.
//! An absent part renders as the empty string, so `(url, None)` and
//! `(url, Some(""))` share an id.

use uuid::Uuid;

/// Id of a program, keyed by source URL and mode.
pub fn program_id(source_url: &str, mode: Option<&str>) -> String {
    derive(&[source_url, mode.unwrap_or("")])
}

/// Id of a module, keyed by the stored program id, title and semester.
pub fn module_id(program_id: &str, title: &str, semester: Option<u32>) -> String {
    let semester = semester.map(|s| s.to_string()).unwrap_or_default();
    derive(&[program_id, title, &semester])
}

/// Id of a course, keyed by the stored module id, title, semester and credit value.
pub fn course_id(module_id: &str, title: &str, semester: Option<u32>, ects: i64) -> String {
    let semester = semester.map(|s| s.to_string()).unwrap_or_default();
    derive(&[module_id, title, &semester, &ects.to_string()])
}

fn derive(parts: &[&str]) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, parts.join(":").as_bytes()).to_string()
}
