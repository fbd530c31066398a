//! Reading and writing the intermediate JSON document.

use std::path::Path;

use tracing::{debug, info};

use curricula_shared::{CurriculaError, DocumentEntry, Result};

/// Load the document at `path`.
///
/// An absent or zero-length file is [`CurriculaError::InputMissing`]; malformed
/// JSON is a serialization error.
pub fn load_document(path: &Path) -> Result<Vec<DocumentEntry>> {
    let is_present = std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if !is_present {
        return Err(CurriculaError::InputMissing {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| CurriculaError::io(path, e))?;
    let entries: Vec<DocumentEntry> = serde_json::from_str(&content)?;

    info!(path = %path.display(), entries = entries.len(), "document loaded");
    Ok(entries)
}

/// Write `entries` to `path` as pretty-printed JSON, creating parent directories.
pub fn save_document(path: &Path, entries: &[DocumentEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CurriculaError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json).map_err(|e| CurriculaError::io(path, e))?;

    debug!(path = %path.display(), entries = entries.len(), "document written");
    Ok(())
}
