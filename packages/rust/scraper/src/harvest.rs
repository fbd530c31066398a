//! Sequential harvest: listing → program URLs → one document entry per program.

use tracing::{info, instrument, warn};

use curricula_extract::extract_program;
use curricula_shared::{CurriculaError, DocumentEntry, Result, ScrapeFailure, SourceConfig};

use crate::listing::discover_program_urls;
use crate::source::PageSource;

/// Drives a [`PageSource`] over the listing and every program page, one at a time.
pub struct Harvester<S> {
    source: S,
    config: SourceConfig,
}

impl<S: PageSource> Harvester<S> {
    pub fn new(source: S, config: SourceConfig) -> Self {
        Self { source, config }
    }

    /// Fetch the listing page and return the program URLs it links to.
    ///
    /// A listing that cannot be fetched fails the whole run.
    #[instrument(skip_all, fields(listing = %self.config.listing_url()))]
    pub async fn discover(&self) -> Result<Vec<String>> {
        let listing_url = self.config.listing_url();
        let html = self.source.fetch(&listing_url).await?;
        let urls = discover_program_urls(&html, &self.config);
        info!(programs = urls.len(), "program URLs discovered");
        Ok(urls)
    }

    /// Fetch and extract one program. Per-program failures become a failure
    /// entry; anything else is returned as an error.
    pub async fn harvest_program(&self, url: &str) -> Result<DocumentEntry> {
        match self.source.fetch(url).await {
            Ok(html) => Ok(DocumentEntry::Program(extract_program(url, &html))),
            Err(e) if e.is_recoverable() => {
                let failure = per_program_failure(url, e);
                warn!(url, error = %failure, "program harvest failed");
                Ok(DocumentEntry::Failed(ScrapeFailure {
                    program_url: url.to_string(),
                    error: failure.to_string(),
                }))
            }
            Err(e) => Err(e),
        }
    }

    /// Harvest every URL in order. `on_entry` sees each entry as it lands,
    /// with its 1-based position and the total.
    #[instrument(skip_all, fields(programs = urls.len()))]
    pub async fn harvest_all<F>(
        &self,
        urls: &[String],
        mut on_entry: F,
    ) -> Result<Vec<DocumentEntry>>
    where
        F: FnMut(usize, usize, &DocumentEntry),
    {
        let total = urls.len();
        let mut entries = Vec::with_capacity(total);

        for (i, url) in urls.iter().enumerate() {
            let entry = self.harvest_program(url).await?;
            on_entry(i + 1, total, &entry);
            entries.push(entry);
        }

        let failed = entries
            .iter()
            .filter(|e| matches!(e, DocumentEntry::Failed(_)))
            .count();
        info!(harvested = total - failed, failed, "harvest completed");
        Ok(entries)
    }
}

/// Scope a recoverable error to the program it happened on.
fn per_program_failure(url: &str, err: CurriculaError) -> CurriculaError {
    match err {
        CurriculaError::Extraction { .. } => err,
        other => CurriculaError::extraction(url, other.to_string()),
    }
}
