//! Program URL discovery from the listing page.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use curricula_shared::SourceConfig;

static COURSE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section.courses a[href]").expect("valid selector"));

/// Program page URLs linked from the listing, deduplicated in first-seen order.
///
/// Only links under the listing path count. Relative links are resolved
/// against the base URL; absolute links must already sit under the listing URL.
pub fn discover_program_urls(listing_html: &str, config: &SourceConfig) -> Vec<String> {
    let doc = Html::parse_document(listing_html);
    let path_prefix = format!("{}/", config.listing_path.trim_end_matches('/'));
    let url_prefix = format!("{}/", config.listing_url().trim_end_matches('/'));
    let base = Url::parse(&config.base_url).ok();

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for anchor in doc.select(&COURSE_LINK_SEL) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };

        let resolved = if href.starts_with(&path_prefix) {
            base.as_ref()
                .and_then(|b| b.join(href).ok())
                .map(String::from)
        } else if href.starts_with(&url_prefix) {
            Some(href.to_string())
        } else {
            None
        };

        match resolved {
            Some(url) if seen.insert(url.clone()) => urls.push(url),
            Some(url) => debug!(%url, "duplicate program link"),
            None => {}
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn listing_fixture_yields_unique_program_urls() {
        let urls = discover_program_urls(&load_fixture("listing.html"), &SourceConfig::default());
        assert_eq!(
            urls,
            vec![
                "https://www.hcw.ac.at/studium-weiterbildung/studienangebot/informatik",
                "https://www.hcw.ac.at/studium-weiterbildung/studienangebot/pflege",
                "https://www.hcw.ac.at/studium-weiterbildung/studienangebot/data-science",
            ]
        );
    }

    #[test]
    fn links_outside_course_section_are_ignored() {
        let html = r#"<a href="/studium-weiterbildung/studienangebot/x">X</a>
            <section class="courses"></section>"#;
        assert!(discover_program_urls(html, &SourceConfig::default()).is_empty());
    }

    #[test]
    fn base_url_with_port_resolves_relative_links() {
        let config = SourceConfig {
            base_url: "http://127.0.0.1:8080".into(),
            ..Default::default()
        };
        let html = r#"<section class="courses">
            <a href="/studium-weiterbildung/studienangebot/informatik">I</a>
        </section>"#;
        assert_eq!(
            discover_program_urls(html, &config),
            vec!["http://127.0.0.1:8080/studium-weiterbildung/studienangebot/informatik"]
        );
    }
}
