//! Program page → [`ProgramRecord`].

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use curricula_shared::types::RESERVED_RECORD_KEYS;
use curricula_shared::{FactInput, ProgramRecord};

use crate::curriculum::extract_curriculum;
use crate::facts::normalize_facts;
use crate::text::{clean_text, element_text};

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.headline h2").expect("valid selector"));
static FACTS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section.coursedetail").expect("valid selector"));
static DL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl").expect("valid selector"));
static LI_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid selector"));

/// Build the full record for one program page.
///
/// Never fails: anything missing from the page shows up as `None` or an
/// empty curriculum.
pub fn extract_program(url: &str, html: &str) -> ProgramRecord {
    let doc = Html::parse_document(html);

    let program_title = doc
        .select(&TITLE_SEL)
        .next()
        .and_then(|h2| clean_text(&element_text(&h2, " ")));

    let pairs = fact_pairs(&doc);
    let facts = normalize_facts(&pairs);
    let curriculum = extract_curriculum(&doc);

    debug!(
        url,
        facts = pairs.len(),
        items = curriculum.len(),
        "program page extracted"
    );

    let extra = facts
        .all
        .into_iter()
        .filter(|(slug, _)| !RESERVED_RECORD_KEYS.contains(&slug.as_str()))
        .collect();

    let known = facts.known;
    ProgramRecord {
        program_url: url.to_string(),
        program_title,
        degree: known.degree,
        semesters: known.semesters,
        mode: known.mode,
        total_ects: known.total_ects,
        language: known.language,
        application_period: known.application_period,
        start_dates: known.start_dates,
        curriculum,
        extra,
    }
}

/// `(label, value)` pairs from every `dl` of the facts section, in order.
pub fn fact_pairs(doc: &Html) -> Vec<(String, FactInput)> {
    let Some(section) = doc.select(&FACTS_SEL).next() else {
        return Vec::new();
    };

    let mut pairs = Vec::new();
    for dl in section.select(&DL_SEL) {
        let mut entries = Vec::new();
        collect_dl_entries(dl, &mut entries);

        let mut label: Option<String> = None;
        for child in entries {
            match child.value().name() {
                // A second dt before any dd does not replace the first.
                "dt" if label.is_none() => label = Some(element_text(&child, " ")),
                "dd" => {
                    if let Some(label) = label.take() {
                        pairs.push((label, fact_input(&child)));
                    }
                }
                _ => {}
            }
        }
    }
    pairs
}

/// `dt`/`dd` children of `parent` in order, looking through `div` groups.
fn collect_dl_entries<'a>(parent: ElementRef<'a>, out: &mut Vec<ElementRef<'a>>) {
    for child in parent.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "dt" | "dd" => out.push(child),
            "div" => collect_dl_entries(child, out),
            _ => {}
        }
    }
}

/// List items when the value holds a list, otherwise line-preserving text.
fn fact_input(dd: &ElementRef<'_>) -> FactInput {
    let items: Vec<String> = dd.select(&LI_SEL).map(|li| element_text(&li, " ")).collect();
    if items.is_empty() {
        FactInput::Text(element_text(dd, "\n").replace('\r', "\n"))
    } else {
        FactInput::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curricula_shared::{FactValue, ItemKind};

    const URL: &str = "https://www.hcw.ac.at/studium-weiterbildung/studienangebot/informatik";

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn fixture_page_yields_full_record() {
        let record = extract_program(URL, &load_fixture("program.html"));

        assert_eq!(record.program_url, URL);
        assert_eq!(record.program_title.as_deref(), Some("Informatik"));
        assert_eq!(record.semesters, Some(FactValue::Number(6)));
        assert_eq!(record.total_ects, Some(FactValue::Number(180)));
        assert_eq!(
            record.language,
            Some(FactValue::List(vec![
                FactValue::Text("Deutsch".into()),
                FactValue::Text("Englisch".into()),
            ]))
        );
        assert_eq!(
            record.start_dates,
            Some(FactValue::List(vec![
                FactValue::Text("September".into()),
                FactValue::Text("Februar".into()),
            ]))
        );
        assert_eq!(
            record.extra.get("kosten"),
            Some(&FactValue::Text("EUR 363,36 pro Semester".into()))
        );
        // Canonical slugs never shadow the fixed keys.
        assert!(!record.extra.contains_key("program_title"));

        let kinds: Vec<ItemKind> = record.curriculum.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Module,
                ItemKind::Course,
                ItemKind::Course,
                ItemKind::Module,
                ItemKind::Course,
            ]
        );
        assert_eq!(record.curriculum[1].parent_module.as_deref(), Some("Grundlagen"));
        assert_eq!(record.curriculum[4].semester, Some(2));
    }

    #[test]
    fn dt_dd_pairs_keep_order_and_shape() {
        let doc = Html::parse_document(
            r#"<section class="coursedetail"><dl>
                <dt>Abschluss</dt><dd>BSc</dd>
                <dt>Bewerbung</dt><dd><p>Runde 1</p><p>Runde 2</p></dd>
                <dt>Beginn</dt><dd><ul><li>März</li><li>Oktober</li></ul></dd>
                <dt>Dangling</dt>
            </dl></section>"#,
        );
        let pairs = fact_pairs(&doc);
        assert_eq!(
            pairs,
            vec![
                ("Abschluss".into(), FactInput::Text("BSc".into())),
                ("Bewerbung".into(), FactInput::Text("Runde 1\nRunde 2".into())),
                (
                    "Beginn".into(),
                    FactInput::List(vec!["März".into(), "Oktober".into()])
                ),
            ]
        );
    }

    #[test]
    fn div_grouped_entries_are_found() {
        let doc = Html::parse_document(
            r#"<section class="coursedetail"><dl>
                <div><dt>Abschluss</dt><dd>MSc</dd></div>
                <dt>Studiendauer</dt><dd>4 Semester</dd>
                <div class="row"><dt>Kosten</dt><dd></dd></div>
            </dl></section>"#,
        );
        let pairs = fact_pairs(&doc);
        let labels: Vec<&str> = pairs.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["Abschluss", "Studiendauer", "Kosten"]);
        assert_eq!(pairs[0].1, FactInput::Text("MSc".into()));

        let facts = normalize_facts(&pairs);
        assert_eq!(facts.known.degree, Some(FactValue::Text("MSc".into())));
        assert_eq!(facts.all.get("kosten"), Some(&FactValue::Missing));
    }

    #[test]
    fn bare_page_yields_empty_record() {
        let record = extract_program(URL, "<html><body></body></html>");
        assert_eq!(record.program_title, None);
        assert_eq!(record.degree, None);
        assert!(record.curriculum.is_empty());
        assert!(record.extra.is_empty());
    }
}
