//! Program page → ordered curriculum items.
//!
//! The curriculum accordion holds one container per semester. Inside, every
//! entry is a marker `span` whose title/SWS/ECTS header and long-form detail
//! block sit somewhere *after* it in the document, with no id linking them.
//! We walk the document as a node stream and pair each marker with the next
//! header and detail node that no earlier marker has claimed.
//!
//! Markers that follow each other with no block in between form a run and
//! share the blocks after them in order. Once a block has been seen, the next
//! marker closes the run: earlier markers still waiting simply have no such
//! block, so one missing detail never shifts later items.

use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use curricula_shared::{CurriculumItem, ItemKind};

use crate::details::parse_detail_html;
use crate::text::{clean_text, element_text, first_integer, parse_number};

static SEMESTER_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#accordion-curriculum > div.accordion-item").expect("valid selector")
});
static SEMESTER_LABEL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("button.accordion-button").expect("valid selector"));
static MARKER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.infobutton-curriculum").expect("valid selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("valid selector"));
static SWS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.sws").expect("valid selector"));
static VALUE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("strong.val").expect("valid selector"));

const HEADER_CLASS: &str = "infotext-header-curriculum";
const DETAIL_CLASS: &str = "infotext-curriculum";

/// A marker with the header/detail nodes it claimed during the walk.
struct Marker<'a> {
    kind: ItemKind,
    semester: Option<u32>,
    header: Option<ElementRef<'a>>,
    detail: Option<ElementRef<'a>>,
}

/// Parse a full program page and extract its curriculum.
pub fn parse_curriculum_html(html: &str) -> Vec<CurriculumItem> {
    extract_curriculum(&Html::parse_document(html))
}

/// Extract the curriculum of an already parsed program page, in document order.
pub fn extract_curriculum(doc: &Html) -> Vec<CurriculumItem> {
    let markers = pair_markers(doc);
    debug!(markers = markers.len(), "curriculum markers paired");

    markers
        .iter()
        .scan(None::<String>, |last_module, marker| {
            let item = build_item(marker, last_module.clone());
            if item.kind == ItemKind::Module {
                *last_module = item.title.clone();
            }
            Some(item)
        })
        .collect()
}

/// Semester number from a container's toggle label (`"3. Semester"` → 3).
fn container_semester(container: &ElementRef<'_>) -> Option<u32> {
    container
        .select(&SEMESTER_LABEL_SEL)
        .next()
        .map(|b| element_text(&b, " "))
        .and_then(|label| first_integer(&label))
        .and_then(|n| u32::try_from(n).ok())
}

/// Single document-order walk. Markers queue up for a header and a detail
/// node; each header/detail node goes to the oldest marker still waiting in
/// the current run.
fn pair_markers(doc: &Html) -> Vec<Marker<'_>> {
    // Only markers inside a semester container count.
    let mut semesters = HashMap::new();
    for container in doc.select(&SEMESTER_SEL) {
        let semester = container_semester(&container);
        for marker in container.select(&MARKER_SEL) {
            semesters.insert(marker.id(), semester);
        }
    }

    let mut markers: Vec<Marker<'_>> = Vec::new();
    let mut awaiting_header: VecDeque<usize> = VecDeque::new();
    let mut awaiting_detail: VecDeque<usize> = VecDeque::new();
    let mut block_since_marker = false;

    for node in doc.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };

        if let Some(&semester) = semesters.get(&el.id()) {
            if block_since_marker {
                awaiting_header.clear();
                awaiting_detail.clear();
                block_since_marker = false;
            }
            awaiting_header.push_back(markers.len());
            awaiting_detail.push_back(markers.len());
            markers.push(Marker {
                kind: ItemKind::classify(el.value().attr("data-type")),
                semester,
                header: None,
                detail: None,
            });
        } else if has_class(&el, HEADER_CLASS) {
            block_since_marker = true;
            if let Some(idx) = awaiting_header.pop_front() {
                markers[idx].header = Some(el);
            }
        } else if has_class(&el, DETAIL_CLASS) {
            block_since_marker = true;
            if let Some(idx) = awaiting_detail.pop_front() {
                markers[idx].detail = Some(el);
            }
        }
    }

    markers
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().name() == "div" && el.value().classes().any(|c| c == class)
}

fn build_item(marker: &Marker<'_>, last_module: Option<String>) -> CurriculumItem {
    let mut title = None;
    let mut sws = None;
    let mut ects = None;

    if let Some(header) = &marker.header {
        title = header
            .select(&TITLE_SEL)
            .next()
            .and_then(|h3| clean_text(&element_text(&h3, " ")));

        // SWS and ECTS share one wrapper; values appear in that order.
        if let Some(wrapper) = header.select(&SWS_SEL).next() {
            let values: Vec<String> = wrapper
                .select(&VALUE_SEL)
                .map(|v| element_text(&v, ""))
                .collect();
            sws = values.first().and_then(|v| parse_number(v));
            ects = values.get(1).and_then(|v| parse_number(v));
        }
    }

    let details_html = marker.detail.as_ref().map(|d| d.inner_html());
    let details = parse_detail_html(details_html.as_deref()).unwrap_or_default();

    let parent_module = match marker.kind {
        ItemKind::Course => last_module,
        ItemKind::Module => None,
    };

    CurriculumItem {
        kind: marker.kind,
        title,
        sws,
        ects,
        parent_module,
        semester: marker.semester,
        details_html,
        details,
    }
}
