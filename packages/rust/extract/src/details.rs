//! Detail fragment → labeled, block-structured description.
//!
//! A detail fragment is a flat run of headings followed by paragraphs, lists,
//! or wrapper `div`s. Each heading opens a section; only sections whose label
//! maps to one of the six canonical keys are kept.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use curricula_shared::DetailBlock;
use curricula_shared::DetailSections;
use curricula_shared::types::SectionKey;

use crate::text::{element_text, normalize_label};

static LI_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid selector"));

/// Map a section heading to its canonical key.
pub fn section_key(label: &str) -> Option<SectionKey> {
    match normalize_label(label).as_str() {
        "inhalt" => Some(SectionKey::Content),
        "lernergebnisse" => Some(SectionKey::LearningOutcomes),
        "lehrmethode" => Some(SectionKey::TeachingMethod),
        "prufungsmethode" | "pruefungsmethode" => Some(SectionKey::ExamMethod),
        "literatur" => Some(SectionKey::Literature),
        "unterrichtssprache" => Some(SectionKey::TeachingLanguage),
        _ => None,
    }
}

/// Parse a detail fragment into canonical sections.
///
/// Returns `None` for an absent or blank fragment, or when no heading matched
/// a canonical key. Headings mapping to the same key concatenate their blocks.
pub fn parse_detail_html(fragment: Option<&str>) -> Option<DetailSections> {
    let html = fragment.map(str::trim).filter(|s| !s.is_empty())?;
    let doc = Html::parse_fragment(html);

    let mut sections = DetailSections::default();
    let mut current: Option<SectionKey> = None;

    for node in doc.root_element().children() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };

        if is_heading(el.value().name()) {
            current = section_key(&el.text().map(str::trim).collect::<String>());
            if let Some(key) = current {
                sections.slot_mut(key).get_or_insert_with(Vec::new);
            }
            continue;
        }

        // Before the first heading, or under an unmapped one.
        let Some(key) = current else {
            continue;
        };

        let blocks = element_blocks(&el);
        if !blocks.is_empty() {
            sections
                .slot_mut(key)
                .get_or_insert_with(Vec::new)
                .extend(blocks);
        }
    }

    (!sections.is_empty()).then_some(sections)
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Blocks contributed by one top-level node.
fn element_blocks(el: &ElementRef<'_>) -> Vec<DetailBlock> {
    match el.value().name() {
        "ul" | "ol" => list_block(el).into_iter().collect(),
        "p" => text_block(el).into_iter().collect(),
        "div" | "section" | "article" => container_blocks(el),
        _ => Vec::new(),
    }
}

/// Direct-child lists, then direct-child paragraphs. Falls back to the whole
/// visible text only when neither produced a block, so nested text is never
/// captured twice.
fn container_blocks(el: &ElementRef<'_>) -> Vec<DetailBlock> {
    let children: Vec<ElementRef<'_>> = el.children().filter_map(ElementRef::wrap).collect();

    let mut blocks: Vec<DetailBlock> = children
        .iter()
        .filter(|c| matches!(c.value().name(), "ul" | "ol"))
        .filter_map(list_block)
        .collect();
    blocks.extend(
        children
            .iter()
            .filter(|c| c.value().name() == "p")
            .filter_map(text_block),
    );

    if blocks.is_empty() {
        blocks.extend(text_block(el));
    }
    blocks
}

fn list_block(el: &ElementRef<'_>) -> Option<DetailBlock> {
    let items: Vec<String> = el
        .select(&LI_SEL)
        .map(|li| element_text(&li, " "))
        .filter(|t| !t.is_empty())
        .collect();

    (!items.is_empty()).then(|| DetailBlock::List {
        ordered: el.value().name() == "ol",
        items,
    })
}

fn text_block(el: &ElementRef<'_>) -> Option<DetailBlock> {
    let content = element_text(el, " ");
    (!content.is_empty()).then_some(DetailBlock::Text { content })
}
