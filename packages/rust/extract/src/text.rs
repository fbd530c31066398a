//! Text and label normalization shared by all extractors.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

static SUPERSCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[\u{00B9}\u{00B2}\u{00B3}\u{2070}-\u{2079}]").expect("valid regex")
});
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:[.,][0-9]+)?").expect("valid regex"));
static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

/// Strip NBSP and superscript-digit artifacts, collapse whitespace, trim.
/// Returns `None` when nothing is left.
pub fn clean_text(value: &str) -> Option<String> {
    let s = value.replace('\u{a0}', " ");
    let s = SUPERSCRIPT_RE.replace_all(&s, "");
    let s = WHITESPACE_RE.replace_all(&s, " ");
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Lowercase, transliterate umlauts and ß, trim.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.to_lowercase().chars() {
        match c {
            'ä' => out.push('a'),
            'ö' => out.push('o'),
            'ü' => out.push('u'),
            'ß' => out.push_str("ss"),
            _ => out.push(c),
        }
    }
    out.trim().to_string()
}

/// Normalized label with every non-alphanumeric run collapsed to `_`.
pub fn slugify_label(label: &str) -> Option<String> {
    let normalized = normalize_label(label);
    let slug = NON_ALNUM_RE.replace_all(&normalized, "_");
    let slug = slug.trim_matches('_');
    (!slug.is_empty()).then(|| slug.to_string())
}

/// First decimal number in `value`, accepting comma or dot as separator.
///
/// `"75³ ECTS"` → 75.0, `"3,5"` → 3.5, `"k. A."` → `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    let m = NUMBER_RE.find(value)?;
    m.as_str().replace(',', ".").parse().ok()
}

/// First run of ASCII digits in `value`.
pub fn first_integer(value: &str) -> Option<i64> {
    INTEGER_RE.find(value)?.as_str().parse().ok()
}

/// Visible text of an element: trimmed text nodes joined by `sep`.
pub fn element_text(el: &ElementRef<'_>, sep: &str) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}
