//! Program fact list → canonical fields plus a slug-keyed map of everything.

use std::collections::BTreeMap;

use curricula_shared::{FactInput, FactValue};

use crate::text::{clean_text, first_integer, normalize_label, slugify_label};

/// The seven facts every program record carries as fixed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KnownFact {
    Degree,
    Semesters,
    Mode,
    TotalEcts,
    Language,
    ApplicationPeriod,
    StartDates,
}

impl KnownFact {
    /// Look up the canonical fact a page label stands for.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = normalize_label(label);
        let normalized = normalized.trim_end_matches(':').trim();
        match normalized {
            "abschluss" | "degree" | "abschlussgrad" | "abschlussart" | "abschlussbezeichnung" => {
                Some(Self::Degree)
            }
            "semester" | "studiendauer" | "anzahl semester" => Some(Self::Semesters),
            "organisationsform" | "mode" => Some(Self::Mode),
            "ects" | "gesamt ects" | "gesamtpunkte" => Some(Self::TotalEcts),
            "sprache" | "unterrichtssprache" | "sprachen" => Some(Self::Language),
            "bewerbungsfrist" | "bewerbungsfristen" | "bewerbung" => {
                Some(Self::ApplicationPeriod)
            }
            "studienbeginn" | "beginn" => Some(Self::StartDates),
            _ => None,
        }
    }

    /// Numeric facts keep only their first integer.
    fn is_numeric(self) -> bool {
        matches!(self, Self::Semesters | Self::TotalEcts)
    }
}

/// Canonical facts of one program. `None` when the page never mentioned it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownFacts {
    pub degree: Option<FactValue>,
    pub semesters: Option<FactValue>,
    pub mode: Option<FactValue>,
    pub total_ects: Option<FactValue>,
    pub language: Option<FactValue>,
    pub application_period: Option<FactValue>,
    pub start_dates: Option<FactValue>,
}

impl KnownFacts {
    fn slot_mut(&mut self, fact: KnownFact) -> &mut Option<FactValue> {
        match fact {
            KnownFact::Degree => &mut self.degree,
            KnownFact::Semesters => &mut self.semesters,
            KnownFact::Mode => &mut self.mode,
            KnownFact::TotalEcts => &mut self.total_ects,
            KnownFact::Language => &mut self.language,
            KnownFact::ApplicationPeriod => &mut self.application_period,
            KnownFact::StartDates => &mut self.start_dates,
        }
    }
}

/// Result of normalizing a program's fact list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramFacts {
    pub known: KnownFacts,
    /// Every fact by slugified label.
    pub all: BTreeMap<String, FactValue>,
}

/// Normalize `(label, value)` pairs as they appear on the page.
///
/// A label seen more than once collects its values, in order, into a list.
/// A label with an empty value is still recorded, as [`FactValue::Missing`].
pub fn normalize_facts(pairs: &[(String, FactInput)]) -> ProgramFacts {
    let mut known: BTreeMap<KnownFact, Vec<FactValue>> = BTreeMap::new();
    let mut all: BTreeMap<String, Vec<FactValue>> = BTreeMap::new();

    for (label, input) in pairs {
        let Some(slug) = slugify_label(label) else {
            continue;
        };
        let value = normalize_value(input, false).unwrap_or(FactValue::Missing);

        // The slug map keeps the cleaned text; only the canonical field is narrowed.
        if let Some(fact) = KnownFact::from_label(label) {
            let canonical = if fact.is_numeric() {
                normalize_value(input, true).unwrap_or_else(|| value.clone())
            } else {
                value.clone()
            };
            known.entry(fact).or_default().push(canonical);
        }
        all.entry(slug).or_default().push(value);
    }

    let mut facts = ProgramFacts::default();
    for (fact, values) in known {
        // A canonical field with no value at all stays absent.
        if values.iter().all(FactValue::is_missing) {
            continue;
        }
        *facts.known.slot_mut(fact) = Some(collapse(values));
    }
    facts.all = all
        .into_iter()
        .map(|(slug, values)| (slug, collapse(values)))
        .collect();
    facts
}

/// One occurrence stays scalar; several become a list.
fn collapse(mut values: Vec<FactValue>) -> FactValue {
    if values.len() == 1 {
        values.remove(0)
    } else {
        FactValue::List(values)
    }
}

fn normalize_value(input: &FactInput, numeric: bool) -> Option<FactValue> {
    match input {
        FactInput::Text(text) => normalize_scalar(text, numeric),
        FactInput::List(items) => {
            let items: Vec<FactValue> = items
                .iter()
                .filter_map(|item| normalize_scalar(item, numeric))
                .collect();
            (!items.is_empty()).then_some(FactValue::List(items))
        }
    }
}

fn normalize_scalar(raw: &str, numeric: bool) -> Option<FactValue> {
    let cleaned = clean_text(raw)?;
    if numeric {
        if let Some(n) = first_integer(&cleaned) {
            return Some(FactValue::Number(n));
        }
    }
    Some(FactValue::Text(cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(label: &str, value: &str) -> (String, FactInput) {
        (label.to_string(), FactInput::Text(value.to_string()))
    }

    #[test]
    fn known_fields_from_label_table() {
        let facts = normalize_facts(&[
            text("Abschluss", "Bachelor of Science in Engineering (BSc)"),
            text("Studiendauer", "6 Semester"),
            text("Organisationsform", "Vollzeit\u{a0}/ berufsbegleitend"),
            text("ECTS", "180³"),
            text("Bewerbungsfrist", "bis 30. Juni"),
        ]);

        assert_eq!(
            facts.known.degree,
            Some(FactValue::Text("Bachelor of Science in Engineering (BSc)".into()))
        );
        assert_eq!(facts.known.semesters, Some(FactValue::Number(6)));
        assert_eq!(
            facts.known.mode,
            Some(FactValue::Text("Vollzeit / berufsbegleitend".into()))
        );
        assert_eq!(facts.known.total_ects, Some(FactValue::Number(180)));
        assert_eq!(
            facts.known.application_period,
            Some(FactValue::Text("bis 30. Juni".into()))
        );
        assert_eq!(facts.known.language, None);
        assert_eq!(
            facts.all.get("studiendauer"),
            Some(&FactValue::Text("6 Semester".into()))
        );
    }

    #[test]
    fn numeric_fact_without_digits_keeps_text() {
        let facts = normalize_facts(&[text("Semester", "nach Vereinbarung")]);
        assert_eq!(
            facts.known.semesters,
            Some(FactValue::Text("nach Vereinbarung".into()))
        );
    }

    #[test]
    fn repeated_label_aggregates_in_order() {
        let facts = normalize_facts(&[
            text("Sprache", "Deutsch"),
            text("Kosten", "EUR 363,36"),
            text("Sprache", "Englisch"),
        ]);
        let expected = FactValue::List(vec![
            FactValue::Text("Deutsch".into()),
            FactValue::Text("Englisch".into()),
        ]);
        assert_eq!(facts.all.get("sprache"), Some(&expected));
        assert_eq!(facts.known.language, Some(expected));
        assert_eq!(
            facts.all.get("kosten"),
            Some(&FactValue::Text("EUR 363,36".into()))
        );
    }

    #[test]
    fn list_input_is_cleaned_per_item() {
        let facts = normalize_facts(&[(
            "Studienbeginn".to_string(),
            FactInput::List(vec!["  September ".into(), "".into(), "Februar\u{b9}".into()]),
        )]);
        assert_eq!(
            facts.known.start_dates,
            Some(FactValue::List(vec![
                FactValue::Text("September".into()),
                FactValue::Text("Februar".into()),
            ]))
        );
    }

    #[test]
    fn empty_labels_are_skipped() {
        let facts = normalize_facts(&[text(" / ", "orphan value")]);
        assert_eq!(facts.known, KnownFacts::default());
        assert!(facts.all.is_empty());
    }

    #[test]
    fn empty_values_are_recorded_as_missing() {
        let facts = normalize_facts(&[
            text("Kosten", ""),
            text("Abschluss", " \u{a0} "),
            (
                "Beginn".to_string(),
                FactInput::List(vec![String::new()]),
            ),
            text("Sprache", "Deutsch"),
            text("Sprache", " "),
        ]);

        assert_eq!(facts.all.get("kosten"), Some(&FactValue::Missing));
        assert_eq!(facts.all.get("abschluss"), Some(&FactValue::Missing));
        assert_eq!(facts.all.get("beginn"), Some(&FactValue::Missing));
        let sprache = FactValue::List(vec![FactValue::Text("Deutsch".into()), FactValue::Missing]);
        assert_eq!(facts.all.get("sprache"), Some(&sprache));

        // Canonical fields stay absent unless some occurrence had a value.
        assert_eq!(facts.known.degree, None);
        assert_eq!(facts.known.start_dates, None);
        assert_eq!(facts.known.language, Some(sprache));
    }

    #[test]
    fn label_lookup_ignores_case_umlauts_and_colon() {
        assert_eq!(KnownFact::from_label("ABSCHLUSS:"), Some(KnownFact::Degree));
        assert_eq!(KnownFact::from_label("Gesamt ECTS"), Some(KnownFact::TotalEcts));
        assert_eq!(KnownFact::from_label("Kosten"), None);
    }
}
