use super::Category;
use crate::backend::RawResult;

pub const DATE_MISSING: &str = "N/A";
pub const SOURCE_MISSING: &str = "Unknown";

/// Report header, in column order.
pub const COLUMNS: [&str; 7] = [
    "Subject", "Category", "Date", "Source", "Title", "Link", "Snippet",
];

/// One report row. Every field is always set; absent backend fields carry
/// `DATE_MISSING`, `SOURCE_MISSING` or an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub subject: String,
    pub category: String,
    pub date: String,
    pub source: String,
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl NormalizedRecord {
    /// Row placed in an otherwise empty report.
    pub fn sentinel() -> Self {
        Self {
            subject: "NONE".into(),
            category: "INFO".into(),
            date: DATE_MISSING.into(),
            source: SOURCE_MISSING.into(),
            title: "No results found".into(),
            link: String::new(),
            snippet: String::new(),
        }
    }

    /// Field values in `COLUMNS` order.
    pub fn values(&self) -> [&str; 7] {
        [
            &self.subject,
            &self.category,
            &self.date,
            &self.source,
            &self.title,
            &self.link,
            &self.snippet,
        ]
    }
}

/// Maps a provider-native result onto the report schema. The link is read
/// through the producing vertical's link-field rule; every other field is
/// read by name.
pub fn normalize(raw: &RawResult, subject: &str, category: Category) -> NormalizedRecord {
    NormalizedRecord {
        subject: subject.to_string(),
        category: category.label().to_string(),
        date: non_blank(raw.text("date")).unwrap_or_else(|| DATE_MISSING.into()),
        source: non_blank(raw.text("source")).unwrap_or_else(|| SOURCE_MISSING.into()),
        title: raw.text("title").unwrap_or_default(),
        link: raw.link().unwrap_or_default(),
        snippet: raw.text("body").unwrap_or_default(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Final, ordered output of a run. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestResult {
    records: Vec<NormalizedRecord>,
    sentinel: bool,
}

impl HarvestResult {
    /// Seals the accumulated records, substituting the sentinel row when the
    /// run produced nothing.
    pub fn finalize(records: Vec<NormalizedRecord>) -> Self {
        if records.is_empty() {
            Self {
                records: vec![NormalizedRecord::sentinel()],
                sentinel: true,
            }
        } else {
            Self {
                records,
                sentinel: false,
            }
        }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_sentinel(&self) -> bool {
        self.sentinel
    }

    /// Record counts per category label, in first-seen order.
    pub fn category_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for record in &self.records {
            match counts.iter().position(|(label, _)| *label == record.category) {
                Some(i) => counts[i].1 += 1,
                None => counts.push((record.category.as_str(), 1)),
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use serde_json::{Value, json};

    fn raw(kind: BackendKind, value: Value) -> RawResult {
        match value {
            Value::Object(map) => RawResult::new(kind, map),
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn news_result_maps_all_fields() {
        let r = raw(
            BackendKind::News,
            json!({
                "date": "2024-05-01T10:00:00+00:00",
                "source": "El País",
                "title": "Redada",
                "url": "https://elpais.example/redada",
                "body": "Incautadas réplicas"
            }),
        );
        let rec = normalize(&r, "Loewe", Category::CounterfeitNews);
        assert_eq!(
            rec.values(),
            [
                "Loewe",
                "CounterfeitNews",
                "2024-05-01T10:00:00+00:00",
                "El País",
                "Redada",
                "https://elpais.example/redada",
                "Incautadas réplicas"
            ]
        );
    }

    #[test]
    fn text_result_link_comes_from_href() {
        let r = raw(
            BackendKind::Text,
            json!({"title": "Report", "href": "https://ir.example/a.pdf", "body": "risks"}),
        );
        let rec = normalize(&r, "Acme", Category::AnnualReport);
        assert_eq!(rec.link, "https://ir.example/a.pdf");
        assert_eq!(rec.date, DATE_MISSING);
        assert_eq!(rec.source, SOURCE_MISSING);
    }

    #[test]
    fn empty_result_gets_sentinels_for_every_field() {
        let r = raw(BackendKind::News, json!({}));
        let rec = normalize(&r, "Acme", Category::PhishingNews);
        assert_eq!(
            rec.values(),
            ["Acme", "PhishingNews", "N/A", "Unknown", "", "", ""]
        );
    }

    #[test]
    fn blank_date_and_source_use_sentinels() {
        let r = raw(BackendKind::News, json!({"date": " ", "source": "", "title": null}));
        let rec = normalize(&r, "Acme", Category::PhishingNews);
        assert_eq!(rec.date, DATE_MISSING);
        assert_eq!(rec.source, SOURCE_MISSING);
        assert_eq!(rec.title, "");
    }

    #[test]
    fn finalize_substitutes_sentinel_only_when_empty() {
        let empty = HarvestResult::finalize(vec![]);
        assert!(empty.is_sentinel());
        assert_eq!(empty.len(), 1);
        assert_eq!(empty.records()[0].subject, "NONE");
        assert_eq!(empty.records()[0].category, "INFO");

        let rec = normalize(&raw(BackendKind::Text, json!({})), "A", Category::AnnualReport);
        let full = HarvestResult::finalize(vec![rec.clone()]);
        assert!(!full.is_sentinel());
        assert_eq!(full.records(), &[rec]);
    }

    #[test]
    fn category_counts_preserve_first_seen_order() {
        let make = |c| normalize(&raw(BackendKind::News, json!({})), "A", c);
        let result = HarvestResult::finalize(vec![
            make(Category::PhishingNews),
            make(Category::CounterfeitNews),
            make(Category::PhishingNews),
        ]);
        assert_eq!(
            result.category_counts(),
            vec![("PhishingNews", 2), ("CounterfeitNews", 1)]
        );
    }
}
