use chrono::DateTime;
use scraper::Html;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::backend::{BackendKind, RawResult};

/// `news.js` payload. Items stay untyped so one malformed entry cannot
/// reject the ones around it.
#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Finds the `vqd` token in the search landing page. It appears as
/// `vqd="…"`, `vqd='…'` or inside a query string as `vqd=…&`.
pub fn extract_vqd(page: &str) -> Option<String> {
    for (open, close) in [("vqd=\"", '"'), ("vqd='", '\''), ("vqd=", '&')] {
        let Some(start) = page.find(open) else {
            continue;
        };
        let rest = &page[start + open.len()..];
        if let Some(end) = rest.find(close) {
            let token = &rest[..end];
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

/// Converts `news.js` items into raw results keyed the way the news vertical
/// names them: `date`, `title`, `body`, `url`, `source`.
///
/// Integer dates are Unix seconds and become RFC 3339; textual dates pass
/// through. Fields of an unexpected shape are dropped, never the item.
pub fn to_raw_results(response: NewsResponse, limit: usize) -> Vec<RawResult> {
    response
        .results
        .iter()
        .filter_map(Value::as_object)
        .take(limit)
        .map(|item| {
            let mut fields = Map::new();
            if let Some(date) = item.get("date").and_then(date_text) {
                fields.insert("date".into(), Value::String(date));
            }
            if let Some(title) = item.get("title").and_then(scalar_text) {
                fields.insert("title".into(), Value::String(strip_markup(&title)));
            }
            if let Some(excerpt) = item.get("excerpt").and_then(scalar_text) {
                fields.insert("body".into(), Value::String(strip_markup(&excerpt)));
            }
            for key in ["url", "source"] {
                if let Some(value) = item.get(key).and_then(scalar_text) {
                    fields.insert(key.into(), Value::String(value));
                }
            }
            RawResult::new(BackendKind::News, fields)
        })
        .collect()
}

fn date_text(value: &Value) -> Option<String> {
    match value.as_i64() {
        Some(secs) => DateTime::from_timestamp(secs, 0).map(|d| d.to_rfc3339()),
        None => scalar_text(value),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Excerpts carry `<b>` highlighting and HTML entities.
fn strip_markup(s: &str) -> String {
    let fragment = Html::parse_fragment(s);
    fragment
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_double_quoted_token() {
        let page = r#"<script>DDG.deep.initialize('/d.js?q=x&vqd=4-111&kl=wt-wt');vqd="4-222";</script>"#;
        assert_eq!(extract_vqd(page).as_deref(), Some("4-222"));
    }

    #[test]
    fn extracts_single_quoted_token() {
        assert_eq!(extract_vqd("vqd='4-333'").as_deref(), Some("4-333"));
    }

    #[test]
    fn extracts_query_string_token() {
        assert_eq!(
            extract_vqd("/d.js?q=x&vqd=4-444&kl=es-es").as_deref(),
            Some("4-444")
        );
    }

    #[test]
    fn missing_token_is_none() {
        assert_eq!(extract_vqd("<html></html>"), None);
        assert_eq!(extract_vqd(r#"vqd="""#), None);
    }

    #[test]
    fn converts_items_and_omits_absent_fields() {
        let response: NewsResponse = serde_json::from_value(serde_json::json!({
            "results": [
                {"date": 0, "title": "A &amp; B", "excerpt": "<b>x</b>", "url": "https://a", "source": "S"},
                {"title": "only title"}
            ]
        }))
        .unwrap();

        let raw = to_raw_results(response, 10);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].text("date").as_deref(), Some("1970-01-01T00:00:00+00:00"));
        assert_eq!(raw[0].text("title").as_deref(), Some("A & B"));
        assert_eq!(raw[0].text("body").as_deref(), Some("x"));
        assert_eq!(raw[0].link().as_deref(), Some("https://a"));
        assert!(raw[1].fields.get("url").is_none());
        assert!(raw[1].fields.get("source").is_none());
    }

    #[test]
    fn odd_field_types_keep_the_item() {
        let response: NewsResponse = serde_json::from_str(
            r#"{"results":[
                {"date":1700000000,"title":"good","url":"https://a"},
                {"date":"2024-05-01","title":"also good","url":"https://b"},
                {"date":[1],"title":{"x":1},"url":"https://c","source":7},
                "not an object"
            ]}"#,
        )
        .unwrap();

        let raw = to_raw_results(response, 10);
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0].text("date").as_deref(), Some("2023-11-14T22:13:20+00:00"));
        assert_eq!(raw[1].text("date").as_deref(), Some("2024-05-01"));
        assert_eq!(raw[1].text("title").as_deref(), Some("also good"));
        assert_eq!(raw[1].link().as_deref(), Some("https://b"));
        assert!(raw[2].fields.get("date").is_none());
        assert!(raw[2].fields.get("title").is_none());
        assert_eq!(raw[2].text("source").as_deref(), Some("7"));
        assert_eq!(raw[2].link().as_deref(), Some("https://c"));
    }

    #[test]
    fn missing_results_key_is_empty() {
        let response: NewsResponse = serde_json::from_str("{}").unwrap();
        assert!(to_raw_results(response, 3).is_empty());
    }
}
