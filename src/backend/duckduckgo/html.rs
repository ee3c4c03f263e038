use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use url::Url;

use crate::backend::{BackendError, BackendKind, RawResult};

/// Parses the HTML-only results page into raw results keyed the way the web
/// vertical names them: `title`, `href`, `body`. Ads are skipped.
pub fn parse_results(
    page: &str,
    kind: BackendKind,
    limit: usize,
) -> Result<Vec<RawResult>, BackendError> {
    let document = Html::parse_document(page);
    let result_sel = selector(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut results = Vec::new();
    for element in document.select(&result_sel) {
        if results.len() >= limit {
            break;
        }
        let Some(anchor) = element.select(&title_sel).next() else {
            continue;
        };
        let title = collect_text(anchor);
        let Some(href) = anchor.value().attr("href").and_then(unwrap_redirect) else {
            continue;
        };
        if title.is_empty() {
            continue;
        }
        let body = element
            .select(&snippet_sel)
            .next()
            .map(collect_text)
            .unwrap_or_default();

        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(title));
        fields.insert("href".into(), Value::String(href));
        fields.insert("body".into(), Value::String(body));
        results.push(RawResult::new(kind, fields));
    }

    Ok(results)
}

fn selector(css: &str) -> Result<Selector, BackendError> {
    Selector::parse(css).map_err(|e| BackendError::Parse(format!("invalid selector {css}: {e:?}")))
}

fn collect_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Origin result anchors are resolved against; they are usually
/// protocol-relative.
const LINK_BASE: &str = "https://duckduckgo.com/";

/// Result links are wrapped as `//duckduckgo.com/l/?uddg=<encoded>&rut=…`.
/// Other links back into the search site are navigation, not results.
fn unwrap_redirect(href: &str) -> Option<String> {
    let link = Url::parse(LINK_BASE).ok()?.join(href).ok()?;
    let on_site = link.host_str() == Some("duckduckgo.com");

    match link.query_pairs().find(|(key, _)| key == "uddg") {
        Some((_, target)) if on_site && link.path() == "/l/" => Some(target.into_owned()),
        _ if on_site => None,
        _ => Some(link.into()),
    }
}
