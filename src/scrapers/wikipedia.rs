//! Wikipedia article text extraction.
//!
//! Article content lives under the first `div.mw-parser-output`. Within it,
//! every heading (`h1`..`h6`) and paragraph is visited in document order;
//! each element's text (inline descendants included) is trimmed and kept if
//! non-empty. The kept parts are joined with `\n` and passed through
//! [`normalize_text`], which strips LaTeX-ish control words and collapses
//! whitespace, so the result is a single line.

use crate::utils::{normalize_text, truncate_for_log};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.mw-parser-output").expect("valid body selector"));

static TEXT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, p").expect("valid text selector"));

/// Parse `html` and extract the article text.
///
/// Returns `None` when there is no article body or every selected element is
/// blank. A page with at least one non-blank element always yields `Some`,
/// even if normalisation leaves only `""` or `" "`.
#[instrument(level = "debug", skip_all, fields(bytes = html.len()))]
pub fn extract_article_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let parts = article_parts(&document)?;
    if parts.is_empty() {
        debug!("Article body has no non-empty headings or paragraphs");
        return None;
    }

    let text = normalize_text(&parts.join("\n"));
    debug!(
        parts = parts.len(),
        preview = %truncate_for_log(&text, 120),
        "Extracted article text"
    );
    Some(text)
}

/// Trimmed, non-empty heading and paragraph texts of the article body, in
/// document order. `None` if the document has no article body.
pub fn article_parts(document: &Html) -> Option<Vec<String>> {
    let Some(body) = document.select(&BODY_SELECTOR).next() else {
        debug!("No div.mw-parser-output in document");
        return None;
    };
    Some(body_parts(body))
}

fn body_parts(body: ElementRef<'_>) -> Vec<String> {
    body.select(&TEXT_SELECTOR)
        .filter_map(|element| {
            let text = element.text().collect::<String>();
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}
