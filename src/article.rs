// article.rs - Article Extractor
// Turns raw news-page markup into a (title, body) pair.
//
// Boilerplate elements are skipped entirely: their text is never emitted and
// selector matches inside them are ignored. Title and body each go through a
// priority list of selectors tuned for Korean portal/news markup, then fall
// back to generic page structure. Nothing here fails; the worst case is an
// empty title and whatever text the page has left.

use crate::classify::SourceKind;
use crate::content::{normalize_lines, truncate_chars, ExtractedContent, MAX_BODY_CHARS};
use log::{debug, trace};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

const STRIPPED_TAGS: [&str; 7] = ["script", "style", "nav", "header", "footer", "aside", "iframe"];

const TITLE_SELECTORS: [&str; 8] = [
    "#title_area",
    ".media_end_head_headline",
    "h2.news_title",
    ".article_title",
    ".article-title",
    "h1.headline",
    "article h1",
    "h1",
];

const BODY_SELECTORS: [&str; 7] = [
    "#dic_area",
    "#articleBodyContents",
    ".article_body",
    "article",
    ".news_end",
    "#articeBody",
    "#newsEndContents",
];

fn compile(patterns: &[&str]) -> Vec<Selector> {
    patterns
        .iter()
        .map(|p| Selector::parse(p).expect("Invalid article selector"))
        .collect()
}

static TITLE_SELECTOR_LIST: Lazy<Vec<Selector>> = Lazy::new(|| compile(&TITLE_SELECTORS));
static BODY_SELECTOR_LIST: Lazy<Vec<Selector>> = Lazy::new(|| compile(&BODY_SELECTORS));
static OG_TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("Invalid og:title selector"));
static TITLE_TAG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("Invalid title selector"));

pub fn extract_article(html: &str) -> ExtractedContent {
    let document = Html::parse_document(html);

    let title = resolve_title(&document);
    let body = resolve_body(&document);

    debug!(
        "📰 Extracted article: title={} chars, body={} chars",
        title.chars().count(),
        body.chars().count()
    );

    ExtractedContent {
        title,
        body,
        source_kind: SourceKind::Article,
    }
}

fn resolve_title(document: &Html) -> String {
    for (selector, pattern) in TITLE_SELECTOR_LIST.iter().zip(TITLE_SELECTORS) {
        if let Some(title) = first_visible(document, selector)
            .map(|el| text_fragments(el).join(" "))
            .filter(|t| !t.is_empty())
        {
            trace!("🔍 Title matched selector '{}'", pattern);
            return title;
        }
    }

    let og_title = document
        .select(&OG_TITLE_SELECTOR)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|t| !t.is_empty());
    if let Some(title) = og_title {
        trace!("🔍 Title taken from og:title");
        return title.to_string();
    }

    document
        .select(&TITLE_TAG_SELECTOR)
        .map(|el| text_fragments(el).join(" "))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

fn resolve_body(document: &Html) -> String {
    let container_text = BODY_SELECTOR_LIST
        .iter()
        .zip(BODY_SELECTORS)
        .find_map(|(selector, pattern)| {
            let fragments = text_fragments(first_visible(document, selector)?);
            if fragments.is_empty() {
                return None;
            }
            trace!("🔍 Body matched selector '{}'", pattern);
            Some(fragments.join("\n"))
        });

    let text = container_text.unwrap_or_else(|| {
        debug!("📄 No article container matched, using whole-page text");
        text_fragments(document.root_element()).join("\n")
    });

    truncate_chars(&normalize_lines(&text), MAX_BODY_CHARS)
}

/// First match of `selector` that does not sit inside a stripped element.
fn first_visible<'a>(document: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    document.select(selector).find(|el| !is_stripped(*el))
}

fn is_stripped_tag(name: &str) -> bool {
    STRIPPED_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name))
}

fn is_stripped(element: ElementRef<'_>) -> bool {
    is_stripped_tag(element.value().name())
        || element
            .ancestors()
            .filter_map(|node| node.value().as_element())
            .any(|el| is_stripped_tag(el.name()))
}

/// Trimmed, non-empty text fragments under `element`, skipping stripped subtrees.
fn text_fragments(element: ElementRef<'_>) -> Vec<String> {
    let mut out = Vec::new();
    collect_text(element, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !is_stripped_tag(child_el.value().name()) {
                collect_text(child_el, out);
            }
        }
    }
}
