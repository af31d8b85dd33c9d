use bundler_core::CONTENT_UNAVAILABLE;
use bundler_logging::bundler_warn;
use scraper::{Html, Selector};

/// Blog post containers, most specific first.
pub const DEFAULT_CONTENT_SELECTORS: &[&str] = &[
    "div.post-body",
    "div.entry-content",
    "article",
    "div#post-body",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOrigin {
    /// Matched the candidate selector with this source text.
    Selector(String),
    Body,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub content_html: String,
    pub origin: ContentOrigin,
}

pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedContent;
}

/// Ordered fallback chain:
/// - inner html of the first candidate selector that matches
/// - otherwise `<body>` inner html
/// - otherwise [`CONTENT_UNAVAILABLE`].
///
/// Total and deterministic for a given candidate list.
#[derive(Debug)]
pub struct SelectorExtractor {
    candidates: Vec<(String, Selector)>,
}

impl SelectorExtractor {
    /// Unparseable selectors are logged and skipped.
    pub fn new<S: AsRef<str>>(candidates: &[S]) -> Self {
        let candidates = candidates
            .iter()
            .filter_map(|raw| {
                let raw = raw.as_ref();
                match Selector::parse(raw) {
                    Ok(sel) => Some((raw.to_string(), sel)),
                    Err(err) => {
                        bundler_warn!("Skipping invalid content selector {:?}: {:?}", raw, err);
                        None
                    }
                }
            })
            .collect();
        Self { candidates }
    }
}

impl Default for SelectorExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_SELECTORS)
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, html: &str) -> ExtractedContent {
        let doc = Html::parse_document(html);
        let title = Selector::parse("title")
            .ok()
            .and_then(|sel| doc.select(&sel).next())
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let matched = self.candidates.iter().find_map(|(raw, sel)| {
            doc.select(sel)
                .next()
                .map(|node| (ContentOrigin::Selector(raw.clone()), node.inner_html()))
        });

        let (origin, content_html) = matched
            .or_else(|| {
                Selector::parse("body")
                    .ok()
                    .and_then(|sel| doc.select(&sel).next())
                    .map(|body| (ContentOrigin::Body, body.inner_html()))
            })
            .unwrap_or_else(|| (ContentOrigin::Unavailable, CONTENT_UNAVAILABLE.to_string()));

        ExtractedContent {
            title,
            content_html,
            origin,
        }
    }
}
