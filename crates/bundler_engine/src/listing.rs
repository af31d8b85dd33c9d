use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use bundler_core::{dedupe_by_url, ProgressEvent, SourceItem};
use bundler_logging::{bundler_debug, bundler_info, bundler_warn};
use scraper::{Html, Selector};
use url::Url;

use crate::decode::decode_html;
use crate::fetch::Fetcher;
use crate::persist::{JsonFile, PersistError};
use crate::progress::ProgressSink;
use crate::FetchError;

/// Blog permalinks carry the year in the path (`/2019/04/slug.html`).
const PERMALINK_MARKER: &str = "/20";
const HOMEPAGE_POST_LINKS: &str =
    "h2.post-title a[href], h3.post-title a[href], h2.entry-title a[href], h3.entry-title a[href]";

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("feed request failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("feed could not be parsed: {0}")]
    Parse(String),
    #[error("no posts found at {0}")]
    Empty(String),
    #[error("posts cache error: {0}")]
    Cache(#[from] PersistError),
    #[error("no cached listing at {0:?}; run first")]
    NoCache(PathBuf),
}

/// Produces the ordered list of sources for a run.
#[async_trait::async_trait]
pub trait SourceLister: Send + Sync {
    async fn list(&self, sink: &dyn ProgressSink) -> Result<Vec<SourceItem>, ListError>;
}

/// `{blog}/feeds/posts/default?alt=rss&start-index={start}&max-results={batch}`
pub fn feed_page_url(blog_url: &str, start_index: usize, batch_size: usize) -> String {
    format!(
        "{}/feeds/posts/default?alt=rss&start-index={}&max-results={}",
        blog_url.trim_end_matches('/'),
        start_index,
        batch_size
    )
}

/// Parse an RSS 2.0 document, falling back to Atom. Entries without a link are skipped.
pub fn parse_feed(content: &str) -> Result<Vec<SourceItem>, ListError> {
    match content.parse::<rss::Channel>() {
        Ok(channel) => Ok(channel
            .items()
            .iter()
            .filter_map(|item| {
                let link = item.link()?.trim();
                let title = item.title().unwrap_or_default().trim();
                Some(SourceItem::new(title, link))
            })
            .collect()),
        Err(rss_err) => {
            bundler_debug!("Not RSS ({}), trying Atom", rss_err);
            let feed = atom_syndication::Feed::read_from(content.as_bytes()).map_err(|atom_err| {
                ListError::Parse(format!("RSS error: {rss_err}. Atom error: {atom_err}"))
            })?;
            Ok(feed
                .entries()
                .iter()
                .filter_map(|entry| {
                    let link = entry
                        .links()
                        .iter()
                        .find(|l| l.rel() == "alternate")
                        .or_else(|| entry.links().first())?;
                    Some(SourceItem::new(entry.title().value.trim(), link.href().trim()))
                })
                .collect())
        }
    }
}

/// Pages through a Blogger-style feed, falling back to the homepage's post
/// title links when the feed yields nothing.
pub struct FeedLister {
    fetcher: Arc<dyn Fetcher>,
    blog_url: String,
    batch_size: usize,
    max_pages: usize,
}

impl FeedLister {
    pub fn new(fetcher: Arc<dyn Fetcher>, blog_url: impl Into<String>, batch_size: usize) -> Self {
        Self {
            fetcher,
            blog_url: blog_url.into(),
            batch_size: batch_size.max(1),
            max_pages: 1_000,
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let output = self.fetcher.fetch(url).await?;
        Ok(decode_html(&output.bytes, output.metadata.content_type.as_deref()).html)
    }

    async fn list_feed(&self, sink: &dyn ProgressSink) -> (Vec<SourceItem>, Option<ListError>) {
        let mut items = Vec::new();
        let mut start = 1;
        for _ in 0..self.max_pages {
            let url = feed_page_url(&self.blog_url, start, self.batch_size);
            let page = match self.fetch_text(&url).await {
                Ok(text) => parse_feed(&text),
                Err(err) => Err(ListError::Fetch(err)),
            };
            let page = match page {
                Ok(page) => page,
                Err(err) => {
                    bundler_warn!("Stopping feed paging at {}: {}", url, err);
                    return (items, Some(err));
                }
            };
            // Servers may cap `max-results` below the batch size, so only an
            // empty page ends the feed and the next index follows what came back.
            let page_len = page.len();
            if page_len == 0 {
                break;
            }
            items.extend(page.into_iter().filter(|i| is_permalink(&i.url)));
            sink.emit(ProgressEvent::Listing {
                message: format!("{} posts listed so far", items.len()),
            });
            start += page_len;
        }
        (items, None)
    }

    async fn list_homepage(&self) -> Result<Vec<SourceItem>, ListError> {
        let html = self.fetch_text(&self.blog_url).await?;
        let base = Url::parse(&self.blog_url).map_err(|e| ListError::Parse(e.to_string()))?;
        Ok(homepage_post_links(&html, &base))
    }
}

#[async_trait::async_trait]
impl SourceLister for FeedLister {
    async fn list(&self, sink: &dyn ProgressSink) -> Result<Vec<SourceItem>, ListError> {
        let (items, feed_err) = self.list_feed(sink).await;
        let items = dedupe_by_url(items);
        if !items.is_empty() {
            bundler_info!("Feed listed {} posts from {}", items.len(), self.blog_url);
            return Ok(items);
        }

        bundler_info!("Feed empty for {}, scraping homepage", self.blog_url);
        match self.list_homepage().await {
            Ok(found) if !found.is_empty() => Ok(dedupe_by_url(found)),
            Ok(_) => Err(feed_err.unwrap_or_else(|| ListError::Empty(self.blog_url.clone()))),
            Err(home_err) => Err(feed_err.unwrap_or(home_err)),
        }
    }
}

fn is_permalink(url: &str) -> bool {
    url.contains(PERMALINK_MARKER)
}

fn homepage_post_links(html: &str, base: &Url) -> Vec<SourceItem> {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse(HOMEPAGE_POST_LINKS) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    doc.select(&sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let url = base.join(href.trim()).ok()?.to_string();
            if !is_permalink(&url) || !seen.insert(url.clone()) {
                return None;
            }
            let title = a.text().collect::<String>().trim().to_string();
            Some(SourceItem::new(title, url))
        })
        .collect()
}

/// Wraps a lister with a JSON posts cache.
///
/// With `prefer_cache`, a loadable cache short-circuits listing. A successful
/// listing refreshes the cache; a failed one falls back to the cache when there
/// is one and is only fatal otherwise.
pub struct CachedLister {
    inner: Arc<dyn SourceLister>,
    cache: JsonFile<Vec<SourceItem>>,
    prefer_cache: bool,
}

impl CachedLister {
    pub fn new(inner: Arc<dyn SourceLister>, cache_path: impl Into<PathBuf>, prefer_cache: bool) -> Self {
        Self {
            inner,
            cache: JsonFile::new(cache_path),
            prefer_cache,
        }
    }

    fn cached(&self) -> Option<Vec<SourceItem>> {
        self.cache.load().filter(|items| !items.is_empty())
    }
}

#[async_trait::async_trait]
impl SourceLister for CachedLister {
    async fn list(&self, sink: &dyn ProgressSink) -> Result<Vec<SourceItem>, ListError> {
        if self.prefer_cache {
            if let Some(items) = self.cached() {
                sink.emit(ProgressEvent::Listing {
                    message: format!("Loaded {} posts from cache", items.len()),
                });
                return Ok(items);
            }
        }

        match self.inner.list(sink).await {
            Ok(items) => {
                if let Err(err) = self.cache.save(&items) {
                    bundler_warn!("Failed to save posts cache {:?}: {}", self.cache.path(), err);
                }
                sink.emit(ProgressEvent::Listing {
                    message: format!("Found {} posts", items.len()),
                });
                Ok(items)
            }
            Err(err) => match self.cached() {
                Some(items) => {
                    bundler_warn!("Listing failed ({}); using {} cached posts", err, items.len());
                    Ok(items)
                }
                None => Err(err),
            },
        }
    }
}
