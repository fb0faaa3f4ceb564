use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::crawler::fetcher::PageFetcher;

/// Address for page `n` of a category search: imot.bg paginates with a
/// `/p-{n}` path segment inserted before any query string; page 1 is the
/// canonical URL itself.
pub fn page_url(base: &str, page: u32) -> String {
    let (prefix, query) = match base.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (base, None),
    };
    let path = if page <= 1 {
        prefix.to_string()
    } else {
        format!("{prefix}/p-{page}")
    };
    match query {
        Some(q) => format!("{path}?{q}"),
        None => path,
    }
}

/// Lazily walks a category's result pages in order, pacing between fetches.
/// Any transport error ends the walk; partial-page retry is out of scope for
/// a pilot-grade tool.
pub struct PageWalker<'a> {
    fetcher: &'a dyn PageFetcher,
    base_url: String,
    delay: Duration,
    max_pages: Option<u32>,
    page_num: u32,
}

impl<'a> PageWalker<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        base_url: impl Into<String>,
        delay: Duration,
        max_pages: Option<u32>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            delay,
            max_pages,
            page_num: 1,
        }
    }

    /// Page number of the most recently yielded page, 0 before the first.
    pub fn current_page(&self) -> u32 {
        self.page_num.saturating_sub(1)
    }

    /// Fetch and yield the next result page, or `None` once the cap is hit.
    pub async fn next_page(&mut self) -> anyhow::Result<Option<String>> {
        if let Some(max) = self.max_pages {
            if self.page_num > max {
                return Ok(None);
            }
        }
        if self.page_num > 1 {
            tokio::time::sleep(self.delay).await;
        }
        let url = page_url(&self.base_url, self.page_num);
        debug!(url = %url, page = self.page_num, "fetching result page");
        let text = self.fetcher.fetch_text(&url).await?;
        self.page_num += 1;
        Ok(Some(text))
    }
}

fn page_param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"page=(\d+)").unwrap())
}

fn page_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/p-(\d+)").unwrap())
}

/// Derive the next-page URL when resuming from an arbitrary URL rather than
/// walking the `/p-{n}` pattern. Ordered fallbacks, most explicit first:
/// a declared `rel=next` link, a localized "next" anchor, then URL surgery.
pub fn next_page_url(html: &str, current_url: &str) -> Option<String> {
    let doc = Html::parse_document(html);

    let link_next = Selector::parse("link[rel=\"next\"]").unwrap();
    if let Some(href) = doc
        .select(&link_next)
        .find_map(|el| el.value().attr("href"))
    {
        return resolve(current_url, href);
    }

    let a_next = Selector::parse("a[rel=\"next\"]").unwrap();
    if let Some(href) = doc.select(&a_next).find_map(|el| el.value().attr("href")) {
        return resolve(current_url, href);
    }

    let anchors = Selector::parse("a[href]").unwrap();
    for a in doc.select(&anchors) {
        let text = a.text().collect::<String>().trim().to_lowercase();
        if text.contains("следващ") {
            if let Some(href) = a.value().attr("href") {
                return resolve(current_url, href);
            }
        }
    }

    if let Some(caps) = page_param_re().captures(current_url) {
        let page: u32 = caps[1].parse().ok()?;
        return Some(
            page_param_re()
                .replace(current_url, format!("page={}", page + 1))
                .into_owned(),
        );
    }

    if let Some(caps) = page_segment_re().captures(current_url) {
        let page: u32 = caps[1].parse().ok()?;
        return Some(
            page_segment_re()
                .replace(current_url, format!("/p-{}", page + 1))
                .into_owned(),
        );
    }

    if current_url.contains('?') {
        Some(format!("{current_url}&page=2"))
    } else {
        Some(format!("{current_url}?page=2"))
    }
}

fn resolve(current_url: &str, href: &str) -> Option<String> {
    let base = Url::parse(current_url).ok()?;
    Some(base.join(href).ok()?.to_string())
}
