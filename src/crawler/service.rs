use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::models::ListingCard;
use crate::crawler::pagination::PageWalker;
use crate::crawler::parser;
use crate::storage::CsvStore;

/// Per-category crawl orchestration: walk result pages, skip already-seen
/// listings, fetch and parse the rest, append each row before moving on.
pub struct CrawlService<'a> {
    cfg: Config,
    fetcher: &'a dyn PageFetcher,
    output_path: PathBuf,
}

impl<'a> CrawlService<'a> {
    pub fn new(cfg: Config, fetcher: &'a dyn PageFetcher, output_path: impl Into<PathBuf>) -> Self {
        Self {
            cfg,
            fetcher,
            output_path: output_path.into(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Crawl one room category. A page-level transport failure aborts the
    /// category; a single listing's failure only skips that listing and
    /// leaves it eligible for the next run.
    pub async fn run_category(&self, rooms: u8) -> anyhow::Result<usize> {
        let base_url = self.cfg.category_url(rooms)?.to_string();
        let mut seen = CsvStore::seen_urls(&self.output_path)?;
        let mut store = CsvStore::open(&self.output_path)?;

        let mut walker =
            PageWalker::new(self.fetcher, base_url, self.cfg.delay, self.cfg.max_pages);
        let mut processed = 0usize;

        while let Some(page_html) = walker.next_page().await? {
            let page = walker.current_page();
            let cards = parser::extract_listing_cards(&page_html);
            info!(
                rooms,
                page,
                cards = cards.len(),
                seen = seen.len(),
                "result page parsed"
            );

            // an unbounded walk has no other exhaustion signal
            if cards.is_empty() && self.cfg.max_pages.is_none() {
                info!(rooms, page, "empty page, stopping walk");
                break;
            }

            for card in &cards {
                if seen.contains(&card.url) {
                    continue;
                }
                match self.process_card(rooms, card, &mut store).await {
                    Ok(()) => {
                        seen.insert(card.url.clone());
                        processed += 1;
                        if self.cfg.log_every > 0 && processed % self.cfg.log_every == 0 {
                            info!(rooms, processed, "progress");
                        }
                    }
                    Err(e) => {
                        // not marked seen, so the next run retries it
                        warn!(rooms, url = %card.url, error = %e, "failed to process listing");
                    }
                }
                tokio::time::sleep(self.cfg.delay).await;
            }
        }

        info!(rooms, processed, "category done");
        Ok(processed)
    }

    async fn process_card(
        &self,
        rooms: u8,
        card: &ListingCard,
        store: &mut CsvStore,
    ) -> anyhow::Result<()> {
        let detail_html = self.fetcher.fetch_text(&card.url).await?;
        let mut listing = parser::parse_listing_detail(&detail_html, rooms);
        listing.merge_card(card);
        store.append(&listing)?;
        Ok(())
    }

    /// Run every configured category in sequence; one category failing does
    /// not stop the others.
    pub async fn run_all(
        cfg: &Config,
        fetcher: &dyn PageFetcher,
        output_path_for: impl Fn(u8) -> PathBuf,
    ) -> usize {
        let rooms_list: Vec<u8> = cfg.category_urls.keys().copied().collect();
        let mut total = 0usize;
        for rooms in rooms_list {
            let output = output_path_for(rooms);
            info!(rooms, output = %output.display(), "category start");
            let service = CrawlService::new(cfg.clone(), fetcher, output);
            match service.run_category(rooms).await {
                Ok(n) => total += n,
                Err(e) => error!(rooms, error = %e, "category failed"),
            }
        }
        total
    }
}
