use std::collections::BTreeMap;
use std::time::Duration;

pub const BASE_URL: &str = "https://www.imot.bg";

pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/118.0 Safari/537.36";

/// Crawl settings for one run, passed explicitly into every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Canonical search URL per room category (1/2/3).
    pub category_urls: BTreeMap<u8, String>,
    pub user_agent: String,
    pub request_timeout: Duration,
    /// Pause between every outbound request, pages and details alike.
    pub delay: Duration,
    /// Inclusive page cap per category; `None` walks until an empty page.
    pub max_pages: Option<u32>,
    /// Emit a progress line every N persisted listings.
    pub log_every: usize,
}

impl Default for Config {
    fn default() -> Self {
        let mut category_urls = BTreeMap::new();
        category_urls.insert(
            1,
            format!("{BASE_URL}/obiavi/prodazhbi/grad-sofiya/ednostaen"),
        );
        category_urls.insert(
            2,
            format!("{BASE_URL}/obiavi/prodazhbi/grad-sofiya/dvustaen"),
        );
        category_urls.insert(
            3,
            format!("{BASE_URL}/obiavi/prodazhbi/grad-sofiya/tristaen"),
        );
        Self {
            category_urls,
            user_agent: USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(15),
            delay: Duration::from_secs(1),
            max_pages: Some(2),
            log_every: 10,
        }
    }
}

impl Config {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_log_every(mut self, log_every: usize) -> Self {
        self.log_every = log_every;
        self
    }

    pub fn category_url(&self, rooms: u8) -> anyhow::Result<&str> {
        self.category_urls
            .get(&rooms)
            .map(String::as_str)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unsupported rooms={}; expected one of {:?}",
                    rooms,
                    self.category_urls.keys().collect::<Vec<_>>()
                )
            })
    }
}
