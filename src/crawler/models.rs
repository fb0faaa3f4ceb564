use serde::{Deserialize, Serialize};

pub const SOURCE: &str = "imot.bg";

/// Listing summary parsed from one result page, used to reach the detail page.
#[derive(Debug, Clone)]
pub struct ListingCard {
    pub url: String,
    pub listing_id: Option<String>,
    pub district_raw: Option<String>,
    pub price_raw: Option<String>,
}

/// One persisted row. Field order here is the CSV column order; everything but
/// `url`, `source` and `rooms` is raw free text left for downstream cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub url: String,
    pub listing_id: Option<String>,
    pub source: String,
    pub price_raw: Option<String>,
    pub area_raw: Option<String>,
    pub rooms: u8,
    pub district_raw: Option<String>,
    pub floor_raw: Option<String>,
    pub max_floor_raw: Option<String>,
    pub heat_raw: Option<String>,
    pub construction_raw: Option<String>,
    pub year_raw: Option<String>,
    pub desc_text: Option<String>,
}

impl RawListing {
    /// Detail page is authoritative; the card's headline values only fill
    /// fields the detail parse left empty.
    pub fn merge_card(&mut self, card: &ListingCard) {
        self.url = card.url.clone();
        if self.listing_id.is_none() {
            self.listing_id = card.listing_id.clone();
        }
        if self.price_raw.is_none() {
            self.price_raw = card.price_raw.clone();
        }
        if self.district_raw.is_none() {
            self.district_raw = card.district_raw.clone();
        }
    }
}
