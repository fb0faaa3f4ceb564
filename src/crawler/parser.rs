use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::config::BASE_URL;
use crate::crawler::models::{ListingCard, RawListing, SOURCE};

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn rooms_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Продава\s+(\d)").unwrap())
}

fn listing_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Обява:\s*(\w+)").unwrap())
}

fn first_int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)").unwrap())
}

fn max_floor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:от|/)\s*(\d+)").unwrap())
}

fn construction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(Тухла|Панел|ЕПК|ПК)").unwrap())
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(19\d{2}|20\d{2})").unwrap())
}

/// All visible text under `el`, whitespace-collapsed.
fn normalized_text(el: ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text under `el` as trimmed non-empty lines, one per text node.
fn text_lines(el: ElementRef) -> Vec<String> {
    el.text()
        .flat_map(|t| t.split('\n'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn absolutize(href: &str) -> Option<String> {
    Url::parse(BASE_URL)
        .ok()?
        .join(href)
        .ok()
        .map(|u| u.to_string())
}

/// Pull listing cards out of one result page.
///
/// Offers live under `div.ads2023` as `div.item` blocks with the link at
/// `div.text div.zaglavie a.title`. A missing container is not fatal: the
/// page may legitimately be empty, or the markup may have moved.
pub fn extract_listing_cards(page: &str) -> Vec<ListingCard> {
    let doc = Html::parse_document(page);

    let container_sel = sel("div.ads2023");
    let Some(container) = doc.select(&container_sel).next() else {
        warn!("ads2023 container not found on results page");
        return Vec::new();
    };

    let item_sel = sel("div.item");
    let title_sel = sel("div.text div.zaglavie a.title[href]");
    let location_sel = sel("location");
    let price_sel = sel("div.price div");

    let mut cards = Vec::new();
    for item in container.select(&item_sel) {
        // items without a title link are ads or filler, skip quietly
        let Some(title) = item.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = title.value().attr("href") else {
            continue;
        };
        if !href.contains("/obiava-") {
            continue;
        }
        let Some(url) = absolutize(href) else {
            continue;
        };

        let listing_id = item.value().attr("id").map(str::to_string);

        let district_raw = title
            .select(&location_sel)
            .next()
            .map(normalized_text)
            .filter(|s| !s.is_empty());

        let price_raw = item
            .select(&price_sel)
            .next()
            .map(normalized_text)
            .filter(|s| !s.is_empty());

        cards.push(ListingCard {
            url,
            listing_id,
            district_raw,
            price_raw,
        });
    }
    cards
}

fn search_any<'t>(text: &'t str, patterns: &[&str]) -> Option<&'t str> {
    for pat in patterns {
        let re = Regex::new(&format!("(?i){pat}")).expect("static pattern");
        if let Some(m) = re.find(text) {
            return Some(m.as_str());
        }
    }
    None
}

/// Extract raw fields from a listing detail page. Every lookup is
/// best-effort and independent; absence collapses to `None`, never an
/// error. `url` and `listing_id` overlays are the caller's job.
pub fn parse_listing_detail(page: &str, fallback_rooms: u8) -> RawListing {
    let doc = Html::parse_document(page);
    let text_main = normalized_text(doc.root_element());

    let mut rooms = fallback_rooms;
    let mut listing_id = None;
    let mut district_raw = None;
    let mut price_raw = None;
    let mut area_raw = None;
    let mut floor_raw = None;
    let mut max_floor_raw = None;
    let mut construction_raw = None;
    let mut year_raw: Option<String> = None;
    let mut heat_entries: Vec<String> = Vec::new();

    let contacts_sel = sel("div.ad2023 div.right div.sticky div.contactsBox");
    if let Some(contacts) = doc.select(&contacts_sel).next() {
        let title_sel = sel("div.obTitle h1");
        if let Some(h1) = contacts.select(&title_sel).next() {
            let heading = normalized_text(h1);
            if let Some(caps) = rooms_re().captures(&heading) {
                if let Ok(n) = caps[1].parse() {
                    rooms = n;
                }
            }
            let div_sel = sel("div");
            if let Some(d) = h1.select(&div_sel).next() {
                let t = normalized_text(d);
                if !t.is_empty() {
                    district_raw = Some(t);
                }
            }
            let span_sel = sel("span");
            if let Some(s) = h1.select(&span_sel).next() {
                let t = normalized_text(s);
                if let Some(caps) = listing_id_re().captures(&t) {
                    listing_id = Some(caps[1].to_string());
                }
            }
        }

        // price sits in a div whose class merely contains "price" in some
        // casing; prefer the line carrying the euro amount
        let div_sel = sel("div");
        let price_block = contacts.select(&div_sel).find(|el| {
            el.value()
                .attr("class")
                .is_some_and(|c| c.to_lowercase().contains("price"))
        });
        if let Some(block) = price_block {
            let lines = text_lines(block);
            price_raw = lines
                .iter()
                .find(|l| l.contains('€') || l.contains("EUR"))
                .or_else(|| lines.first())
                .cloned();
        }
    }

    let params_sel = sel("div.adParams > div");
    for field in doc.select(&params_sel) {
        let full = normalized_text(field);
        let (label, val) = match full.split_once(':') {
            Some((l, v)) => (l.trim().to_string(), v.trim().to_string()),
            None => (full.trim().to_string(), String::new()),
        };
        match label.as_str() {
            "Площ" => area_raw = Some(val),
            "Етаж" => {
                if let Some(caps) = first_int_re().captures(&val) {
                    floor_raw = Some(caps[1].to_string());
                }
                if let Some(caps) = max_floor_re().captures(&val) {
                    max_floor_raw = Some(caps[1].to_string());
                }
            }
            // the site spells the label two ways, one with a Latin E
            "Газ" | "ТЕЦ" | "ТEЦ" => heat_entries.push(format!("{label}: {val}")),
            _ if label.contains("Строителство") => {
                if let Some(caps) = construction_re().captures(&val) {
                    construction_raw = Some(caps[1].to_string());
                }
                if year_raw.is_none() {
                    if let Some(caps) = year_re().captures(&val) {
                        year_raw = Some(caps[1].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    let heat_raw = if heat_entries.is_empty() {
        search_any(&text_main, &["ТЕЦ", "газ", "електр", "клим", "парно"])
            .map(str::to_string)
    } else {
        Some(heat_entries.join("; "))
    };

    let desc_sel = sel("div.borderBox");
    let desc_text = match doc.select(&desc_sel).next() {
        Some(el) => {
            let t = normalized_text(el);
            if t.is_empty() {
                None
            } else {
                Some(t)
            }
        }
        None => {
            let prefix: String = text_main.chars().take(2000).collect();
            if prefix.is_empty() {
                None
            } else {
                Some(prefix)
            }
        }
    };

    if year_raw.is_none() {
        if let Some(desc) = desc_text.as_deref() {
            if let Some(caps) = year_re().captures(desc) {
                year_raw = Some(caps[1].to_string());
            }
        }
    }

    RawListing {
        url: String::new(),
        listing_id,
        source: SOURCE.to_string(),
        price_raw,
        area_raw,
        rooms,
        district_raw,
        floor_raw,
        max_floor_raw,
        heat_raw,
        construction_raw,
        year_raw,
        desc_text,
    }
}
