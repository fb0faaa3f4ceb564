//! Combine the per-category raw CSVs into a single dataset for cleaning.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::crawler::models::RawListing;

/// Per-category output files that actually exist for `prefix`, in room
/// order (same naming the crawl driver writes).
pub fn raw_paths(prefix: &str, rooms_list: &[u8]) -> Vec<PathBuf> {
    rooms_list
        .iter()
        .map(|rooms| PathBuf::from(format!("{prefix}{rooms}_pilot.csv")))
        .filter(|p| p.exists())
        .collect()
}

/// Load the given raw CSVs and concatenate them, dropping rows that repeat
/// the same url/price/area key (the same listing can surface under more
/// than one category, or twice across pilot runs).
pub fn load_and_combine(paths: &[PathBuf]) -> Result<Vec<RawListing>> {
    let mut combined = Vec::new();
    let mut keys: HashSet<(String, Option<String>, Option<String>)> = HashSet::new();

    for path in paths {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("reading {}", path.display()))?;
        for row in reader.deserialize::<RawListing>() {
            let listing = match row {
                Ok(l) => l,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable row");
                    continue;
                }
            };
            let key = (
                listing.url.clone(),
                listing.price_raw.clone(),
                listing.area_raw.clone(),
            );
            if keys.insert(key) {
                combined.push(listing);
            }
        }
    }

    info!(rows = combined.len(), files = paths.len(), "combined raw files");
    Ok(combined)
}

pub fn write_combined(listings: &[RawListing], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("writing {}", path.display()))?;
    for listing in listings {
        writer.serialize(listing)?;
    }
    writer.flush()?;
    Ok(())
}
