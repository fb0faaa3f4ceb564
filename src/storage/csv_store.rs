use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::crawler::models::RawListing;

/// Append-only CSV sink. Each row is flushed before the next fetch starts,
/// so an interrupted run loses at most the listing in flight, and a restart
/// rebuilds its dedup state from the same file.
pub struct CsvStore {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let is_new = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;

        // a torn final row may be missing its newline; appending straight
        // after it would glue two records onto one line
        if !is_new && !ends_with_newline(&path)? {
            file.write_all(b"\n")?;
        }

        // serde headers come from RawListing's field order; suppress them on
        // an existing file
        let writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);

        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize one listing and flush it to disk. The flush is the
    /// durability point for crash-resume.
    pub fn append(&mut self, listing: &RawListing) -> Result<()> {
        self.writer.serialize(listing)?;
        self.writer.flush()?;
        Ok(())
    }

    /// URLs already persisted at `path`; a missing file means no prior
    /// crawl state. A crash mid-flush can leave a torn final row; such a
    /// row is not a durable record, so it is skipped and its listing gets
    /// re-fetched on the next run.
    pub fn seen_urls(path: impl AsRef<Path>) -> Result<HashSet<String>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(HashSet::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let headers = reader.headers()?.clone();
        let url_idx = headers.iter().position(|h| h == "url").unwrap_or(0);

        let mut urls = HashSet::new();
        for row in reader.records() {
            let record = match row {
                Ok(r) => r,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable row");
                    continue;
                }
            };
            if record.len() < headers.len() {
                warn!(path = %path.display(), fields = record.len(), "skipping torn row");
                continue;
            }
            match record.get(url_idx) {
                Some(url) if !url.is_empty() => {
                    urls.insert(url.to_string());
                }
                _ => {}
            }
        }
        info!(count = urls.len(), path = %path.display(), "rehydrated seen urls");
        Ok(urls)
    }
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    if file.seek(SeekFrom::End(-1)).is_err() {
        return Ok(true); // empty file
    }
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(url: &str) -> RawListing {
        RawListing {
            url: url.to_string(),
            listing_id: Some("1a100".to_string()),
            source: "imot.bg".to_string(),
            price_raw: Some("155 000 €".to_string()),
            area_raw: Some("72 кв.м".to_string()),
            rooms: 2,
            district_raw: Some("град София, Люлин 5".to_string()),
            floor_raw: Some("3".to_string()),
            max_floor_raw: Some("8".to_string()),
            heat_raw: Some("ТЕЦ: ДА".to_string()),
            construction_raw: Some("Панел".to_string()),
            year_raw: Some("1982".to_string()),
            desc_text: Some("Южно изложение, до метро.\nБез тежести, \"чиста\" сделка.".to_string()),
        }
    }

    #[test]
    fn header_written_once_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw_room2_pilot.csv");

        {
            let mut store = CsvStore::open(&path).unwrap();
            store.append(&listing("https://www.imot.bg/obiava-1")).unwrap();
        }
        {
            let mut store = CsvStore::open(&path).unwrap();
            store.append(&listing("https://www.imot.bg/obiava-2")).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.matches("url,listing_id,source").count(), 1);

        let urls = CsvStore::seen_urls(&path).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://www.imot.bg/obiava-1"));
        assert!(urls.contains("https://www.imot.bg/obiava-2"));
    }

    #[test]
    fn cyrillic_and_quotes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut store = CsvStore::open(&path).unwrap();
        store.append(&listing("https://www.imot.bg/obiava-9")).unwrap();
        drop(store);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<RawListing> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].district_raw.as_deref(), Some("град София, Люлин 5"));
        assert!(rows[0].desc_text.as_deref().unwrap().contains("\"чиста\""));
    }

    #[test]
    fn torn_final_row_does_not_poison_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw_room2_pilot.csv");

        let mut store = CsvStore::open(&path).unwrap();
        store.append(&listing("https://www.imot.bg/obiava-1")).unwrap();
        drop(store);

        // a crash mid-flush leaves the last row cut off mid-record
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all("https://www.imot.bg/obiava-torn,1a2,imot.bg,155".as_bytes())
            .unwrap();
        drop(file);

        let urls = CsvStore::seen_urls(&path).unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://www.imot.bg/obiava-1"));
        // the torn listing stays eligible for re-fetch
        assert!(!urls.contains("https://www.imot.bg/obiava-torn"));

        // and the sink still appends past the garbage
        let mut store = CsvStore::open(&path).unwrap();
        store.append(&listing("https://www.imot.bg/obiava-2")).unwrap();
        drop(store);
        let urls = CsvStore::seen_urls(&path).unwrap();
        assert!(urls.contains("https://www.imot.bg/obiava-2"));
    }

    #[test]
    fn missing_file_means_no_prior_state() {
        let dir = tempfile::tempdir().unwrap();
        let urls = CsvStore::seen_urls(dir.path().join("never_written.csv")).unwrap();
        assert!(urls.is_empty());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/raw/raw_room1_pilot.csv");
        let mut store = CsvStore::open(&path).unwrap();
        store.append(&listing("https://www.imot.bg/obiava-3")).unwrap();
        assert!(path.exists());
    }
}
