//! Reformatter for the official per-district price report: a plaintext
//! token-based dump where each district is followed by six value lines
//! (price and €/m² for 1/2/3-room stock, then a combined line).

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

/// Header/label lines interleaved with the data; any line containing one of
/// these is noise.
const SKIP_TOKENS: [&str; 7] = [
    "Едностайни",
    "Двустайни",
    "Тристайни",
    "Район",
    "Цена",
    "€/кв.м",
    "Общо",
];

const VALUES_PER_DISTRICT: usize = 6;

/// One district's reference prices, kept as strings because the report uses
/// `-` for missing cells.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DistrictPrices {
    pub district: String,
    pub price_1: String,
    pub ppm2_1: String,
    pub price_2: String,
    pub ppm2_2: String,
    pub price_3: String,
    pub ppm2_3: String,
    pub ppm2_all: String,
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

/// Digit runs in a line, concatenated (the report groups thousands with
/// spaces or tabs).
fn joined_digits(line: &str) -> Option<String> {
    let joined: String = digits_re()
        .find_iter(&line.replace('\t', " "))
        .map(|m| m.as_str())
        .collect();
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// First one or two digit runs separately, for the combined-metric line.
fn first_two_tokens(line: &str) -> Vec<String> {
    digits_re()
        .find_iter(&line.replace('\t', " "))
        .take(2)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn parse_official_report(report: &str) -> Vec<DistrictPrices> {
    let clean: Vec<&str> = report
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !SKIP_TOKENS.iter().any(|tok| l.contains(tok)))
        .collect();

    let mut records = Vec::new();
    let mut i = 0;
    while i < clean.len() {
        let district = clean[i].to_string();
        i += 1;
        let block_end = (i + VALUES_PER_DISTRICT).min(clean.len());
        let block = &clean[i..block_end];
        i = block_end;

        let mut vals = vec!["-".to_string(); 7];
        for (idx, line) in block.iter().enumerate() {
            if line.trim() == "-" {
                continue;
            }
            if idx < 5 {
                if let Some(v) = joined_digits(line) {
                    vals[idx] = v;
                }
            } else {
                let tokens = first_two_tokens(line);
                if let Some(first) = tokens.first() {
                    vals[5] = first.clone();
                    vals[6] = tokens.get(1).cloned().unwrap_or_else(|| first.clone());
                }
            }
        }

        records.push(DistrictPrices {
            district,
            price_1: vals[0].clone(),
            ppm2_1: vals[1].clone(),
            price_2: vals[2].clone(),
            ppm2_2: vals[3].clone(),
            price_3: vals[4].clone(),
            ppm2_3: vals[5].clone(),
            ppm2_all: vals[6].clone(),
        });
    }
    records
}

pub fn write_official_csv(records: &[DistrictPrices], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("writing {}", path.display()))?;
    for rec in records {
        writer.serialize(rec)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Район\tЦена\t€/кв.м

Люлин
Едностайни
98 500
1 650
Двустайни
132 000
1 720
Тристайни
160 000
1745\t2010

Лозенец
215 000
2 950
298 000
3 100
-
3050
";

    #[test]
    fn groups_district_blocks() {
        let records = parse_official_report(REPORT);
        assert_eq!(records.len(), 2);

        let lyulin = &records[0];
        assert_eq!(lyulin.district, "Люлин");
        assert_eq!(lyulin.price_1, "98500");
        assert_eq!(lyulin.ppm2_1, "1650");
        assert_eq!(lyulin.price_2, "132000");
        assert_eq!(lyulin.ppm2_2, "1720");
        assert_eq!(lyulin.price_3, "160000");
        // combined line carries both per-room and overall €/m²
        assert_eq!(lyulin.ppm2_3, "1745");
        assert_eq!(lyulin.ppm2_all, "2010");
    }

    #[test]
    fn dash_lines_stay_missing() {
        let records = parse_official_report(REPORT);
        let lozenets = &records[1];
        assert_eq!(lozenets.district, "Лозенец");
        assert_eq!(lozenets.price_3, "-");
        // single token on the combined line doubles for both columns
        assert_eq!(lozenets.ppm2_3, "3050");
        assert_eq!(lozenets.ppm2_all, "3050");
    }

    #[test]
    fn csv_header_matches_flat_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("official_sale_flat_final.csv");
        write_official_csv(&parse_official_report(REPORT), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with(
            "district,price_1,ppm2_1,price_2,ppm2_2,price_3,ppm2_3,ppm2_all"
        ));
    }
}
