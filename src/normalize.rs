//! Field-level cleaning of raw listing text into typed values. Every parser
//! here is total: unusable input becomes `None`, never an error.

use std::sync::OnceLock;

use regex::Regex;

/// Fixed BGN/EUR peg.
pub const EUR_TO_BGN: f64 = 1.95583;

/// Year threshold for calling a listing a new build.
pub const NEWBUILD_YEAR: i32 = 2010;

fn numeric_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([\d\s.,]+)").unwrap())
}

fn eur_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)€|eur|евро").unwrap())
}

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)").unwrap())
}

fn max_floor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:от|/)\s*(\d+)").unwrap())
}

fn new_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bнов[ао]?\b").unwrap())
}

fn parse_numeric_run(text: &str) -> Option<f64> {
    let m = numeric_run_re().find(text)?;
    let cleaned = m.as_str().replace(' ', "").replace(',', ".");
    cleaned.parse().ok()
}

/// Price in EUR. Currency is read off the text (`€`/`EUR`/`евро`), anything
/// else is taken as BGN and converted at the fixed rate.
pub fn parse_price(raw: &str) -> Option<f64> {
    let amount = parse_numeric_run(raw)?;
    if eur_marker_re().is_match(raw) {
        Some(amount)
    } else {
        Some(amount / EUR_TO_BGN)
    }
}

/// Area in square meters from strings like `"75 кв.м"`.
pub fn parse_area(raw: &str) -> Option<f64> {
    parse_numeric_run(raw)
}

/// First integer in the text, e.g. `"ет. 3 от 8"` -> 3.
pub fn parse_floor(raw: &str) -> Option<i32> {
    int_re().captures(raw)?.get(1)?.as_str().parse().ok()
}

/// Total floors: the number after `от`/`/`, else the first integer.
pub fn parse_max_floor(raw: &str) -> Option<i32> {
    if let Some(caps) = max_floor_re().captures(raw) {
        return caps[1].parse().ok();
    }
    parse_floor(raw)
}

/// Ground/top-floor flags. A missing floor is treated as not ground.
pub fn floor_flags(floor: Option<i32>, max_floor: Option<i32>) -> (bool, bool) {
    let is_ground = floor.is_some_and(|f| f <= 0);
    let is_top = matches!((floor, max_floor), (Some(f), Some(m)) if f == m);
    (is_ground, is_top)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heating {
    District,
    Gas,
    Electric,
    Other,
}

pub fn map_heating(raw: &str) -> Heating {
    let t = raw.to_lowercase();
    if t.contains("тец") {
        Heating::District
    } else if t.contains("газ") {
        Heating::Gas
    } else if t.contains("електр") || t.contains("ток") || t.contains("клим") {
        Heating::Electric
    } else {
        Heating::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construction {
    Panel,
    Epk,
    Brick,
    Other,
}

pub fn map_construction(raw: &str) -> Construction {
    let t = raw.to_lowercase();
    if t.contains("панел") {
        Construction::Panel
    } else if t.contains("епк") || t.contains("пк") {
        Construction::Epk
    } else if t.contains("тухл") {
        Construction::Brick
    } else {
        Construction::Other
    }
}

/// New-build inference. An explicit construction year wins; without one,
/// panel/EPK buildings are old stock, and brick only counts as new when the
/// description says so.
pub fn derive_newbuild(
    year: Option<i32>,
    construction: Option<&str>,
    desc: Option<&str>,
) -> bool {
    if let Some(y) = year {
        return y >= NEWBUILD_YEAR;
    }
    match construction.map(map_construction) {
        Some(Construction::Panel) | Some(Construction::Epk) => false,
        Some(Construction::Brick) => desc.is_some_and(|d| new_keyword_re().is_match(d)),
        _ => false,
    }
}

/// Strip the redundant city prefix off district strings.
pub fn standardize_district(raw: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)^(?:гр\.?|град)\s*София[, ]*").unwrap());
    re.replace(raw, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euro_price_parses_directly() {
        assert_eq!(parse_price("120 000 €"), Some(120000.0));
    }

    #[test]
    fn leva_price_converts_at_fixed_rate() {
        let eur = parse_price("235 000 лв.").unwrap();
        assert!((eur - 235000.0 / EUR_TO_BGN).abs() < 1e-6);
    }

    #[test]
    fn spelled_out_euro_detected() {
        assert_eq!(parse_price("150000 евро"), Some(150000.0));
    }

    #[test]
    fn unparsable_price_is_none() {
        assert_eq!(parse_price("по договаряне"), None);
    }

    #[test]
    fn area_with_unit_parses() {
        assert_eq!(parse_area("75 кв.м"), Some(75.0));
        assert_eq!(parse_area("82,5 кв.м"), Some(82.5));
        assert_eq!(parse_area("голяма"), None);
    }

    #[test]
    fn floor_and_max_floor_parse() {
        assert_eq!(parse_floor("ет. 3 от 8"), Some(3));
        assert_eq!(parse_max_floor("ет. 3 от 8"), Some(8));
        assert_eq!(parse_max_floor("3 / 12"), Some(12));
        assert_eq!(parse_max_floor("5"), Some(5));
        assert_eq!(parse_floor("партер"), None);
    }

    #[test]
    fn floor_flag_derivation() {
        assert_eq!(floor_flags(Some(0), Some(8)), (true, false));
        assert_eq!(floor_flags(Some(8), Some(8)), (false, true));
        assert_eq!(floor_flags(Some(3), Some(8)), (false, false));
        assert_eq!(floor_flags(None, Some(8)), (false, false));
    }

    #[test]
    fn heating_maps_to_closed_vocabulary() {
        assert_eq!(map_heating("ТЕЦ: ДА"), Heating::District);
        assert_eq!(map_heating("газ"), Heating::Gas);
        assert_eq!(map_heating("климатици"), Heating::Electric);
        assert_eq!(map_heating("камина"), Heating::Other);
    }

    #[test]
    fn construction_maps_to_closed_vocabulary() {
        assert_eq!(map_construction("Панел"), Construction::Panel);
        assert_eq!(map_construction("ЕПК"), Construction::Epk);
        assert_eq!(map_construction("Тухла"), Construction::Brick);
        assert_eq!(map_construction("гредоред"), Construction::Other);
    }

    #[test]
    fn newbuild_by_year_threshold() {
        assert!(derive_newbuild(Some(2012), None, None));
        assert!(!derive_newbuild(Some(2005), None, None));
    }

    #[test]
    fn newbuild_without_year_uses_construction_and_description() {
        assert!(!derive_newbuild(None, Some("Панел"), None));
        assert!(derive_newbuild(
            None,
            Some("Тухла"),
            Some("Чисто нова сграда с акт 16")
        ));
        assert!(!derive_newbuild(
            None,
            Some("Тухла"),
            Some("стара кооперация")
        ));
        assert!(!derive_newbuild(None, None, Some("нова сграда")));
    }

    #[test]
    fn district_prefix_stripped() {
        assert_eq!(standardize_district("гр. София, Люлин 5"), "Люлин 5");
        assert_eq!(standardize_district("град София Лозенец"), "Лозенец");
        assert_eq!(standardize_district("Младост 1"), "Младост 1");
    }
}
