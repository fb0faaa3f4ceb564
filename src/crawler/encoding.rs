use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};

/// Decode response bytes, choosing the candidate that yields the most
/// Cyrillic characters. The site serves inconsistent or absent charset
/// declarations, so the header hint is tried but never trusted.
pub fn decode_html(bytes: &[u8], charset_hint: Option<&str>) -> String {
    let mut candidates: Vec<&'static Encoding> = Vec::with_capacity(4);

    if let Some(label) = charset_hint {
        if let Some(enc) = Encoding::for_label(label.trim().as_bytes()) {
            candidates.push(enc);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let detected = detector.guess(None, true);
    if !candidates.contains(&detected) {
        candidates.push(detected);
    }
    for enc in [UTF_8, WINDOWS_1251] {
        if !candidates.contains(&enc) {
            candidates.push(enc);
        }
    }

    let mut best: Option<String> = None;
    let mut best_score = i64::MIN;
    for enc in candidates {
        let (text, _, _) = enc.decode(bytes);
        let score = cyrillic_score(&text);
        if score > best_score {
            best_score = score;
            best = Some(text.into_owned());
        }
    }

    best.unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

/// Bulgarian text lives in U+0410..=U+044F. The extended Slavic block and
/// smart-punctuation runs never appear in real listings but are exactly what
/// a wrong single-byte decode of UTF-8 produces, so they count against a
/// candidate.
fn cyrillic_score(text: &str) -> i64 {
    let mut score = 0i64;
    for c in text.chars() {
        match c {
            '\u{0410}'..='\u{044F}' => score += 1,
            '\u{0400}'..='\u{040F}' | '\u{0450}'..='\u{045F}' => score -= 1,
            '\u{2018}'..='\u{203A}' => score -= 1,
            '\u{FFFD}' => score -= 1,
            _ => {}
        }
    }
    score
}
