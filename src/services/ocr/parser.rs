use regex::Regex;
use std::sync::OnceLock;

fn digits() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"[0-9]+").expect("digit pattern is valid"))
}

/// Parse the capture percentage from OCR text
/// Expected format: "87%" or "capture 87 %" or noise around the number
/// Takes the first run of digits, capped at 100; anything without digits is 0
pub fn parse_capture_chance(text: &str) -> u32 {
    match digits().find(text) {
        // Only overflow can fail on an ASCII digit run
        Some(m) => m.as_str().parse::<u32>().map_or(100, |value| value.min(100)),
        None => 0,
    }
}
