//! Shared text heuristics for the extraction pipeline.
//!
//! Everything here is pure: regex/pattern passes over text that was already
//! captured from the page, so every heuristic can be exercised against
//! recorded fixtures without a live browser.

use aho_corasick::AhoCorasick;
use chrono::NaiveDate;
use regex::Regex;
use scraper::Html;
use std::sync::OnceLock;
use tracing::debug;

use crate::core::error::ScoutError;

// ── Marker phrases ───────────────────────────────────────────────────────────

/// Page/row text meaning the business cabin has no award seats at all.
const NO_TICKETS_PHRASES: &[&str] = &[
    "Билетов класса Бизнес нет в наличии",
    "Рейсы не найдены",
];

/// Phrases marking an itinerary as connecting even with one flight number.
const TRANSFER_PHRASES: &[&str] = &["Пересадка", "пересадка"];

/// Route context that switches the regional-special upgrade rule on.
const SPECIAL_REGION_PHRASES: &[&str] = &["KGD", "Калининград", "Kaliningrad"];

static NO_TICKETS_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
static TRANSFER_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();
static SPECIAL_REGION_MATCHER: OnceLock<AhoCorasick> = OnceLock::new();

pub fn has_no_tickets_marker(text: &str) -> bool {
    NO_TICKETS_MATCHER
        .get_or_init(|| AhoCorasick::new(NO_TICKETS_PHRASES).expect("valid marker phrases"))
        .is_match(text)
}

pub fn has_transfer_marker(text: &str) -> bool {
    TRANSFER_MATCHER
        .get_or_init(|| AhoCorasick::new(TRANSFER_PHRASES).expect("valid marker phrases"))
        .is_match(text)
}

pub fn has_special_region_marker(text: &str) -> bool {
    SPECIAL_REGION_MATCHER
        .get_or_init(|| AhoCorasick::new(SPECIAL_REGION_PHRASES).expect("valid marker phrases"))
        .is_match(text)
}

// ── Regex passes ─────────────────────────────────────────────────────────────

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{2}:\d{2}").expect("valid regex"))
}

fn flight_no_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"SU\s*\d{4}").expect("valid regex"))
}

/// `"от 60 000 ¥ и 11 369 ₴"` → the two number groups. Runs on
/// whitespace-normalized single-line text.
fn price_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"от\s+(\d[\d\s]*).*?и\s+(\d[\d\s]*)").expect("valid regex"))
}

fn seats_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:Доступно|Свободных)\s+мест.*?:?\s*(\d+)").expect("valid regex")
    })
}

/// Russian long-form date: `19 февраля 2026`.
fn long_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(\d{1,2})\s+(января|февраля|марта|апреля|мая|июня|июля|августа|сентября|октября|ноября|декабря)\s+(\d{4})",
        )
        .expect("valid regex")
    })
}

/// Departure-time + airport-code pair glued the way the booking page renders
/// them (`22:35SVOB NOZ06:55` — terminal letters ride along with the code).
fn route_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d{2}:\d{2}\s*([A-Z]{3})(?:[A-Z0-9]*)?\s+([A-Z]{3})(?:[A-Z0-9]*)?")
            .expect("valid regex")
    })
}

/// First `HH:MM`-shaped substring, if any.
pub fn first_departure_time(text: &str) -> Option<String> {
    time_re().find(text).map(|m| m.as_str().to_string())
}

/// All carrier flight-number tokens, normalized (`SU 1459` → `SU1459`),
/// unique, first-seen order preserved.
pub fn flight_numbers(text: &str) -> Vec<String> {
    let raw: Vec<String> = flight_no_re()
        .find_iter(text)
        .map(|m| m.as_str().replace(' ', ""))
        .collect();
    dedup_preserve_order(raw)
}

/// All `(miles, surcharge)` pairs in document order.
pub fn price_pairs(text: &str) -> Vec<(u64, u64)> {
    price_pair_re()
        .captures_iter(text)
        .filter_map(|c| {
            let miles = clean_int(&c[1]);
            let surcharge = clean_int(&c[2]);
            match (miles, surcharge) {
                (Some(m), Some(s)) => Some((m, s)),
                _ => {
                    debug!("price pair match did not survive digit cleanup: {:?}", &c[0]);
                    None
                }
            }
        })
        .collect()
}

/// Single `(miles, surcharge)` pair from one price cell.
pub fn price_from_cell(cell_text: &str) -> Option<(u64, u64)> {
    let normalized = normalize_spaces(cell_text);
    price_pairs(&normalized).into_iter().next()
}

pub fn seat_count(text: &str) -> Option<u32> {
    seats_re()
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
}

/// All Russian long-form dates, converted to `DD.MM.YYYY`, document order.
pub fn long_dates(text: &str) -> Vec<String> {
    long_date_re()
        .captures_iter(text)
        .filter_map(|c| {
            let day: u32 = c[1].parse().ok()?;
            let month = month_number(&c[2])?;
            Some(format!("{:02}.{:02}.{}", day, month, &c[3]))
        })
        .collect()
}

/// First long-form date in the text, converted, if any.
pub fn first_long_date(text: &str) -> Option<String> {
    long_dates(text).into_iter().next()
}

/// All `(origin, destination)` code pairs recovered from time-adjacent text.
pub fn route_pairs(text: &str) -> Vec<(String, String)> {
    route_pair_re()
        .captures_iter(text)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "января" => 1,
        "февраля" => 2,
        "марта" => 3,
        "апреля" => 4,
        "мая" => 5,
        "июня" => 6,
        "июля" => 7,
        "августа" => 8,
        "сентября" => 9,
        "октября" => 10,
        "ноября" => 11,
        "декабря" => 12,
        _ => return None,
    };
    Some(n)
}

// ── Normalization helpers ────────────────────────────────────────────────────

/// Collapse every whitespace variant — including NBSP and narrow NBSP used as
/// thousands separators on the target site — into single ASCII spaces.
pub fn normalize_spaces(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[\s\u{a0}\u{202f}]+").expect("valid regex"));
    re.replace_all(text, " ").trim().to_string()
}

/// Strip everything that is not a digit and parse. `None` when nothing
/// digit-shaped remains — unresolved stays unresolved, never zero.
pub fn clean_int(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Unique values, first-seen order preserved.
pub fn dedup_preserve_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// `DD.MM.YYYY` → `YYYYMMDD` route-token date, validated as a real calendar
/// date. This is the only hard input check in the pipeline and runs before
/// any browser work.
pub fn to_route_date(date: &str) -> Result<String, ScoutError> {
    NaiveDate::parse_from_str(date.trim(), "%d.%m.%Y")
        .map(|d| d.format("%Y%m%d").to_string())
        .map_err(|_| ScoutError::InvalidDate(date.to_string()))
}

/// Visible text of an HTML fragment, one text node per line. Close enough to
/// the browser's `innerText` for every heuristic in this module.
pub fn fragment_text(html: &str) -> String {
    let doc = Html::parse_fragment(html);
    doc.root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_date_conversion() {
        assert_eq!(to_route_date("25.12.2025").unwrap(), "20251225");
        assert_eq!(to_route_date(" 01.02.2026 ").unwrap(), "20260201");
    }

    #[test]
    fn route_date_rejects_garbage_before_navigation() {
        assert!(matches!(
            to_route_date("2025-12-25"),
            Err(ScoutError::InvalidDate(_))
        ));
        assert!(matches!(
            to_route_date("32.01.2026"),
            Err(ScoutError::InvalidDate(_))
        ));
        assert!(matches!(to_route_date(""), Err(ScoutError::InvalidDate(_))));
    }

    #[test]
    fn price_cell_with_narrow_spaces() {
        // NBSP and narrow NBSP as thousands separators, as rendered live.
        let cell = "от 60\u{a0}000 ¥ и 11\u{202f}369 ₴";
        assert_eq!(price_from_cell(cell), Some((60_000, 11_369)));
    }

    #[test]
    fn price_cell_without_digits_is_none() {
        assert_eq!(price_from_cell("Мест нет"), None);
    }

    #[test]
    fn flight_numbers_dedup_keeps_first_seen_order() {
        let text = "SU 1459 далее SU1459 и обратно SU 0205";
        assert_eq!(flight_numbers(text), vec!["SU1459", "SU0205"]);
    }

    #[test]
    fn dedup_preserves_order_on_plain_tokens() {
        let input = vec![
            "SU1459".to_string(),
            "SU1459".to_string(),
            "SU205".to_string(),
        ];
        assert_eq!(dedup_preserve_order(input), vec!["SU1459", "SU205"]);
    }

    #[test]
    fn long_date_converts_russian_month() {
        assert_eq!(
            first_long_date("19 февраля 2026 г., четверг"),
            Some("19.02.2026".to_string())
        );
    }

    #[test]
    fn route_pair_survives_terminal_suffix() {
        let text = "22:35SVOB NOZ06:55";
        assert_eq!(
            route_pairs(text),
            vec![("SVO".to_string(), "NOZ".to_string())]
        );
    }

    #[test]
    fn seat_count_both_spellings() {
        assert_eq!(seat_count("Доступно мест: 4"), Some(4));
        assert_eq!(seat_count("свободных мест на рейсе 2"), Some(2));
        assert_eq!(seat_count("мест сколько-то"), None);
    }

    #[test]
    fn no_tickets_marker_matches_page_phrase() {
        assert!(has_no_tickets_marker(
            "К сожалению, Билетов класса Бизнес нет в наличии на эту дату"
        ));
        assert!(has_no_tickets_marker("Рейсы не найдены"));
        assert!(!has_no_tickets_marker("Найдено 3 рейса"));
    }

    #[test]
    fn fragment_text_joins_text_nodes() {
        let html = "<div><span>07:40</span> <b>SU 0016</b><p>Пересадка</p></div>";
        let text = fragment_text(html);
        assert!(text.contains("07:40"));
        assert!(text.contains("SU 0016"));
        assert!(has_transfer_marker(&text));
    }
}
