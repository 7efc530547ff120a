//! Booking-segment extraction from a loaded booking record.
//!
//! The page groups legs visually but not structurally: dates, flight
//! numbers, and route codes float in the group's glued-together text with no
//! markup linking them to the fare codes. Reconstruction is therefore an
//! explicit best-effort alignment pass — every match family is extracted
//! independently and lined up with the fare codes **by position**, degrading
//! to `None` per field whenever counts diverge. Misattribution is worse than
//! a hole, so nothing here guesses past the index.

use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::core::types::{BookingSegment, LegDetail};
use crate::search::parse;

pub const SEGMENT_GROUP_SELECTOR: &str = ".flight-booking__group";
pub const FARE_CODE_SELECTOR: &str = ".flight-booking__class_name";
pub const FARE_CLASS_SELECTOR: &str = ".flight-booking__col--class";

/// Pure snapshot of one booking group.
#[derive(Debug, Clone, Default)]
pub struct SegmentGroup {
    /// Visible text of the whole group, one text node per line.
    pub text: String,
    /// Per-leg fare-basis codes, document order.
    pub fare_codes: Vec<String>,
    /// Per-leg cabin/class descriptions, document order.
    pub fare_classes: Vec<String>,
}

impl SegmentGroup {
    pub fn from_html(html: &str) -> Self {
        static CODE_SEL: OnceLock<Selector> = OnceLock::new();
        static CLASS_SEL: OnceLock<Selector> = OnceLock::new();
        let code_sel =
            CODE_SEL.get_or_init(|| Selector::parse(FARE_CODE_SELECTOR).expect("valid selector"));
        let class_sel =
            CLASS_SEL.get_or_init(|| Selector::parse(FARE_CLASS_SELECTOR).expect("valid selector"));

        let doc = Html::parse_fragment(html);
        let text_of = |el: scraper::ElementRef<'_>| {
            el.text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        };

        Self {
            text: parse::fragment_text(html),
            fare_codes: doc.select(code_sel).map(&text_of).collect(),
            fare_classes: doc.select(class_sel).map(&text_of).collect(),
        }
    }
}

/// Outer HTML of every booking group on a captured page.
pub fn groups_from_html(page_html: &str) -> Vec<String> {
    static GROUP_SEL: OnceLock<Selector> = OnceLock::new();
    let group_sel =
        GROUP_SEL.get_or_init(|| Selector::parse(SEGMENT_GROUP_SELECTOR).expect("valid selector"));
    Html::parse_document(page_html)
        .select(group_sel)
        .map(|el| el.html())
        .collect()
}

/// Bare fare-code texts from a page whose group structure is absent.
pub fn bare_fare_codes(page_html: &str) -> Vec<String> {
    static CODE_SEL: OnceLock<Selector> = OnceLock::new();
    let code_sel =
        CODE_SEL.get_or_init(|| Selector::parse(FARE_CODE_SELECTOR).expect("valid selector"));
    Html::parse_document(page_html)
        .select(code_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Align one group's independently-extracted match families to its fare
/// codes by index. One `BookingSegment` per fare code.
pub fn align_group(group: &SegmentGroup) -> Vec<BookingSegment> {
    if group.fare_codes.is_empty() {
        return Vec::new();
    }

    let route = group
        .text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("Маршрут не определен")
        .to_string();
    let special_region = parse::has_special_region_marker(&group.text);

    let flight_numbers = parse::flight_numbers(&group.text);
    let dates = parse::long_dates(&group.text);
    let routes = parse::route_pairs(&group.text);
    let legs = group.fare_codes.len();

    if flight_numbers.len() != legs || routes.len() != legs {
        debug!(
            legs,
            flights = flight_numbers.len(),
            routes = routes.len(),
            dates = dates.len(),
            "match counts diverge, detail will be partial"
        );
    }

    group
        .fare_codes
        .iter()
        .enumerate()
        .map(|(i, fare_code)| {
            let detail = LegDetail {
                // A single date heading often covers the whole group; reuse
                // it rather than dropping the date for the later legs.
                date: dates.get(i).or_else(|| dates.first()).cloned(),
                flight_number: flight_numbers.get(i).cloned(),
                origin: routes.get(i).map(|r| r.0.clone()),
                destination: routes.get(i).map(|r| r.1.clone()),
            };
            let suffix = if legs > 1 {
                format!(" (Рейс {})", i + 1)
            } else {
                String::new()
            };
            BookingSegment {
                route: format!("{route}{suffix}"),
                fare_code: fare_code.clone(),
                fare_class: group
                    .fare_classes
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| fare_code.clone()),
                special_region,
                detail,
            }
        })
        .collect()
}

/// Fallback segments when only bare fare-code elements exist: synthetic
/// labels, no recoverable per-leg detail.
pub fn fallback_segments(fare_codes: &[String]) -> Vec<BookingSegment> {
    if !fare_codes.is_empty() {
        warn!(
            "group structure absent, falling back to {} bare fare code(s)",
            fare_codes.len()
        );
    }
    fare_codes
        .iter()
        .enumerate()
        .map(|(i, code)| BookingSegment {
            route: format!("Сегмент {}", i + 1),
            fare_code: code.clone(),
            fare_class: "Не определен".to_string(),
            special_region: false,
            detail: LegDetail::default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(text: &str, codes: &[&str], classes: &[&str]) -> SegmentGroup {
        SegmentGroup {
            text: text.to_string(),
            fare_codes: codes.iter().map(|s| s.to_string()).collect(),
            fare_classes: classes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn single_leg_group_aligns_fully() {
        let g = group(
            "Москва — Калининград\n19 февраля 2026 г., четверг\n22:35SVOB KGD06:55\nSU 1006",
            &["BPXOWRF"],
            &["Эконом Бюджет"],
        );
        let segments = align_group(&g);
        assert_eq!(segments.len(), 1);
        let s = &segments[0];
        assert_eq!(s.route, "Москва — Калининград");
        assert_eq!(s.fare_code, "BPXOWRF");
        assert_eq!(s.fare_class, "Эконом Бюджет");
        assert!(s.special_region);
        assert_eq!(s.detail.date.as_deref(), Some("19.02.2026"));
        assert_eq!(s.detail.flight_number.as_deref(), Some("SU1006"));
        assert_eq!(s.detail.origin.as_deref(), Some("SVO"));
        assert_eq!(s.detail.destination.as_deref(), Some("KGD"));
        assert!(s.detail.is_routable());
    }

    #[test]
    fn two_legs_share_the_group_date() {
        let g = group(
            "Москва — Сочи\n20 февраля 2026 г.\n06:00SVO AER08:40\nSU 1122\n12:30AER SVO15:10\nSU 1123",
            &["YFM0", "YFM0"],
            &["Эконом Максимум", "Эконом Максимум"],
        );
        let segments = align_group(&g);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].route, "Москва — Сочи (Рейс 1)");
        assert_eq!(segments[1].route, "Москва — Сочи (Рейс 2)");
        // One date heading for the whole group: the second leg reuses it.
        assert_eq!(segments[1].detail.date.as_deref(), Some("20.02.2026"));
        assert_eq!(segments[1].detail.origin.as_deref(), Some("AER"));
    }

    #[test]
    fn diverging_counts_degrade_to_partial_detail() {
        // Two fare codes but only one flight/route match: the second leg
        // keeps holes instead of stealing the first leg's data.
        let g = group(
            "Маршрут\n1 марта 2026\n10:00LED KZN12:00\nSU 6345",
            &["QNO", "QNO"],
            &[],
        );
        let segments = align_group(&g);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].detail.is_routable());
        assert_eq!(segments[1].detail.flight_number, None);
        assert_eq!(segments[1].detail.origin, None);
        assert!(!segments[1].detail.is_routable());
        // Class description falls back to the fare code itself.
        assert_eq!(segments[0].fare_class, "QNO");
    }

    #[test]
    fn flight_number_dedup_can_starve_later_legs() {
        // The same flight number printed twice collapses to one match; the
        // alignment must leave the second leg's number empty, not reuse it.
        let g = group("Текст\nSU 1459 и снова SU 1459", &["A", "B"], &[]);
        let segments = align_group(&g);
        assert_eq!(
            segments[0].detail.flight_number.as_deref(),
            Some("SU1459")
        );
        assert_eq!(segments[1].detail.flight_number, None);
    }

    #[test]
    fn fallback_segments_have_synthetic_labels() {
        let codes = vec!["YFM0".to_string(), "QNO".to_string()];
        let segments = fallback_segments(&codes);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].route, "Сегмент 1");
        assert_eq!(segments[1].route, "Сегмент 2");
        assert_eq!(segments[1].detail, LegDetail::default());
    }

    #[test]
    fn group_snapshot_from_html() {
        let html = r#"
            <div class="flight-booking__group">
              <h3>Москва — Калининград</h3>
              <p>19 февраля 2026 г., четверг</p>
              <div>22:35SVOB KGD06:55</div>
              <div>SU 1006</div>
              <div class="flight-booking__col--class">Эконом Бюджет</div>
              <div class="flight-booking__class_name">BPXOWRF</div>
            </div>"#;
        let g = SegmentGroup::from_html(html);
        assert_eq!(g.fare_codes, vec!["BPXOWRF"]);
        assert_eq!(g.fare_classes, vec!["Эконом Бюджет"]);
        assert!(g.text.contains("Калининград"));
    }
}
