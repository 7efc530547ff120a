//! Fare-panel extraction: mileage price, cash surcharge, seat count.
//!
//! The detail panel renders a tariff table whose markup shifts between
//! releases, so resolution is a fixed priority list of strategies over a
//! captured snapshot of the panel — first match wins, every stage pure and
//! fixture-testable. Failure of the whole chain is a ParseAmbiguity: the
//! record keeps `None` prices, the pipeline moves on.

use scraper::{Html, Selector};
use std::sync::OnceLock;
use tracing::debug;

use super::parse;

/// Tariff-tier column header the pipeline prices against.
pub const STANDARD_TIER_LABELS: &[&str] = &["Стандарт", "Standard"];

/// Every tier name the tariff table may render, for free-text alignment.
const TIER_NAME_PATTERN: &str = "Смарт|Лайт|Базовый|Стандарт|Гибкий|Максимум";

const PRICE_CELL_SELECTOR: &str = ".tariff__table-cell.tariff__table-price";
const HEADER_CELL_SELECTOR: &str = ".tariff__table-head .tariff__item-title, .tariff__table-head .text-bold";

/// Pure snapshot of one opened detail panel.
#[derive(Debug, Clone, Default)]
pub struct FarePanel {
    /// Text of each price cell, document order.
    pub price_cells: Vec<String>,
    /// Text of each tier header cell, document order.
    pub header_cells: Vec<String>,
    /// Whole panel text, whitespace-normalized to a single line.
    pub full_text: String,
}

impl FarePanel {
    pub fn from_html(html: &str) -> Self {
        static PRICE_SEL: OnceLock<Selector> = OnceLock::new();
        static HEADER_SEL: OnceLock<Selector> = OnceLock::new();
        let price_sel =
            PRICE_SEL.get_or_init(|| Selector::parse(PRICE_CELL_SELECTOR).expect("valid selector"));
        let header_sel = HEADER_SEL
            .get_or_init(|| Selector::parse(HEADER_CELL_SELECTOR).expect("valid selector"));

        let doc = Html::parse_fragment(html);
        let cell_text = |el: scraper::ElementRef<'_>| {
            parse::normalize_spaces(&el.text().collect::<Vec<_>>().join(" "))
        };

        Self {
            price_cells: doc.select(price_sel).map(cell_text).collect(),
            header_cells: doc.select(header_sel).map(cell_text).collect(),
            full_text: parse::normalize_spaces(&parse::fragment_text(html)),
        }
    }
}

/// What one panel yielded. All fields stay `None` when every strategy ran dry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FareQuote {
    pub miles: Option<u64>,
    pub surcharge: Option<u64>,
    pub seats: Option<u32>,
}

type PriceStrategy = fn(&FarePanel) -> Option<(u64, u64)>;

/// Priority-ordered. Structured lookup beats positional guessing beats
/// free-text scraping.
pub const PRICE_STRATEGIES: &[(&str, PriceStrategy)] = &[
    ("header-match", price_by_header),
    ("positional", price_by_position),
    ("free-text", price_by_free_text),
];

/// Run the strategy chain, first success wins.
pub fn resolve_prices(panel: &FarePanel) -> Option<(u64, u64)> {
    for (name, strategy) in PRICE_STRATEGIES {
        if let Some((miles, surcharge)) = strategy(panel) {
            debug!(strategy = name, miles, surcharge, "fare prices resolved");
            return Some((miles, surcharge));
        }
    }
    debug!("no strategy resolved a price from the panel");
    None
}

/// Full quote: price chain plus the seat-count pattern. `row_text` is the
/// fallback haystack when the panel itself says nothing about seats.
pub fn resolve_quote(panel: &FarePanel, row_text: &str) -> FareQuote {
    let prices = resolve_prices(panel);
    let seats = parse::seat_count(&panel.full_text)
        .or_else(|| parse::seat_count(&parse::normalize_spaces(row_text)));

    FareQuote {
        miles: prices.map(|p| p.0),
        surcharge: prices.map(|p| p.1),
        seats,
    }
}

// ── Strategies ───────────────────────────────────────────────────────────────

/// 1. Structured lookup: a header cell naming the standard tier picks the
/// price-cell column.
fn price_by_header(panel: &FarePanel) -> Option<(u64, u64)> {
    let idx = panel.header_cells.iter().position(|h| {
        STANDARD_TIER_LABELS
            .iter()
            .any(|label| h.contains(label))
    })?;
    parse::price_from_cell(panel.price_cells.get(idx)?)
}

/// 2. Positional heuristic: with a full tier row the standard column is the
/// second of three-plus cells; a lone cell is taken as-is. Two cells are
/// ambiguous and fall through.
fn price_by_position(panel: &FarePanel) -> Option<(u64, u64)> {
    let idx = match panel.price_cells.len() {
        n if n >= 3 => 1,
        1 => 0,
        _ => return None,
    };
    parse::price_from_cell(&panel.price_cells[idx])
}

/// 3. Free-text fallback: align every price pair in the panel text with
/// every tier-name token; take the standard tier's pair when it is present,
/// otherwise fall back to the positional rule over the pairs themselves.
fn price_by_free_text(panel: &FarePanel) -> Option<(u64, u64)> {
    static TIER_RE: OnceLock<regex::Regex> = OnceLock::new();
    let tier_re =
        TIER_RE.get_or_init(|| regex::Regex::new(TIER_NAME_PATTERN).expect("valid regex"));

    let pairs = parse::price_pairs(&panel.full_text);
    if pairs.is_empty() {
        return None;
    }

    let tiers: Vec<&str> = tier_re
        .find_iter(&panel.full_text)
        .map(|m| m.as_str())
        .collect();
    if let Some(idx) = tiers.iter().position(|t| *t == "Стандарт") {
        if idx < pairs.len() {
            return Some(pairs[idx]);
        }
    }

    let idx = if pairs.len() >= 3 { 1 } else { 0 };
    Some(pairs[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(price_cells: &[&str], header_cells: &[&str], full_text: &str) -> FarePanel {
        FarePanel {
            price_cells: price_cells.iter().map(|s| s.to_string()).collect(),
            header_cells: header_cells.iter().map(|s| s.to_string()).collect(),
            full_text: full_text.to_string(),
        }
    }

    #[test]
    fn header_match_picks_standard_column() {
        let p = panel(
            &["от 52 500 ¥ и 8 000 ₽", "от 45 000 ¥ и 8 000 ₽", "от 90 000 ¥ и 8 000 ₽"],
            &["Лайт", "Стандарт", "Максимум"],
            "",
        );
        assert_eq!(resolve_prices(&p), Some((45_000, 8_000)));
    }

    #[test]
    fn transliterated_header_also_matches() {
        let p = panel(&["от 30 000 ¥ и 5 000 ₽"], &["Standard"], "");
        assert_eq!(resolve_prices(&p), Some((30_000, 5_000)));
    }

    #[test]
    fn positional_second_of_three_without_headers() {
        let p = panel(
            &["от 1 000 ¥ и 1 ₽", "от 2 000 ¥ и 2 ₽", "от 3 000 ¥ и 3 ₽"],
            &[],
            "",
        );
        assert_eq!(resolve_prices(&p), Some((2_000, 2)));
    }

    #[test]
    fn positional_lone_cell() {
        let p = panel(&["от 70 000 ¥ и 9 500 ₽"], &[], "");
        assert_eq!(resolve_prices(&p), Some((70_000, 9_500)));
    }

    #[test]
    fn two_cells_fall_through_to_free_text() {
        // Two cells are ambiguous positionally; the normalized full text
        // still names the standard tier, so free-text alignment decides.
        let p = panel(
            &["нет мест", "нет мест"],
            &[],
            "Лайт от 20 000 ¥ и 3 000 ₽ Стандарт от 25 000 ¥ и 3 500 ₽",
        );
        assert_eq!(resolve_prices(&p), Some((25_000, 3_500)));
    }

    #[test]
    fn free_text_single_pair() {
        let p = panel(&[], &[], "от 60 000 ¥ и 11 369 ₴");
        assert_eq!(resolve_prices(&p), Some((60_000, 11_369)));
    }

    #[test]
    fn free_text_defaults_to_second_of_three_pairs() {
        let p = panel(
            &[],
            &[],
            "Смарт от 10 000 ¥ и 100 ₽ Лайт от 20 000 ¥ и 200 ₽ Максимум от 30 000 ¥ и 300 ₽",
        );
        assert_eq!(resolve_prices(&p), Some((20_000, 200)));
    }

    #[test]
    fn empty_panel_yields_unresolved_quote() {
        let q = resolve_quote(&FarePanel::default(), "");
        assert_eq!(q, FareQuote::default());
        assert_eq!(q.miles, None);
    }

    #[test]
    fn seat_count_falls_back_to_row_text() {
        let p = panel(&[], &[], "никаких данных о местах");
        let q = resolve_quote(&p, "07:40 SU 0016 Свободных мест: 6");
        assert_eq!(q.seats, Some(6));
    }

    #[test]
    fn panel_from_html_reads_table_cells() {
        let html = r#"
            <div class="modal__frame">
              <div class="tariff__table-head">
                <div class="tariff__item-title">Лайт</div>
                <div class="tariff__item-title">Стандарт</div>
                <div class="tariff__item-title">Максимум</div>
              </div>
              <div class="tariff__table-cell tariff__table-price">от 52 500 ¥ и 8 000 ₽</div>
              <div class="tariff__table-cell tariff__table-price">от 45 000 ¥ и 8 000 ₽</div>
              <div class="tariff__table-cell tariff__table-price">от 90 000 ¥ и 8 000 ₽</div>
              <p>Доступно мест: 3</p>
            </div>"#;
        let p = FarePanel::from_html(html);
        assert_eq!(p.price_cells.len(), 3);
        assert_eq!(p.header_cells.len(), 3);
        let q = resolve_quote(&p, "");
        assert_eq!(q.miles, Some(45_000));
        assert_eq!(q.surcharge, Some(8_000));
        assert_eq!(q.seats, Some(3));
    }
}
