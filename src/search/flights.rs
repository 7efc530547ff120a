//! Result-row enumeration: departure time, flight numbers, direct/connecting
//! classification, and the expand-row → fare-panel detail flow.
//!
//! Row parsing is pure text work over captured HTML so it runs against
//! recorded fixtures; only the expand/close choreography touches the live
//! page. A row that refuses to yield detail is still emitted with
//! unresolved fields — partial data beats no data.

use anyhow::{anyhow, Result};
use chromiumoxide::Page;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::dom;
use crate::browser::session::{self, settle};
use crate::core::types::{FlightRecord, SearchOutcome};

use super::fares::{self, FarePanel, FareQuote};
use super::parse;

pub const FLIGHT_ROW_SELECTOR: &str = ".flight-search";
const EXPAND_BUTTON_SELECTOR: &str = "button.button--outline";
const PANEL_SELECTOR: &str = ".modal__frame";
const PANEL_CLOSE_SELECTOR: &str = ".modal__close";

const PANEL_WAIT: Duration = Duration::from_secs(3);
const EXPAND_SETTLE: Duration = Duration::from_millis(1000);
const CLOSE_SETTLE: Duration = Duration::from_millis(500);

// ── Pure layer ───────────────────────────────────────────────────────────────

/// Primary fields of one result row, before price detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFields {
    pub departure_time: Option<String>,
    pub flight_numbers: Vec<String>,
    pub connecting: bool,
}

/// Outer HTML of every result row on a captured page.
pub fn rows_from_html(page_html: &str) -> Vec<String> {
    static ROW_SEL: OnceLock<Selector> = OnceLock::new();
    let row_sel =
        ROW_SEL.get_or_init(|| Selector::parse(FLIGHT_ROW_SELECTOR).expect("valid selector"));
    Html::parse_document(page_html)
        .select(row_sel)
        .map(|el| el.html())
        .collect()
}

/// Parse one row's text. `None` means the row advertises no availability and
/// must produce no record at all.
pub fn parse_row(row_text: &str) -> Option<RowFields> {
    if parse::has_no_tickets_marker(row_text) {
        return None;
    }

    let flight_numbers = parse::flight_numbers(row_text);
    let connecting = parse::has_transfer_marker(row_text) || flight_numbers.len() > 1;

    Some(RowFields {
        departure_time: parse::first_departure_time(row_text),
        flight_numbers,
        connecting,
    })
}

/// Assemble the final record from primary fields plus whatever the fare
/// panel yielded.
pub fn record_from_parts(fields: &RowFields, quote: FareQuote) -> FlightRecord {
    FlightRecord {
        departure_time: fields.departure_time.clone(),
        flight_numbers: fields.flight_numbers.clone(),
        seats: quote.seats,
        miles: quote.miles,
        surcharge: quote.surcharge,
    }
}

/// Fold classified records into the overall outcome. Empty lists mean the
/// date has nothing bookable — a distinct successful outcome, not an error.
pub fn outcome_from_records(
    direct: Vec<FlightRecord>,
    connecting: Vec<FlightRecord>,
) -> SearchOutcome {
    if direct.is_empty() && connecting.is_empty() {
        SearchOutcome::NoTickets
    } else {
        SearchOutcome::Success { direct, connecting }
    }
}

// ── Live glue ────────────────────────────────────────────────────────────────

/// Enumerate rows on the live page, expand each for price detail, classify,
/// and fold into the outcome.
pub async fn extract_flights(page: &Page) -> Result<SearchOutcome> {
    let page_html = page
        .content()
        .await
        .map_err(|e| anyhow!("failed to capture page content: {}", e))?;

    let rows = rows_from_html(&page_html);
    if rows.is_empty() {
        return Ok(if parse::has_no_tickets_marker(&page_html) {
            info!("no result rows and the page carries the no-tickets phrase");
            SearchOutcome::NoTickets
        } else {
            // Nothing matched the row selector at all; still a no-tickets
            // outcome, but worth a log line since it may mean a layout change.
            warn!("no result rows matched {}", FLIGHT_ROW_SELECTOR);
            SearchOutcome::NoTickets
        });
    }

    info!("found {} result row(s)", rows.len());

    let mut direct = Vec::new();
    let mut connecting = Vec::new();

    for (idx, row_html) in rows.iter().enumerate() {
        let row_text = parse::fragment_text(row_html);
        let Some(fields) = parse_row(&row_text) else {
            debug!("row {} advertises no availability, skipped", idx);
            continue;
        };

        let quote = expand_and_quote(page, idx, &row_text).await;
        let record = record_from_parts(&fields, quote);

        debug!(
            row = idx,
            connecting = fields.connecting,
            flights = ?record.flight_numbers,
            "row extracted"
        );
        if fields.connecting {
            connecting.push(record);
        } else {
            direct.push(record);
        }
    }

    Ok(outcome_from_records(direct, connecting))
}

/// Open row `idx`'s detail panel, snapshot it, resolve the quote, close the
/// panel. Every step is advisory; the worst case is an all-`None` quote.
async fn expand_and_quote(page: &Page, idx: usize, row_text: &str) -> FareQuote {
    let expanded = dom::click_nth_inner(page, FLIGHT_ROW_SELECTOR, idx, EXPAND_BUTTON_SELECTOR).await;
    if !expanded {
        warn!("row {}: expand control not found or not clickable", idx);
        return fares::resolve_quote(&FarePanel::default(), row_text);
    }

    if !session::wait_for_selector(page, PANEL_SELECTOR, PANEL_WAIT).await {
        warn!("row {}: detail panel never appeared", idx);
        return fares::resolve_quote(&FarePanel::default(), row_text);
    }
    // Let the panel finish rendering its price table before the snapshot.
    settle(EXPAND_SETTLE).await;

    let Some(panel_html) = dom::outer_html(page, PANEL_SELECTOR).await else {
        warn!("row {}: detail panel vanished before capture", idx);
        return fares::resolve_quote(&FarePanel::default(), row_text);
    };

    let quote = fares::resolve_quote(&FarePanel::from_html(&panel_html), row_text);

    close_panel(page).await;
    quote
}

/// The panel must never stay open into the next row: close control first,
/// Escape as the fallback, settle either way.
async fn close_panel(page: &Page) {
    if dom::click_all_visible(page, PANEL_CLOSE_SELECTOR).await == 0 {
        dom::press_escape(page).await;
    }
    settle(CLOSE_SETTLE).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_flight_number_no_marker_is_direct() {
        let fields = parse_row("07:40 Москва — Санкт-Петербург SU 0016 Выбрать рейс").unwrap();
        assert!(!fields.connecting);
        assert_eq!(fields.departure_time.as_deref(), Some("07:40"));
        assert_eq!(fields.flight_numbers, vec!["SU0016"]);
    }

    #[test]
    fn two_flight_numbers_is_connecting() {
        let fields = parse_row("09:15 SU 1459 далее SU 6023").unwrap();
        assert!(fields.connecting);
        assert_eq!(fields.flight_numbers, vec!["SU1459", "SU6023"]);
    }

    #[test]
    fn transfer_marker_alone_is_connecting() {
        let fields = parse_row("10:05 SU 1323 Пересадка в Шереметьево").unwrap();
        assert!(fields.connecting);
        assert_eq!(fields.flight_numbers.len(), 1);
    }

    #[test]
    fn sold_out_row_produces_no_record() {
        assert!(parse_row("SU 1402 Билетов класса Бизнес нет в наличии").is_none());
    }

    #[test]
    fn missing_time_is_unknown_not_invented() {
        let fields = parse_row("SU 1402 рейс без времени").unwrap();
        assert_eq!(fields.departure_time, None);
    }

    #[test]
    fn empty_lists_fold_to_no_tickets() {
        assert!(matches!(
            outcome_from_records(vec![], vec![]),
            SearchOutcome::NoTickets
        ));
    }

    #[test]
    fn rows_from_html_selects_result_rows() {
        let html = r#"<html><body>
            <div class="flight-search"><span>07:40</span> SU 0016</div>
            <div class="flight-search"><span>12:20</span> SU 0018</div>
            <div class="other">noise</div>
        </body></html>"#;
        let rows = rows_from_html(html);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].contains("SU 0016"));
    }
}
