//! Upgrade-eligibility pipeline: load a booking record by reference +
//! surname, reconstruct its flight segments, run the rule table, and — for
//! eligible segments whose route detail survived — re-invoke the award
//! search on that exact leg to report seat availability.

pub mod eligibility;
pub mod segments;

use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::{dom, popups, screenshot, session, BrowserSession, SessionGate};
use crate::core::config::ScoutConfig;
use crate::core::types::{BookingSegment, SearchQuery, SegmentAssessment, UpgradeReport};
use crate::search::AwardScout;

use segments::SegmentGroup;

/// Hash-routed booking-lookup entry of the PNR SPA.
pub const PNR_BASE_URL: &str = "https://www.aeroflot.ru/sb/pnr/app/ru-ru#/search";

const FIND_LABEL: &str = "Найти";
const BOOKING_WAIT: Duration = Duration::from_secs(20);
const VALIDATION_SETTLE: Duration = Duration::from_millis(500);

/// The lookup form carries dynamic ids, so inputs are found by placeholder or
/// name fragments, falling back to bare input order (reference first,
/// surname second).
const PNR_INPUT_SELECTORS: &[&str] = &[
    "input[placeholder*='Код бронирования']",
    "input[placeholder*='PNR']",
    "input[name*='pnr']",
];
const SURNAME_INPUT_SELECTORS: &[&str] =
    &["input[placeholder*='Фамилия']", "input[name*='last_name']"];

const SITE_ERROR_SELECTORS: &[&str] = &[".alert--error", ".message-error"];

/// Any of these means the lookup finished, one way or the other.
const OUTCOME_PREDICATE: &str = r#"(() => {
    if (document.querySelector(".flight-booking__class_name, .alert--error, .message-error")) return true;
    return Array.from(document.querySelectorAll('h1'))
        .some(h => (h.textContent || '').includes('не найдено'));
})()"#;

const NOT_FOUND_HEADING: &str = r#"(() => Array.from(document.querySelectorAll('h1'))
    .some(h => (h.textContent || '').includes('не найдено')))()"#;

#[derive(Clone)]
pub struct UpgradeScout {
    config: Arc<ScoutConfig>,
    gate: Arc<SessionGate>,
}

impl UpgradeScout {
    pub fn new(config: Arc<ScoutConfig>, gate: Arc<SessionGate>) -> Self {
        Self { config, gate }
    }

    /// Check every segment of a booking for upgrade eligibility.
    ///
    /// The booking session releases its gate permit before the per-segment
    /// availability re-checks run, so re-entering the search pipeline can
    /// never deadlock the gate.
    pub async fn check(&self, pnr: &str, surname: &str) -> UpgradeReport {
        info!(pnr = %pnr, "starting upgrade check");

        let booking = self.load_booking(pnr, surname).await;

        let booking_segments = match booking {
            Ok(segs) => segs,
            Err((message, shot)) => {
                warn!("upgrade check failed: {}", message);
                return UpgradeReport::Error {
                    message,
                    screenshot: shot,
                };
            }
        };

        let searcher = AwardScout::new(self.config.clone(), self.gate.clone());
        let mut assessed = Vec::with_capacity(booking_segments.len());
        let mut all_eligible = true;

        for segment in booking_segments {
            let verdict = eligibility::check_eligibility(&segment.fare_code, segment.special_region);
            info!(
                route = %segment.route,
                fare = %segment.fare_code,
                eligible = verdict.eligible,
                reason = verdict.reason.describe(),
                "segment assessed"
            );
            all_eligible &= verdict.eligible;

            let availability = if verdict.eligible && segment.detail.is_routable() {
                self.recheck_availability(&searcher, &segment).await
            } else {
                None
            };

            assessed.push(SegmentAssessment {
                segment,
                verdict,
                availability,
            });
        }

        UpgradeReport::Success {
            segments: assessed,
            all_eligible,
        }
    }

    /// Drive the booking-lookup session and return the reconstructed
    /// segments. On failure, captures a debug screenshot while the page is
    /// still alive and returns it with the message.
    async fn load_booking(
        &self,
        pnr: &str,
        surname: &str,
    ) -> Result<Vec<BookingSegment>, (String, Option<std::path::PathBuf>)> {
        let _permit = self.gate.acquire().await;

        let session = match BrowserSession::launch(&self.config).await {
            Ok(s) => s,
            Err(e) => return Err((format!("{e:#}"), None)),
        };

        match self.drive_lookup(&session, pnr, surname).await {
            Ok(segs) => {
                session.close().await;
                Ok(segs)
            }
            Err(e) => {
                let slug = format!("pnr_{pnr}");
                let shot =
                    screenshot::capture_region(session.page(), &self.config.shot_dir, &slug).await;
                session.close().await;
                Err((format!("{e:#}"), shot))
            }
        }
    }

    async fn drive_lookup(
        &self,
        session: &BrowserSession,
        pnr: &str,
        surname: &str,
    ) -> Result<Vec<BookingSegment>> {
        let page = session.page();

        session.navigate(PNR_BASE_URL).await?;
        popups::dismiss_known_overlays(page).await;

        if !dom::fill_input(page, PNR_INPUT_SELECTORS, 0, pnr).await {
            return Err(anyhow!("booking reference input not found"));
        }
        if !dom::fill_input(page, SURNAME_INPUT_SELECTORS, 1, surname).await {
            return Err(anyhow!("surname input not found"));
        }

        // Blur the form so client-side validation enables the button.
        dom::click_body(page).await;
        session::settle(VALIDATION_SETTLE).await;

        if !dom::click_button_with_text(page, FIND_LABEL).await {
            return Err(anyhow!("booking search button not found"));
        }

        if !session::wait_for_predicate(page, OUTCOME_PREDICATE, BOOKING_WAIT).await {
            return Err(anyhow!(
                "booking record did not load within {:?}",
                BOOKING_WAIT
            ));
        }

        if let Some(text) = dom::text_of_first(page, SITE_ERROR_SELECTORS).await {
            return Err(anyhow!("site rejected the lookup: {}", text));
        }
        if dom::eval_bool(page, NOT_FOUND_HEADING).await {
            return Err(anyhow!("booking not found, check the reference and surname"));
        }

        let html = page
            .content()
            .await
            .map_err(|e| anyhow!("failed to capture booking page: {}", e))?;

        let group_htmls = segments::groups_from_html(&html);
        let segs: Vec<BookingSegment> = if group_htmls.is_empty() {
            segments::fallback_segments(&segments::bare_fare_codes(&html))
        } else {
            group_htmls
                .iter()
                .flat_map(|g| segments::align_group(&SegmentGroup::from_html(g)))
                .collect()
        };

        if segs.is_empty() {
            return Err(anyhow!("no flight segments found in the booking record"));
        }
        info!("reconstructed {} booking segment(s)", segs.len());
        Ok(segs)
    }

    /// Scoped re-run of the award pipeline for one eligible leg. Advisory:
    /// a failed re-check leaves availability empty rather than failing the
    /// whole report.
    async fn recheck_availability(
        &self,
        searcher: &AwardScout,
        segment: &BookingSegment,
    ) -> Option<crate::core::types::SearchReport> {
        let detail = &segment.detail;
        let query = SearchQuery::new(
            detail.origin.clone()?,
            detail.destination.clone()?,
            detail.date.clone()?,
            false,
        );
        info!(
            route = %segment.route,
            "re-checking award availability for an eligible segment"
        );
        match searcher.search(&query).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("availability re-check skipped: {}", e);
                None
            }
        }
    }
}
