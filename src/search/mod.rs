//! Award-availability extraction pipeline.
//!
//! One `search` call = one gate permit = one browser session, driven through
//! navigate → dismiss overlays → submit → filter → screenshot → enumerate
//! rows. Only session-level failures surface as Timeout/Error variants;
//! everything row- or field-scoped degrades in place.

pub mod fares;
pub mod filters;
pub mod flights;
pub mod parse;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::{popups, screenshot, session, BrowserSession, SessionGate};
use crate::core::config::ScoutConfig;
use crate::core::error::ScoutError;
use crate::core::types::{SearchOutcome, SearchQuery, SearchReport};

/// Hash-routed search entry of the booking SPA; query parameters ride inside
/// the fragment.
pub const SEARCH_BASE_URL: &str = "https://www.aeroflot.ru/sb/app/ru-ru#/search";

/// Label of the search-submit control.
const SUBMIT_LABEL: &str = "Найти";

const SUBMIT_WAIT: Duration = Duration::from_secs(5);
const RESULTS_SETTLE: Duration = Duration::from_millis(2000);

/// Award-search URL for one adult, business cabin, paying with miles.
pub fn build_search_url(query: &SearchQuery, route_date: &str) -> String {
    format!(
        "{SEARCH_BASE_URL}?adults=1&award=Y&cabin=business&children=0&childrenaward=0&\
         childrenfrgn=0&infants=0&routes={origin}.{date}.{destination}",
        origin = query.origin,
        date = route_date,
        destination = query.destination,
    )
}

/// The extraction pipeline. Cheap to clone per request; the config and the
/// gate are shared process-wide and injected.
#[derive(Clone)]
pub struct AwardScout {
    config: Arc<ScoutConfig>,
    gate: Arc<SessionGate>,
}

impl AwardScout {
    pub fn new(config: Arc<ScoutConfig>, gate: Arc<SessionGate>) -> Self {
        Self { config, gate }
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    pub fn config(&self) -> &Arc<ScoutConfig> {
        &self.config
    }

    /// Check award availability for one route/date.
    ///
    /// `Err` only for input rejected before any browser work; every
    /// in-session failure comes back as a report variant with whatever
    /// screenshot could still be taken.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchReport, ScoutError> {
        let route_date = parse::to_route_date(&query.date)?;
        let url = build_search_url(query, &route_date);
        let slug = format!("{}_{}_{}", query.origin, query.destination, route_date);

        let _permit = self.gate.acquire().await;
        info!(
            origin = %query.origin,
            destination = %query.destination,
            date = %query.date,
            direct_only = query.direct_only,
            "starting award search"
        );

        let session = match BrowserSession::launch(&self.config).await {
            Ok(s) => s,
            Err(e) => {
                warn!("browser launch failed: {:#}", e);
                return Ok(SearchReport {
                    outcome: SearchOutcome::Error {
                        message: format!("{e:#}"),
                    },
                    screenshot: None,
                });
            }
        };

        let mut shot = None;
        let outcome: Result<SearchOutcome> = async {
            session.navigate(&url).await?;
            popups::dismiss_known_overlays(session.page()).await;

            self.submit_search(&session).await;
            popups::dismiss_known_overlays(session.page()).await;

            if query.direct_only {
                if filters::apply_direct_only_filter(session.page()).await {
                    // Toggling filters can spawn its own overlay.
                    popups::dismiss_known_overlays(session.page()).await;
                } else {
                    warn!("direct-only filter not applied, results may include transfers");
                }
            }

            // Capture before row expansion so the artifact shows the result
            // list, not a half-open detail panel.
            shot = screenshot::capture_region(session.page(), &self.config.shot_dir, &slug).await;

            flights::extract_flights(session.page()).await
        }
        .await;

        // Failure paths still owe the caller a picture of whatever the page
        // looked like when things went sideways.
        if shot.is_none() {
            shot = screenshot::capture_region(session.page(), &self.config.shot_dir, &slug).await;
        }
        session.close().await;

        Ok(SearchReport {
            outcome: fold_outcome(outcome),
            screenshot: shot,
        })
    }

    /// The results page sometimes lands with the query pre-filled but not
    /// submitted. Press the search button when it shows up; its absence is
    /// normal on auto-submitted loads.
    async fn submit_search(&self, session: &BrowserSession) {
        let page = session.page();
        let probe = format!(
            "Array.from(document.querySelectorAll(\"a.button--wide.button--lg, button\"))\
             .some(el => (el.textContent || '').trim() === {})",
            serde_json::to_string(SUBMIT_LABEL).unwrap_or_default()
        );
        if !session::wait_for_predicate(page, &probe, SUBMIT_WAIT).await {
            info!("no submit button, assuming auto-submitted search");
            return;
        }
        if crate::browser::dom::click_button_with_text(page, SUBMIT_LABEL).await {
            info!("submitted search form");
            session::settle(RESULTS_SETTLE).await;
        }
    }
}

/// Map in-session failures onto the result taxonomy: a blown navigation
/// budget is a Timeout, anything else an Error with the original message.
fn fold_outcome(result: Result<SearchOutcome>) -> SearchOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => match e.downcast_ref::<ScoutError>() {
            Some(ScoutError::NavigationTimeout(_)) => SearchOutcome::Timeout {
                message: format!("{e:#}"),
            },
            _ => SearchOutcome::Error {
                message: format!("{e:#}"),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_route_token() {
        let q = SearchQuery::new("MOW", "LED", "25.12.2025", true);
        let url = build_search_url(&q, "20251225");
        assert!(url.starts_with(SEARCH_BASE_URL));
        assert!(url.contains("award=Y"));
        assert!(url.contains("cabin=business"));
        assert!(url.contains("routes=MOW.20251225.LED"));
    }

    #[test]
    fn timeout_folds_to_timeout_variant() {
        let err = anyhow::anyhow!(ScoutError::NavigationTimeout(Duration::from_secs(60)));
        assert!(matches!(
            fold_outcome(Err(err)),
            SearchOutcome::Timeout { .. }
        ));
    }

    #[test]
    fn other_errors_fold_to_error_variant() {
        let err = anyhow::anyhow!("browser exploded");
        match fold_outcome(Err(err)) {
            SearchOutcome::Error { message } => assert!(message.contains("browser exploded")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
