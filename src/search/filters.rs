//! Direct-only filtering via heuristic DOM traversal.
//!
//! The filter block has no stable identifier, so the anchor is the literal
//! option label: find it, walk outward to something that looks like a filter
//! group, then deselect every transfer-count option inside it. Failure at
//! any rung reports back without throwing — an unfiltered result set is
//! still a usable result set.

use chromiumoxide::Page;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::browser::session::settle;

/// Exact visible text of the non-stop option label.
pub const DIRECT_LABEL: &str = "Прямой рейс";

/// Ancestor markers that identify the enclosing filter group, tried in order
/// by `Element.closest`.
pub const FILTER_CONTAINER_MARKERS: &[&str] =
    &["div[role='region']", ".wrapper", ".accordion__content"];

/// Option labels worth deselecting: small transfer counts.
const TRANSFER_COUNT_LABELS: &[&str] = &["1", "2", "3", "4"];

const FILTER_SETTLE: Duration = Duration::from_millis(2000);

#[derive(Debug, Deserialize)]
struct FilterProbe {
    found: bool,
    clicked: u32,
}

/// Returns whether any filter control was actually found and toggled.
pub async fn apply_direct_only_filter(page: &Page) -> bool {
    let js = format!(
        r#"(() => {{
            const labels = Array.from(document.querySelectorAll('label'));
            const anchor = labels.find(l => (l.textContent || '').trim() === {label});
            if (!anchor) return {{ found: false, clicked: 0 }};
            let container = null;
            for (const marker of {markers}) {{
                container = anchor.closest(marker);
                if (container) break;
            }}
            if (!container) return {{ found: true, clicked: 0 }};
            let clicked = 0;
            const digits = {digits};
            for (const l of container.querySelectorAll('label')) {{
                if (digits.includes((l.textContent || '').trim())) {{
                    l.click();
                    clicked++;
                }}
            }}
            return {{ found: true, clicked }};
        }})()"#,
        label = serde_json::to_string(DIRECT_LABEL).unwrap_or_default(),
        markers = serde_json::to_string(FILTER_CONTAINER_MARKERS).unwrap_or_default(),
        digits = serde_json::to_string(TRANSFER_COUNT_LABELS).unwrap_or_default(),
    );

    let probe = page
        .evaluate(js)
        .await
        .ok()
        .and_then(|v| v.into_value::<FilterProbe>().ok());

    match probe {
        Some(FilterProbe { found: false, .. }) => {
            warn!("direct-flight label not found, leaving results unfiltered");
            false
        }
        Some(FilterProbe {
            found: true,
            clicked: 0,
        }) => {
            warn!("filter group or transfer-count options missing, results unfiltered");
            false
        }
        Some(FilterProbe { clicked, .. }) => {
            info!("deselected {} transfer-count option(s)", clicked);
            settle(FILTER_SETTLE).await;
            true
        }
        None => {
            warn!("filter probe script failed, results unfiltered");
            false
        }
    }
}
