//! Best-effort dismissal of the overlays the booking UI throws at a fresh
//! session: country-choice prompt, cookie banner, promo modals.
//!
//! Advisory by contract — every per-pattern failure is swallowed, the caller
//! only ever sees a dismissed-count for logging. Runs after initial
//! navigation and again after any action that may spawn a new overlay.

use chromiumoxide::Page;
use std::time::Duration;
use tracing::{debug, info};

use super::dom;
use super::session::settle;

const CLICK_SETTLE: Duration = Duration::from_millis(500);

/// One entry in the ordered dismissal list. CSS where the overlay has a
/// stable class; trimmed-label match where only the button text is reliable.
#[derive(Debug, Clone, Copy)]
pub enum OverlayPattern {
    Css(&'static str),
    ButtonLabel(&'static str),
}

/// Ordered by how often each overlay appears first on a fresh session.
pub const OVERLAY_PATTERNS: &[OverlayPattern] = &[
    OverlayPattern::Css(".notification--choice-country .button"),
    OverlayPattern::ButtonLabel("Да"),
    OverlayPattern::Css(".cookie-block .button"),
    OverlayPattern::ButtonLabel("Понятно"),
    OverlayPattern::ButtonLabel("Принять"),
    OverlayPattern::Css(".modal__close"),
    OverlayPattern::Css(".notification__close"),
];

/// Walk the pattern list once, clicking every visible match. Returns the
/// total number of overlays dismissed; never fails.
pub async fn dismiss_known_overlays(page: &Page) -> u32 {
    let mut dismissed = 0u32;

    for pattern in OVERLAY_PATTERNS {
        let clicked = match pattern {
            OverlayPattern::Css(selector) => dom::click_all_visible(page, selector).await,
            OverlayPattern::ButtonLabel(label) => {
                u32::from(dom::click_button_with_text(page, label).await)
            }
        };
        if clicked > 0 {
            debug!("dismissed overlay {:?} ({}x)", pattern, clicked);
            dismissed += clicked;
            settle(CLICK_SETTLE).await;
        }
    }

    if dismissed > 0 {
        info!("closed {} overlay element(s)", dismissed);
    }
    dismissed
}
