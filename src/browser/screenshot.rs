//! Screenshot fallback: on any outcome the pipeline captures the narrowest
//! region of the page that still shows the result state, so a human can
//! verify what the heuristics saw. Extraction is best-effort against a
//! hostile UI; the picture is the ground truth the caller can forward.

use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Narrowest-first: the results frame, then the info panel, then whatever the
/// whole viewport shows.
pub const RESULT_REGION_SELECTORS: &[&str] =
    &[".frame.flight-searchs", ".flight-search__panel-info"];

/// Capture the tightest available region into `dir`, named after `slug`.
/// Returns the artifact path, or `None` when even the full-page capture
/// failed — never an error.
pub async fn capture_region(page: &Page, dir: &Path, slug: &str) -> Option<PathBuf> {
    let bytes = narrowest_region_png(page).await?;

    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!("cannot create screenshot dir {:?}: {}", dir, e);
        return None;
    }

    let filename = format!(
        "{}_{}.png",
        sanitize_slug(slug),
        chrono::Utc::now().timestamp_millis()
    );
    let path = dir.join(filename);
    match std::fs::write(&path, &bytes) {
        Ok(()) => {
            info!("screenshot saved: {} ({} bytes)", path.display(), bytes.len());
            Some(path)
        }
        Err(e) => {
            warn!("failed to write screenshot {:?}: {}", path, e);
            None
        }
    }
}

async fn narrowest_region_png(page: &Page) -> Option<Vec<u8>> {
    for selector in RESULT_REGION_SELECTORS {
        if let Ok(element) = page.find_element(*selector).await {
            match element.screenshot(CaptureScreenshotFormat::Png).await {
                Ok(bytes) => return Some(bytes),
                Err(e) => warn!("region capture {} failed: {}", selector, e),
            }
        }
    }

    // Full viewport as the last resort.
    match page
        .screenshot(
            ScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build(),
        )
        .await
    {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("full-page capture failed: {}", e);
            None
        }
    }
}

fn sanitize_slug(slug: &str) -> String {
    let cleaned: String = slug
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "page".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_sanitization() {
        assert_eq!(sanitize_slug("MOW-LED 25.12"), "MOW_LED_25_12");
        assert_eq!(sanitize_slug(""), "page");
        assert_eq!(sanitize_slug("поиск"), "_____");
    }
}
