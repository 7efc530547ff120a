use std::time::Duration;

/// Failures that are meaningful at the pipeline boundary.
///
/// Everything else (a click that missed, a price heuristic that found
/// nothing) is degraded locally and never surfaces as an error — see the
/// extraction modules.  Internal browser plumbing uses `anyhow` and is
/// downcast against this enum at the boundary to pick the right result
/// variant.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    /// Malformed travel date — rejected before any browser work starts.
    #[error("invalid travel date '{0}': expected DD.MM.YYYY")]
    InvalidDate(String),

    /// The page did not settle within the navigation budget.
    #[error("page did not settle within {0:?}")]
    NavigationTimeout(Duration),
}
