use std::path::PathBuf;

use serde::Serialize;

use crate::upgrade::eligibility::EligibilityVerdict;

/// One award-availability request. Built by the caller (the conversational
/// front end supplies already-resolved 3-letter location codes); the date is
/// still validated here before any browser work.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub origin: String,
    pub destination: String,
    /// `DD.MM.YYYY`
    pub date: String,
    pub direct_only: bool,
}

impl SearchQuery {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        date: impl Into<String>,
        direct_only: bool,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            date: date.into(),
            direct_only,
        }
    }
}

/// One itinerary row extracted from the results list.
///
/// Unresolved fields stay `None` — a missing price is not a free ticket, and
/// downstream formatting must be able to tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightRecord {
    /// `HH:MM`, or `None` when no time-shaped text was found in the row.
    pub departure_time: Option<String>,
    /// Carrier+number tokens, unique, first-seen order preserved.
    pub flight_numbers: Vec<String>,
    pub seats: Option<u32>,
    pub miles: Option<u64>,
    pub surcharge: Option<u64>,
}

/// What the extraction run concluded. "No tickets" is a successful outcome,
/// never an error.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Success {
        direct: Vec<FlightRecord>,
        connecting: Vec<FlightRecord>,
    },
    NoTickets,
    Timeout {
        message: String,
    },
    Error {
        message: String,
    },
}

/// Outcome plus the visual-verification artifact. A screenshot is attempted
/// on every path; the caller owns transmission and deletion of the file.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    #[serde(flatten)]
    pub outcome: SearchOutcome,
    pub screenshot: Option<PathBuf>,
}

/// Per-leg detail recovered from a booking group by positional alignment.
/// Any field may be missing when the heuristics could not line up — partial
/// detail is expected, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegDetail {
    /// `DD.MM.YYYY`
    pub date: Option<String>,
    pub flight_number: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl LegDetail {
    /// True when enough detail survived to re-check availability for this leg.
    pub fn is_routable(&self) -> bool {
        self.date.is_some() && self.origin.is_some() && self.destination.is_some()
    }
}

/// One physical flight leg found in a booking record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSegment {
    pub route: String,
    pub fare_code: String,
    pub fare_class: String,
    pub special_region: bool,
    pub detail: LegDetail,
}

/// A booking segment together with its upgrade verdict and, for eligible
/// segments with a recoverable route, the award availability on that leg.
#[derive(Debug, Serialize)]
pub struct SegmentAssessment {
    #[serde(flatten)]
    pub segment: BookingSegment,
    #[serde(flatten)]
    pub verdict: EligibilityVerdict,
    pub availability: Option<SearchReport>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpgradeReport {
    Success {
        segments: Vec<SegmentAssessment>,
        all_eligible: bool,
    },
    Error {
        message: String,
        screenshot: Option<PathBuf>,
    },
}
