//! Mileage-upgrade eligibility: a small deterministic rule table over the
//! fare code and the route's region flag. Pure — no I/O, no hidden state.

use serde::Serialize;

/// Fare-basis substrings marking the top tier of each cabin family.
pub const TOP_TIER_CODES: &[&str] = &["FM", "FO", "PM", "XM"];

/// Exact fare bases that qualify only on the special-region routes.
pub const REGIONAL_SPECIAL_CODES: &[&str] = &["BPXOWRF", "BPXRTRF"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    TopTierFare,
    RegionalSpecialFare,
    FareTierNotQualified,
}

impl ReasonCode {
    /// Human wording used in the report the front end relays.
    pub fn describe(&self) -> &'static str {
        match self {
            ReasonCode::TopTierFare => "Тариф группы Максимум (FM/FO/PM/XM)",
            ReasonCode::RegionalSpecialFare => "Спецтариф для Калининграда (BPX)",
            ReasonCode::FareTierNotQualified => {
                "Тариф не является Эконом-Максимум или Комфорт-Максимум"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub reason: ReasonCode,
}

/// Rule 1: the fare code *contains* (not merely ends with) a top-tier
/// substring — checked first and short-circuiting. Rule 2: special-region
/// route with one of the exact regional fare bases. Everything else does not
/// qualify.
pub fn check_eligibility(fare_code: &str, special_region: bool) -> EligibilityVerdict {
    let code = fare_code.trim().to_uppercase();

    if TOP_TIER_CODES.iter().any(|sub| code.contains(sub)) {
        return EligibilityVerdict {
            eligible: true,
            reason: ReasonCode::TopTierFare,
        };
    }

    if special_region && REGIONAL_SPECIAL_CODES.iter().any(|c| code == *c) {
        return EligibilityVerdict {
            eligible: true,
            reason: ReasonCode::RegionalSpecialFare,
        };
    }

    EligibilityVerdict {
        eligible: false,
        reason: ReasonCode::FareTierNotQualified,
    }
}
