//! Carrier detection from tracking-number formats
//!
//! Detection is a pure function of the normalized (trimmed, uppercased)
//! tracking number. Patterns are tested in [`CarrierId::ALL`] order; the
//! patterns are disjoint by construction, and if two ever overlap the first
//! declared carrier wins. Absence of a match is a normal return value, not
//! an error.

use crate::model::CarrierId;
use regex::Regex;
use std::sync::LazyLock;

/// UPS: "1Z" prefix followed by 15-16 alphanumerics
pub const UPS_PATTERN: &str = r"^1Z[0-9A-Z]{15,16}$";

/// FedEx: 12-14 digits
pub const FEDEX_PATTERN: &str = r"^[0-9]{12,14}$";

/// USPS: 20-23 digits starting with a 9xxx service prefix
pub const USPS_PATTERN: &str = r"^(9[0-9]{3})[0-9]{15,18}$";

static PATTERNS: LazyLock<Vec<(CarrierId, Regex)>> = LazyLock::new(|| {
    CarrierId::ALL
        .iter()
        .map(|&id| {
            let pattern = pattern_for(id);
            let regex = Regex::new(pattern)
                .unwrap_or_else(|e| panic!("invalid builtin pattern for {id}: {e}"));
            (id, regex)
        })
        .collect()
});

/// The detection pattern for a carrier
pub fn pattern_for(id: CarrierId) -> &'static str {
    match id {
        CarrierId::Ups => UPS_PATTERN,
        CarrierId::Fedex => FEDEX_PATTERN,
        CarrierId::Usps => USPS_PATTERN,
    }
}

/// Detect the carrier for a raw tracking number
///
/// Normalizes by trimming whitespace and uppercasing, then tests each
/// carrier's pattern in priority order. Returns `None` when no pattern
/// matches. Side-effect free and total.
pub fn detect_carrier(raw: &str) -> Option<CarrierId> {
    let normalized = raw.trim().to_uppercase();

    PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(&normalized))
        .map(|(id, _)| *id)
}

/// Whether a raw string is a recognizable tracking number
pub fn is_valid_tracking_number(raw: &str) -> bool {
    detect_carrier(raw).is_some()
}
