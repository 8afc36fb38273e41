// src/export/model.rs

use serde::Serialize;

/// One exported line: a member and their rounded weekly total.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub member_id: String,
    pub display_name: String,
    pub total_hours: i64,
}

/// Header for CSV / JSON exports.
pub(crate) fn get_headers() -> [&'static str; 3] {
    ["memberId", "displayName", "totalHours"]
}

/// Integer hours shown in the weekly report.
///
/// The fractional part is first rounded to one decimal (ties to even at
/// that decimal, so `.45` becomes `.4` and `.55` becomes `.6`); a result of
/// `.5` or more rounds the total up, anything else rounds it down.
pub fn round_hours(accrued: f64) -> i64 {
    if !accrued.is_finite() || accrued <= 0.0 {
        return 0;
    }
    let whole = accrued.floor();

    // millionths absorb binary noise: 7.45 is stored as 7.4500000000000002
    let micro = ((accrued - whole) * 1_000_000.0).round() as i64;
    let mut tenths = micro / 100_000;
    let rem = micro % 100_000;
    if rem > 50_000 || (rem == 50_000 && tenths % 2 == 1) {
        tenths += 1;
    }

    if tenths >= 5 {
        whole as i64 + 1
    } else {
        whole as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_examples() {
        assert_eq!(round_hours(7.45), 7);
        assert_eq!(round_hours(7.5), 8);
        assert_eq!(round_hours(7.0), 7);
    }

    #[test]
    fn fraction_is_rounded_before_comparing() {
        assert_eq!(round_hours(7.49), 8);
        assert_eq!(round_hours(7.44), 7);
        assert_eq!(round_hours(7.55), 8);
        assert_eq!(round_hours(7.96), 8);
        assert_eq!(round_hours(0.3), 0);
    }

    #[test]
    fn empty_or_invalid_totals_export_as_zero() {
        assert_eq!(round_hours(0.0), 0);
        assert_eq!(round_hours(-2.0), 0);
        assert_eq!(round_hours(f64::NAN), 0);
    }
}
