//! DTG (date-time-group) parsing for MSEL injects (§4.6 EVENT_LIST case).
//!
//! Military DTG format: `DDHHMMZ MON YY` (e.g. `251030Z JUL 26` = the 25th,
//! 10:30Z, July 2026). Parsed relative to the scenario start date to yield
//! `(triggerDay, triggerHour)`.

use chrono::{DateTime, NaiveDate, Utc};

fn month_number(mon: &str) -> Option<u32> {
    match mon.to_uppercase().as_str() {
        "JAN" => Some(1),
        "FEB" => Some(2),
        "MAR" => Some(3),
        "APR" => Some(4),
        "MAY" => Some(5),
        "JUN" => Some(6),
        "JUL" => Some(7),
        "AUG" => Some(8),
        "SEP" => Some(9),
        "OCT" => Some(10),
        "NOV" => Some(11),
        "DEC" => Some(12),
        _ => None,
    }
}

/// Parse a `DDHHMMZ MON YY` DTG string into `(triggerDay, triggerHour)`
/// relative to `scenario_start`. Returns `None` on any malformed input —
/// callers fall back to day 0 / hour 0 per the documented safe default.
pub fn parse_dtg(dtg: &str, scenario_start: DateTime<Utc>) -> Option<(i64, i32)> {
    let parts: Vec<&str> = dtg.split_whitespace().collect();
    if parts.len() != 3 {
        return None;
    }

    let head = parts[0].trim_end_matches(['Z', 'z']);
    if head.len() != 6 || !head.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let day: u32 = head[0..2].parse().ok()?;
    let hour: u32 = head[2..4].parse().ok()?;
    let _minute: u32 = head[4..6].parse().ok()?;

    let month = month_number(parts[1])?;
    let year_suffix: i32 = parts[2].parse().ok()?;
    let year = if year_suffix < 100 { 2000 + year_suffix } else { year_suffix };

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let instant = date.and_hms_opt(hour, 0, 0)?.and_utc();

    let trigger_day = (instant.date_naive() - scenario_start.date_naive()).num_days().max(0);
    Some((trigger_day, hour as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_standard_dtg() {
        let scenario_start = Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).unwrap();
        let (day, hour) = parse_dtg("251030Z JUL 26", scenario_start).unwrap();
        assert_eq!(day, 24);
        assert_eq!(hour, 10);
    }

    #[test]
    fn malformed_dtg_returns_none() {
        let scenario_start = Utc::now();
        assert!(parse_dtg("not a dtg", scenario_start).is_none());
    }
}
