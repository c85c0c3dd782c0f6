//! Mission state machine (§4.5). Pure and stateless: every transition is a
//! function of the current status and `Δh = (simTime − TOT) / 1h`. Exposed
//! as a single-step function plus a fixpoint driver so a tick that jumps
//! several hours (high compression ratio) still walks through every
//! intervening state rather than skipping ahead (§8 invariant).

use chrono::{DateTime, Utc};

use crate::types::MissionStatus;

/// One legal step, or `None` if `delta_hours` does not clear the next
/// transition's threshold. Terminal states (`Delayed`, `Lost`) and
/// `Recovered` never advance further here — they change only via MSEL
/// effects or stay put.
fn next_step(current: MissionStatus, delta_hours: f64) -> Option<MissionStatus> {
    use MissionStatus::*;
    let (next, threshold) = match current {
        Planned => (Briefed, -4.0),
        Briefed => (Launched, -2.0),
        Launched => (Airborne, -1.5),
        Airborne => (OnStation, -0.5),
        OnStation => (Engaged, 0.0),
        Engaged => (Egressing, 0.25),
        Egressing => (Rtb, 1.0),
        Rtb => (Recovered, 3.0),
        Recovered | Delayed | Lost => return None,
    };

    if delta_hours >= threshold {
        Some(next)
    } else {
        None
    }
}

/// Advance `current` as far as `delta_hours` allows, one state at a time.
pub fn advance(current: MissionStatus, delta_hours: f64) -> MissionStatus {
    let mut status = current;
    while let Some(next) = next_step(status, delta_hours) {
        status = next;
    }
    status
}

/// `Δh = (simTime − TOT) / 1h` for a mission's TOT window, if it has one.
pub fn delta_hours(sim_time: DateTime<Utc>, tot: DateTime<Utc>) -> f64 {
    (sim_time - tot).num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn planned_at_minus_three_hours_becomes_briefed() {
        let tot = t0();
        let sim_time = tot - Duration::hours(3);
        let dh = delta_hours(sim_time, tot);
        assert_eq!(advance(MissionStatus::Planned, dh), MissionStatus::Briefed);
    }

    #[test]
    fn large_jump_walks_through_every_intervening_state() {
        let tot = t0();
        // Δh = +4h should walk PLANNED all the way to RECOVERED (>= 3h threshold).
        let sim_time = tot + Duration::hours(4);
        let dh = delta_hours(sim_time, tot);
        assert_eq!(advance(MissionStatus::Planned, dh), MissionStatus::Recovered);
    }

    #[test]
    fn no_transition_when_threshold_unmet() {
        let tot = t0();
        let sim_time = tot - Duration::hours(6);
        let dh = delta_hours(sim_time, tot);
        assert_eq!(advance(MissionStatus::Planned, dh), MissionStatus::Planned);
    }

    #[test]
    fn terminal_states_never_advance() {
        assert_eq!(advance(MissionStatus::Delayed, 100.0), MissionStatus::Delayed);
        assert_eq!(advance(MissionStatus::Lost, 100.0), MissionStatus::Lost);
        assert_eq!(advance(MissionStatus::Recovered, 100.0), MissionStatus::Recovered);
    }

    #[test]
    fn exact_table_boundaries() {
        let tot = t0();
        assert_eq!(advance(MissionStatus::Briefed, delta_hours(tot - Duration::hours(2), tot)), MissionStatus::Launched);
        assert_eq!(advance(MissionStatus::Launched, delta_hours(tot - Duration::minutes(90), tot)), MissionStatus::Airborne);
        assert_eq!(advance(MissionStatus::OnStation, delta_hours(tot, tot)), MissionStatus::Engaged);
    }
}
