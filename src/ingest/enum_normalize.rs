//! Enum normalization (§4.6) — every enum-typed field extracted from LLM
//! output is coerced through here before persistence. LLMs reliably produce
//! near-miss enum strings ("airborne refuelling" instead of `TANKER`); the
//! rewrite keeps the normalize stage's strict schema but treats its enum
//! fields as untrusted strings until they pass through this module, the
//! same "never trust model output for a closed vocabulary" lesson the
//! teacher's `Severity::from_str_loose` applies to LLM-derived severity
//! strings in `director/llm_director.rs`.
//!
//! Each `normalize_*` function is total: unknown input never panics or
//! errors, it falls through to the documented safe default and reports
//! `reviewed = true` so the caller can bump `IngestLog.reviewFlagCount`.

use crate::types::{CapabilityType, SupportType, TimeWindowType, WaypointType};

pub struct Normalized<T> {
    pub value: T,
    pub reviewed: bool,
}

fn clean(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Exact canonical name match (case-insensitive, underscores/spaces/hyphens
/// equivalent) tried before any fuzzy fallback.
fn exact_match<T: Copy>(s: &str, table: &[(&str, T)]) -> Option<T> {
    let normalized = clean(s).replace(['_', '-'], " ");
    table
        .iter()
        .find(|(name, _)| name.replace(['_', '-'], " ") == normalized)
        .map(|(_, value)| *value)
}

pub fn normalize_waypoint_type(raw: &str) -> Normalized<WaypointType> {
    use WaypointType::*;
    const EXACT: &[(&str, WaypointType)] = &[
        ("dep", Dep),
        ("departure", Dep),
        ("ip", Ip),
        ("initial point", Ip),
        ("cp", Cp),
        ("control point", Cp),
        ("tgt", Tgt),
        ("target", Tgt),
        ("egr", Egr),
        ("egress", Egr),
        ("rec", Rec),
        ("recovery", Rec),
        ("orbit", Orbit),
        ("refuel", Refuel),
        ("cap", Cap),
        ("patrol", Patrol),
    ];
    if let Some(value) = exact_match(raw, EXACT) {
        return Normalized { value, reviewed: false };
    }

    let lower = clean(raw);
    let value = if lower.contains("depart") || lower.contains("takeoff") {
        Dep
    } else if lower.contains("initial") {
        Ip
    } else if lower.contains("target") || lower.contains("tot") {
        Tgt
    } else if lower.contains("egress") || lower.contains("exit") {
        Egr
    } else if lower.contains("recover") || lower.contains("land") {
        Rec
    } else if lower.contains("orbit") || lower.contains("holding") {
        Orbit
    } else if lower.contains("tank") || lower.contains("refuel") || lower.contains("aar") {
        Refuel
    } else if lower.contains("cap") || lower.contains("combat air patrol") {
        Cap
    } else if lower.contains("patrol") {
        Patrol
    } else {
        // §4.6: unknown waypointType -> CP.
        return Normalized { value: Cp, reviewed: true };
    };
    Normalized { value, reviewed: false }
}

pub fn normalize_window_type(raw: &str) -> Normalized<TimeWindowType> {
    use TimeWindowType::*;
    const EXACT: &[(&str, TimeWindowType)] = &[
        ("tot", Tot),
        ("time on target", Tot),
        ("onsta", Onsta),
        ("on station", Onsta),
        ("launch", Launch),
        ("recovery", Recovery),
    ];
    if let Some(value) = exact_match(raw, EXACT) {
        return Normalized { value, reviewed: false };
    }

    let lower = clean(raw);
    let value = if lower.contains("tot") || lower.contains("target") {
        Tot
    } else if lower.contains("orbit") || lower.contains("onsta") || lower.contains("on station") {
        Onsta
    } else if lower.contains("launch") {
        Launch
    } else if lower.contains("recover") || lower.contains("rtb") {
        Recovery
    } else {
        // §4.6: unknown windowType -> TOT.
        return Normalized { value: Tot, reviewed: true };
    };
    Normalized { value, reviewed: false }
}

pub fn normalize_support_type(raw: &str) -> Normalized<SupportType> {
    use SupportType::*;
    const EXACT: &[(&str, SupportType)] = &[
        ("tanker", Tanker),
        ("sead", Sead),
        ("isr", Isr),
        ("awacs", Awacs),
        ("escort", Escort),
        ("cas", Cas),
        ("strike", Strike),
        ("ew", Ew),
    ];
    if let Some(value) = exact_match(raw, EXACT) {
        return Normalized { value, reviewed: false };
    }

    let lower = clean(raw);
    let value = if lower.contains("tank") || lower.contains("refuel") || lower.contains("aar") {
        Tanker
    } else if lower.contains("sead") || lower.contains("suppress") {
        Sead
    } else if lower.contains("ssurv") || lower.contains("recon") || lower.contains("isr") {
        Isr
    } else if lower.contains("awacs") || lower.contains("airborne warning") {
        Awacs
    } else if lower.contains("escort") || lower.contains("fighter cover") {
        Escort
    } else if lower.contains("cas") || lower.contains("close air support") {
        Cas
    } else if lower.contains("strike") || lower.contains("attack") {
        Strike
    } else if lower.contains("jam") || lower.contains("electronic warfare") || lower.contains("ew") {
        Ew
    } else {
        // §4.6: unknown supportType -> ISR.
        return Normalized { value: Isr, reviewed: true };
    };
    Normalized { value, reviewed: false }
}

pub fn normalize_capability_type(raw: &str) -> Normalized<CapabilityType> {
    use CapabilityType::*;
    const EXACT: &[(&str, CapabilityType)] = &[
        ("gps", Gps),
        ("gps military", GpsMilitary),
        ("gps_military", GpsMilitary),
        ("satcom", Satcom),
        ("satcom protected", SatcomProtected),
        ("satcom wideband", SatcomWideband),
        ("opir", Opir),
        ("isr space", IsrSpace),
        ("isr_space", IsrSpace),
        ("sigint space", SigintSpace),
        ("link16", Link16),
        ("link 16", Link16),
        ("cyber space", CyberSpace),
        ("missile warning", MissileWarning),
        ("weather space", WeatherSpace),
        ("navwar", Navwar),
        ("space domain awareness", SpaceDomainAwareness),
        ("position nav timing", PositionNavTiming),
        ("pnt", PositionNavTiming),
        ("tactical satcom", TacticalSatcom),
        ("nuclear detection", NuclearDetection),
        ("communications relay", CommunicationsRelay),
    ];
    if let Some(value) = exact_match(raw, EXACT) {
        return Normalized { value, reviewed: false };
    }

    let lower = clean(raw);
    let value = if lower.contains("gps") && (lower.contains("mil") || lower.contains("m-code")) {
        GpsMilitary
    } else if lower.contains("gps") {
        Gps
    } else if lower.contains("protected") && lower.contains("satcom") {
        SatcomProtected
    } else if lower.contains("wideband") {
        SatcomWideband
    } else if lower.contains("satcom") || lower.contains("comms") {
        Satcom
    } else if lower.contains("opir") || lower.contains("overhead persistent infrared") {
        Opir
    } else if lower.contains("isr") || lower.contains("recon") {
        IsrSpace
    } else if lower.contains("sigint") {
        SigintSpace
    } else if lower.contains("link16") || lower.contains("link 16") || lower.contains("tadil") {
        Link16
    } else if lower.contains("cyber") {
        CyberSpace
    } else if lower.contains("missile warning") || lower.contains("mw") {
        MissileWarning
    } else if lower.contains("weather") {
        WeatherSpace
    } else if lower.contains("navwar") || lower.contains("jamming resist") {
        Navwar
    } else if lower.contains("domain awareness") || lower.contains("ssa") {
        SpaceDomainAwareness
    } else if lower.contains("pnt") || lower.contains("position") || lower.contains("timing") {
        PositionNavTiming
    } else if lower.contains("tactical satcom") {
        TacticalSatcom
    } else if lower.contains("nuclear detection") || lower.contains("nudet") {
        NuclearDetection
    } else if lower.contains("relay") {
        CommunicationsRelay
    } else {
        // §4.6: unknown capability -> GPS.
        return Normalized { value: Gps, reviewed: true };
    };
    Normalized { value, reviewed: false }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_type_coerces_airborne_refuelling_to_tanker() {
        let result = normalize_support_type("airborne refuelling");
        assert_eq!(result.value, SupportType::Tanker);
        assert!(!result.reviewed);
    }

    #[test]
    fn window_type_coerces_orbit_time_to_onsta() {
        let result = normalize_window_type("orbit time");
        assert_eq!(result.value, TimeWindowType::Onsta);
    }

    #[test]
    fn unknown_capability_falls_back_to_gps_and_flags_review() {
        let result = normalize_capability_type("FOO");
        assert_eq!(result.value, CapabilityType::Gps);
        assert!(result.reviewed);
    }

    #[test]
    fn unknown_waypoint_falls_back_to_cp() {
        let result = normalize_waypoint_type("zzz-unclassified");
        assert_eq!(result.value, WaypointType::Cp);
        assert!(result.reviewed);
    }

    #[test]
    fn unknown_support_falls_back_to_isr() {
        let result = normalize_support_type("zzz-unclassified");
        assert_eq!(result.value, SupportType::Isr);
        assert!(result.reviewed);
    }
}
