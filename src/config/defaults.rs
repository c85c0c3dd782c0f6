//! System-wide default constants, grouped by subsystem (§6 environment
//! configuration).

/// Wall-clock tick interval driving the tick loop (ms).
pub const TICK_INTERVAL_MS: u64 = 1_000;

/// Wall-clock interval driving the position/satellite propagation loop (ms).
pub const POSITION_UPDATE_INTERVAL_MS: u64 = 2_000;

/// Default sim-time compression ratio (sim seconds per wall-clock second).
pub const DEFAULT_COMPRESSION_RATIO: f64 = 720.0;

/// Coverage cycle cadence: every Nth position-loop iteration.
pub const COVERAGE_CYCLE_EVERY_N_ITERATIONS: u64 = 5;

/// Fulfillment threshold for `checkFulfillment` (§4.2).
pub const DEFAULT_FULFILLMENT_THRESHOLD: f64 = 0.8;

/// Default HTTP bind port.
pub const DEFAULT_PORT: u16 = 3001;

/// Satellite catalog cache TTL (seconds).
pub const CATALOG_CACHE_TTL_SECS: u64 = 3_600;

/// LLM retry defaults (§4.4).
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const RETRY_TOKEN_ESCALATION: u32 = 4_000;
pub const RETRY_BACKOFF_BASE_MS: u64 = 1_000;

/// Coverage window sampling step (minutes) for `computeCoverageWindows`.
pub const COVERAGE_STEP_MIN: i64 = 1;

/// Earth gravitational parameter, km^3/s^2 (§4.1).
pub const EARTH_MU_KM3_S2: f64 = 398_600.4418;

/// Earth mean radius, km (§4.2 elevation geometry).
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// GEO altitude pinned when `1400 < periodMin < 1500` (§4.1).
pub const GEO_ALTITUDE_KM: f64 = 35_786.0;
