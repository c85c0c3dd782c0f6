//! Satellite catalog client (§6 external services) — the UDL-shaped
//! elset service the Space Propagator and Scenario Generator pull TLEs
//! from. Out of scope per spec.md §1 (an external collaborator); this
//! module only defines the contract plus one `reqwest`-backed
//! implementation, grounded in the teacher's `fleet::client::FleetClient`
//! (HTTP Basic here instead of bearer, per §6) and its `(key, expiry)`
//! cache shape in `hub::auth::api_key`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::defaults::CATALOG_CACHE_TTL_SECS;

/// Cache TTL for a `(satNo, dateKey)` lookup (§6: "cached by (satNo,
/// dateKey) with 1 h TTL").
const CACHE_TTL: Duration = Duration::from_secs(CATALOG_CACHE_TTL_SECS);

#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("endpoint returned status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One element set returned by the catalog (§6 response shape).
#[derive(Debug, Clone, Deserialize)]
pub struct ElsetRecord {
    pub line1: String,
    pub line2: String,
    pub inclination: f64,
    pub eccentricity: f64,
    pub period: f64,
    pub apogee: f64,
    pub perigee: f64,
    pub epoch: DateTime<Utc>,
    pub source: String,
}

/// Contract the rest of the system depends on — `SatelliteCatalog` is a
/// trait so tests inject a fake, the same dependency-inversion shape as
/// `LlmClient` and `PersistenceLayer`.
#[async_trait::async_trait]
pub trait SatelliteCatalog: Send + Sync {
    /// `GET /elset/current?satNo=N`.
    async fn current(&self, sat_no: u32) -> Result<Option<ElsetRecord>, CatalogClientError>;

    /// `GET /elset/history?satNo=N&epoch=<ISO>/<ISO>&orderBy=epoch desc&limit=1`.
    async fn history_at(
        &self,
        sat_no: u32,
        epoch: DateTime<Utc>,
    ) -> Result<Option<ElsetRecord>, CatalogClientError>;
}

/// One day's cache key granularity, per §6 "(satNo, dateKey)".
fn date_key(epoch: DateTime<Utc>) -> String {
    epoch.format("%Y-%m-%d").to_string()
}

struct CacheEntry {
    record: Option<ElsetRecord>,
    expires_at: Instant,
}

/// `reqwest`-backed client over HTTP Basic auth, caching lookups for an
/// hour so a scenario regenerating its constellation every tick does not
/// hammer the upstream catalog.
pub struct HttpSatelliteCatalog {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    cache: RwLock<HashMap<(u32, String), CacheEntry>>,
}

impl HttpSatelliteCatalog {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("failed to build reqwest client"),
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    async fn cached(&self, key: &(u32, String)) -> Option<Option<ElsetRecord>> {
        let cache = self.cache.read().await;
        cache.get(key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.record.clone())
            } else {
                None
            }
        })
    }

    async fn store(&self, key: (u32, String), record: Option<ElsetRecord>) {
        let mut cache = self.cache.write().await;
        cache.insert(key, CacheEntry { record, expires_at: Instant::now() + CACHE_TTL });
    }

    async fn get_list(&self, url: String) -> Result<Option<ElsetRecord>, CatalogClientError> {
        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|e| CatalogClientError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogClientError::Status(status.as_u16()));
        }

        let records: Vec<ElsetRecord> = resp
            .json()
            .await
            .map_err(|e| CatalogClientError::Malformed(e.to_string()))?;

        Ok(records.into_iter().next())
    }
}

#[async_trait::async_trait]
impl SatelliteCatalog for HttpSatelliteCatalog {
    async fn current(&self, sat_no: u32) -> Result<Option<ElsetRecord>, CatalogClientError> {
        let key = (sat_no, "current".to_string());
        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        let url = format!("{}/elset/current?satNo={sat_no}", self.base_url);
        let record = self.get_list(url).await?;
        self.store(key, record.clone()).await;
        Ok(record)
    }

    async fn history_at(
        &self,
        sat_no: u32,
        epoch: DateTime<Utc>,
    ) -> Result<Option<ElsetRecord>, CatalogClientError> {
        let key = (sat_no, date_key(epoch));
        if let Some(cached) = self.cached(&key).await {
            return Ok(cached);
        }

        let url = format!(
            "{}/elset/history?satNo={sat_no}&epoch={}/{}&orderBy=epoch%20desc&limit=1",
            self.base_url,
            epoch.to_rfc3339(),
            Utc::now().to_rfc3339(),
        );
        let record = self.get_list(url).await?;
        self.store(key, record.clone()).await;
        Ok(record)
    }
}

/// §7 "external-service transient" policy: a catalog failure is tolerated
/// by the caller, which continues with whatever orbital data it already
/// has rather than propagating.
pub async fn best_effort_current(
    catalog: &dyn SatelliteCatalog,
    sat_no: u32,
) -> Option<ElsetRecord> {
    match catalog.current(sat_no).await {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!(sat_no, error = %err, "satellite catalog lookup failed, continuing with prior data");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCatalog {
        record: Option<ElsetRecord>,
    }

    #[async_trait::async_trait]
    impl SatelliteCatalog for FakeCatalog {
        async fn current(&self, _sat_no: u32) -> Result<Option<ElsetRecord>, CatalogClientError> {
            Ok(self.record.clone())
        }

        async fn history_at(
            &self,
            _sat_no: u32,
            _epoch: DateTime<Utc>,
        ) -> Result<Option<ElsetRecord>, CatalogClientError> {
            Ok(self.record.clone())
        }
    }

    #[tokio::test]
    async fn best_effort_current_tolerates_absence() {
        let catalog = FakeCatalog { record: None };
        assert!(best_effort_current(&catalog, 25544).await.is_none());
    }

    #[test]
    fn date_key_is_day_granular() {
        let a = Utc::now();
        let b = a + chrono::Duration::hours(1);
        assert_eq!(date_key(a), date_key(b));
    }
}
