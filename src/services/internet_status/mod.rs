//! Internet status acquisition
//!
//! Obtains the current router throughput by trying an ordered list of
//! status sources (router API, SNMP, SSH). The first source that yields a
//! value wins; when every source fails the configured fallback status is
//! returned instead. Results are kept in a single-slot cache so that the
//! router is queried at most once per TTL unless a refresh is forced.

pub mod api;
pub mod cache;
pub mod snmp;
pub mod ssh;

pub use self::{
    api::RouterApiSource, cache::StatusCache, snmp::SnmpSource, ssh::SshSource,
};

use super::BoxFuture;
use crate::config::AppConfig;
use anyhow::Result;
use log::{debug, info, warn};
#[cfg(feature = "mock")]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use tokio::time::timeout;
use trait_variant::make;

/// Download throughput below this value (Mbps) is considered intermittent
pub const MIN_STABLE_DOWNLOAD_MBPS: f64 = 10.0;

/// Upload throughput below this value (Mbps) is considered intermittent
pub const MIN_STABLE_UPLOAD_MBPS: f64 = 5.0;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Health {
    Stable,
    Intermittent,
    Offline,
}

#[derive(Debug)]
pub struct UnknownHealth(String);

impl fmt::Display for UnknownHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown health \"{}\", expected Stable, Intermittent or Offline",
            self.0
        )
    }
}

impl std::error::Error for UnknownHealth {}

impl FromStr for Health {
    type Err = UnknownHealth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Stable" => Ok(Health::Stable),
            "Intermittent" => Ok(Health::Intermittent),
            "Offline" => Ok(Health::Offline),
            other => Err(UnknownHealth(other.to_string())),
        }
    }
}

impl Health {
    /// Coarse classification of a throughput measurement
    ///
    /// Either threshold alone is enough to downgrade to `Intermittent`.
    pub fn classify(speed: &Speed) -> Self {
        if speed.download == 0.0 && speed.upload == 0.0 {
            Health::Offline
        } else if speed.download < MIN_STABLE_DOWNLOAD_MBPS
            || speed.upload < MIN_STABLE_UPLOAD_MBPS
        {
            Health::Intermittent
        } else {
            Health::Stable
        }
    }
}

/// Throughput in Mbps
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Speed {
    pub download: f64,
    pub upload: f64,
}

impl Speed {
    pub fn is_valid(&self) -> bool {
        [self.download, self.upload]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct InternetStatus {
    pub speed: Speed,
    pub health: Health,
}

impl InternetStatus {
    /// Status whose health is derived from the measured speed
    pub fn derived(speed: Speed) -> Self {
        Self {
            health: Health::classify(&speed),
            speed,
        }
    }
}

/// Convert an octet rate to Mbps
pub fn bytes_per_sec_to_mbps(bytes_per_sec: u64) -> f64 {
    bytes_per_sec as f64 * 8.0 / 1_000_000.0
}

/// One transport-specific way of obtaining the internet status
pub trait StatusSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upper bound for a single `acquire` call
    fn timeout(&self) -> Duration;

    fn acquire(&self) -> BoxFuture<'_, Result<InternetStatus>>;
}

#[make(Send)]
#[cfg_attr(feature = "mock", automock)]
pub trait StatusProvider {
    /// Current internet status, never fails
    async fn internet_status(&self, force_refresh: bool) -> InternetStatus;
}

/// Ordered source chain with a static fallback and a TTL cache in front
pub struct StatusAcquisition {
    sources: Vec<Box<dyn StatusSource>>,
    fallback: InternetStatus,
    cache: StatusCache,
}

impl StatusAcquisition {
    pub fn new(
        sources: Vec<Box<dyn StatusSource>>,
        fallback: InternetStatus,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            sources,
            fallback,
            cache: StatusCache::new(cache_ttl),
        }
    }

    /// Build the router API, SNMP and SSH chain from the configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let sources: Vec<Box<dyn StatusSource>> = vec![
            Box::new(RouterApiSource::new(&config.router)?),
            Box::new(SnmpSource::new(&config.router)),
            Box::new(SshSource::new(&config.router)),
        ];

        Ok(Self::new(
            sources,
            config.status.fallback,
            config.status.cache_ttl,
        ))
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Run the source chain in order, first success wins
    async fn acquire(&self) -> InternetStatus {
        for source in &self.sources {
            match timeout(source.timeout(), source.acquire()).await {
                Ok(Ok(status)) => {
                    info!("internet status acquired via {}", source.name());
                    return status;
                }
                Ok(Err(e)) => warn!("{} status source failed: {e:#}", source.name()),
                Err(_) => warn!(
                    "{} status source timed out after {:?}",
                    source.name(),
                    source.timeout()
                ),
            }
        }

        warn!("all status sources failed, using fallback status");
        self.fallback
    }
}

impl StatusProvider for StatusAcquisition {
    async fn internet_status(&self, force_refresh: bool) -> InternetStatus {
        if !force_refresh {
            if let Some(status) = self.cache.fresh() {
                debug!(
                    "internet status served from cache (fetched at {} ms)",
                    self.cache.fetched_at_epoch_millis().unwrap_or_default()
                );
                return status;
            }
        }

        let status = self.acquire().await;
        self.cache.store(status);
        status
    }
}
