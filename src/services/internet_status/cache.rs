use super::InternetStatus;
use log::error;
use std::{
    sync::Mutex,
    time::{Duration, Instant, SystemTime},
};

/// Single-slot cache for the last acquired internet status
///
/// Value and timestamp are replaced together under one lock, so readers
/// never see a value from one acquisition paired with the time of another.
pub struct StatusCache {
    ttl: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

#[derive(Clone, Copy)]
struct CacheEntry {
    status: InternetStatus,
    fetched_at: Instant,
    fetched_at_wall: SystemTime,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached status if it is younger than the TTL
    pub fn fresh(&self) -> Option<InternetStatus> {
        let entry = self.entry()?;
        (entry.fetched_at.elapsed() < self.ttl).then_some(entry.status)
    }

    /// Cached status regardless of its age
    pub fn last(&self) -> Option<InternetStatus> {
        self.entry().map(|entry| entry.status)
    }

    /// Wall-clock time of the last store, in milliseconds since the epoch
    pub fn fetched_at_epoch_millis(&self) -> Option<u128> {
        let entry = self.entry()?;
        entry
            .fetched_at_wall
            .duration_since(SystemTime::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis())
    }

    pub fn store(&self, status: InternetStatus) {
        let entry = CacheEntry {
            status,
            fetched_at: Instant::now(),
            fetched_at_wall: SystemTime::now(),
        };

        match self.entry.lock() {
            Ok(mut guard) => *guard = Some(entry),
            Err(e) => error!("failed to store internet status: {e}"),
        }
    }

    fn entry(&self) -> Option<CacheEntry> {
        match self.entry.lock() {
            Ok(guard) => *guard,
            Err(e) => {
                error!("failed to read internet status cache: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::internet_status::{Health, Speed};

    fn status(download: f64) -> InternetStatus {
        InternetStatus {
            speed: Speed {
                download,
                upload: 20.0,
            },
            health: Health::Stable,
        }
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = StatusCache::new(Duration::from_secs(30));

        assert_eq!(cache.fresh(), None);
        assert_eq!(cache.last(), None);
        assert_eq!(cache.fetched_at_epoch_millis(), None);
    }

    #[test]
    fn stored_value_is_fresh_within_ttl() {
        let cache = StatusCache::new(Duration::from_secs(30));
        cache.store(status(100.0));

        assert_eq!(cache.fresh(), Some(status(100.0)));
        assert!(cache.fetched_at_epoch_millis().is_some());
    }

    #[test]
    fn store_replaces_previous_value() {
        let cache = StatusCache::new(Duration::from_secs(30));
        cache.store(status(100.0));
        cache.store(status(200.0));

        assert_eq!(cache.last(), Some(status(200.0)));
    }

    #[test]
    fn expired_value_is_not_fresh_but_still_known() {
        let cache = StatusCache::new(Duration::ZERO);
        cache.store(status(100.0));

        assert_eq!(cache.fresh(), None);
        assert_eq!(cache.last(), Some(status(100.0)));
    }
}
