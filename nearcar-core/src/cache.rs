//! Result cache implementations: a pass-through and an in-memory store.

use std::hash::Hash;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::{Coordinate, Minutes, PredictionSet, VehicleSet};
use crate::ports::{CacheError, ResultCache};

/// Cache that never holds anything. Every lookup is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl ResultCache for NoopCache {
    async fn lookup_vehicles(
        &self,
        _target: &Coordinate,
        _limit: usize,
    ) -> Result<Option<VehicleSet>, CacheError> {
        Ok(None)
    }

    async fn lookup_predictions(
        &self,
        _target: &Coordinate,
        _sources: &[Coordinate],
    ) -> Result<Option<PredictionSet>, CacheError> {
        Ok(None)
    }
}

/// Bit-exact key for a coordinate. `-0.0` folds into `0.0` so keys agree with `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PointKey(u64, u64);

impl From<&Coordinate> for PointKey {
    fn from(coordinate: &Coordinate) -> Self {
        Self(
            normalized_bits(coordinate.latitude),
            normalized_bits(coordinate.longitude),
        )
    }
}

fn normalized_bits(value: f64) -> u64 {
    if value == 0.0 { 0.0_f64.to_bits() } else { value.to_bits() }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

impl<T> Entry<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Entries kept per map when no capacity is given.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// In-process cache with per-entry time-to-live and a bounded size.
///
/// Expired entries are dropped on lookup, and swept on store once a map is full.
/// If a full map holds nothing expired, its oldest entries make room.
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    capacity: usize,
    vehicles: DashMap<(PointKey, usize), Entry<VehicleSet>>,
    predictions: DashMap<(PointKey, Vec<PointKey>), Entry<PredictionSet>>,
}

impl MemoryCache {
    /// Create an empty cache whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CACHE_CAPACITY)
    }

    /// Create an empty cache holding at most `capacity` vehicle sets and as many prediction
    /// sets. A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            vehicles: DashMap::new(),
            predictions: DashMap::new(),
        }
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vehicles.len() + self.predictions.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh<K, T>(&self, map: &DashMap<K, Entry<T>>, key: &K) -> Option<T>
    where
        K: Eq + Hash,
        T: Clone,
    {
        {
            let entry = map.get(key)?;
            if entry.is_fresh(self.ttl) {
                return Some(entry.value.clone());
            }
        }
        // A concurrent store may have refreshed the entry since the read guard dropped.
        map.remove_if(key, |_, entry| !entry.is_fresh(self.ttl));
        None
    }

    fn insert<K, T>(&self, map: &DashMap<K, Entry<T>>, key: K, value: T)
    where
        K: Eq + Hash + Clone,
    {
        if !map.contains_key(&key) && map.len() >= self.capacity {
            map.retain(|_, entry| entry.is_fresh(self.ttl));
            while map.len() >= self.capacity {
                let oldest = map
                    .iter()
                    .min_by_key(|entry| entry.stored_at)
                    .map(|entry| entry.key().clone());
                let Some(oldest) = oldest else { break };
                map.remove(&oldest);
            }
        }
        map.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

fn sources_key(sources: &[Coordinate]) -> Vec<PointKey> {
    sources.iter().map(PointKey::from).collect()
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn lookup_vehicles(
        &self,
        target: &Coordinate,
        limit: usize,
    ) -> Result<Option<VehicleSet>, CacheError> {
        Ok(self.fresh(&self.vehicles, &(PointKey::from(target), limit)))
    }

    async fn lookup_predictions(
        &self,
        target: &Coordinate,
        sources: &[Coordinate],
    ) -> Result<Option<PredictionSet>, CacheError> {
        Ok(self.fresh(
            &self.predictions,
            &(PointKey::from(target), sources_key(sources)),
        ))
    }

    async fn store_vehicles(
        &self,
        target: &Coordinate,
        limit: usize,
        vehicles: &[Coordinate],
    ) -> Result<(), CacheError> {
        self.insert(&self.vehicles, (PointKey::from(target), limit), vehicles.to_vec());
        Ok(())
    }

    async fn store_predictions(
        &self,
        target: &Coordinate,
        sources: &[Coordinate],
        minutes: &[Minutes],
    ) -> Result<(), CacheError> {
        self.insert(
            &self.predictions,
            (PointKey::from(target), sources_key(sources)),
            minutes.to_vec(),
        );
        Ok(())
    }
}
