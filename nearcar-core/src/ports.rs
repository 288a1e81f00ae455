//! Traits describing the upstream capabilities and their collaborators.

use async_trait::async_trait;

use crate::model::{Coordinate, Minutes, PredictionSet, VehicleSet};

#[derive(thiserror::Error, Debug)]
#[error("Directory error: {0}")]
/// The upstream directory could not enumerate base addresses.
pub struct DirectoryError(pub String);

#[derive(thiserror::Error, Debug)]
#[error("Cache error: {0}")]
/// A result cache lookup or store failed. Never fatal for a fetch.
pub struct CacheError(pub String);

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the upstream cluster.
pub enum PortError {
    /// No upstream address was available to try.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// Every known address was attempted once and each attempt failed.
    #[error("All {attempts} upstream addresses failed")]
    AllUpstreamsFailed {
        /// Number of addresses attempted.
        attempts: usize,
    },
}

#[async_trait]
/// Source of the upstream base addresses, consulted fresh on every fetch.
pub trait UpstreamDirectory: Send + Sync {
    /// Current ordered list of base addresses such as `http://10.0.0.5:8080`.
    ///
    /// # Errors
    ///
    /// Returns a [`DirectoryError`] when the addresses cannot be enumerated.
    async fn urls(&self) -> Result<Vec<String>, DirectoryError>;
}

#[async_trait]
/// Best-effort cache consulted before any upstream call.
///
/// A lookup yields `Ok(None)` on a miss. Stores default to doing nothing so
/// read-only caches only need the two lookups.
pub trait ResultCache: Send + Sync {
    /// Vehicles previously fetched for `target` with the same `limit`.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the backing store fails.
    async fn lookup_vehicles(
        &self,
        target: &Coordinate,
        limit: usize,
    ) -> Result<Option<VehicleSet>, CacheError>;

    /// Predictions previously fetched for `target` and exactly these `sources`.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the backing store fails.
    async fn lookup_predictions(
        &self,
        target: &Coordinate,
        sources: &[Coordinate],
    ) -> Result<Option<PredictionSet>, CacheError>;

    /// Remember vehicles fetched from upstream.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the backing store fails.
    async fn store_vehicles(
        &self,
        _target: &Coordinate,
        _limit: usize,
        _vehicles: &[Coordinate],
    ) -> Result<(), CacheError> {
        Ok(())
    }

    /// Remember predictions fetched from upstream.
    ///
    /// # Errors
    ///
    /// Returns a [`CacheError`] when the backing store fails.
    async fn store_predictions(
        &self,
        _target: &Coordinate,
        _sources: &[Coordinate],
        _minutes: &[Minutes],
    ) -> Result<(), CacheError> {
        Ok(())
    }
}

#[async_trait]
/// The two upstream operations the nearest-ETA query is built from.
pub trait EtaPort: Send + Sync {
    /// Fetch at most `limit` vehicles near `target`, closest first.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when no address is available or all of them fail.
    async fn fetch_vehicles(&self, target: &Coordinate, limit: usize)
    -> Result<VehicleSet, PortError>;

    /// Fetch arrival predictions from each of `sources` to `target`.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when no address is available or all of them fail.
    async fn fetch_predictions(
        &self,
        target: &Coordinate,
        sources: &[Coordinate],
    ) -> Result<PredictionSet, PortError>;
}
