//! High-level service answering "how soon can the nearest vehicle arrive?".

use std::sync::Arc;

use tracing::debug;

use crate::model::{Coordinate, Minutes};
use crate::ports::{EtaPort, PortError};

/// Vehicles requested per query unless configured otherwise.
pub const DEFAULT_VEHICLE_LIMIT: usize = 10;

#[derive(thiserror::Error, Debug)]
/// Outcomes of a nearest-ETA query that carry no answer.
pub enum QueryError {
    /// No vehicles nearby, or the vehicle and prediction sets disagree in length.
    #[error("No usable estimate found")]
    NotFound,
    /// The upstream cluster could not be reached.
    #[error(transparent)]
    Upstream(#[from] PortError),
}

/// Public entry point combining the vehicle and prediction lookups.
pub struct EtaService {
    port: Arc<dyn EtaPort>,
    vehicle_limit: usize,
}

impl EtaService {
    /// Create a new service bound to the provided upstream port.
    #[must_use]
    pub fn new(port: Arc<dyn EtaPort>) -> Self {
        Self {
            port,
            vehicle_limit: DEFAULT_VEHICLE_LIMIT,
        }
    }

    /// Override how many nearby vehicles are considered per query.
    #[must_use]
    pub fn with_vehicle_limit(mut self, vehicle_limit: usize) -> Self {
        self.vehicle_limit = vehicle_limit;
        self
    }

    /// Shortest predicted arrival time among the vehicles nearest to `target`.
    ///
    /// Vehicles are fetched first and predictions second; a failure in the
    /// second phase does not repeat the first.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] when no vehicles are nearby or the two
    /// upstream answers disagree, and [`QueryError::Upstream`] when either
    /// fetch fails.
    pub async fn nearest_eta(&self, target: &Coordinate) -> Result<Minutes, QueryError> {
        let vehicles = self
            .port
            .fetch_vehicles(target, self.vehicle_limit)
            .await?;
        if vehicles.is_empty() {
            debug!(%target, "no vehicles nearby");
            return Err(QueryError::NotFound);
        }

        let minutes = self.port.fetch_predictions(target, &vehicles).await?;
        if minutes.len() != vehicles.len() {
            debug!(
                %target,
                vehicles = vehicles.len(),
                predictions = minutes.len(),
                "prediction count does not match vehicle count"
            );
            return Err(QueryError::NotFound);
        }

        earliest(&minutes).ok_or(QueryError::NotFound)
    }
}

/// Smallest value by linear scan; the first of equal minima wins.
fn earliest(minutes: &[Minutes]) -> Option<Minutes> {
    let (&first, rest) = minutes.split_first()?;
    Some(
        rest.iter()
            .fold(first, |best, &value| if value < best { value } else { best }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::model::{PredictionSet, VehicleSet};

    const TARGET: Coordinate = Coordinate::new(55.7558, 37.6173);

    /// Canned upstream answers with call counters.
    struct FakePort {
        vehicles: Mutex<Option<Result<VehicleSet, PortError>>>,
        minutes: Mutex<Option<Result<PredictionSet, PortError>>>,
        vehicle_calls: AtomicUsize,
        prediction_calls: AtomicUsize,
        requested_limit: AtomicUsize,
    }

    impl FakePort {
        fn new(
            vehicles: Result<VehicleSet, PortError>,
            minutes: Result<PredictionSet, PortError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                vehicles: Mutex::new(Some(vehicles)),
                minutes: Mutex::new(Some(minutes)),
                vehicle_calls: AtomicUsize::new(0),
                prediction_calls: AtomicUsize::new(0),
                requested_limit: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EtaPort for FakePort {
        async fn fetch_vehicles(
            &self,
            _target: &Coordinate,
            limit: usize,
        ) -> Result<VehicleSet, PortError> {
            self.vehicle_calls.fetch_add(1, Ordering::SeqCst);
            self.requested_limit.store(limit, Ordering::SeqCst);
            self.vehicles
                .lock()
                .expect("fake port lock poisoned")
                .take()
                .expect("vehicles fetched more than once")
        }

        async fn fetch_predictions(
            &self,
            _target: &Coordinate,
            _sources: &[Coordinate],
        ) -> Result<PredictionSet, PortError> {
            self.prediction_calls.fetch_add(1, Ordering::SeqCst);
            self.minutes
                .lock()
                .expect("fake port lock poisoned")
                .take()
                .expect("predictions fetched more than once")
        }
    }

    fn three_vehicles() -> VehicleSet {
        vec![
            Coordinate::new(55.750, 37.610),
            Coordinate::new(55.752, 37.615),
            Coordinate::new(55.760, 37.620),
        ]
    }

    #[tokio::test]
    async fn returns_smallest_prediction() {
        let port = FakePort::new(Ok(three_vehicles()), Ok(vec![5, 2, 8]));
        let service = EtaService::new(port.clone());

        let eta = service.nearest_eta(&TARGET).await;
        assert!(matches!(eta, Ok(2)), "expected 2, got {eta:?}");
        assert_eq!(
            port.requested_limit.load(Ordering::SeqCst),
            DEFAULT_VEHICLE_LIMIT,
            "default limit passed upstream"
        );
    }

    #[tokio::test]
    async fn uses_configured_vehicle_limit() {
        let port = FakePort::new(Ok(three_vehicles()), Ok(vec![1, 1, 1]));
        let service = EtaService::new(port.clone()).with_vehicle_limit(3);

        let eta = service.nearest_eta(&TARGET).await;
        assert!(matches!(eta, Ok(1)), "expected 1, got {eta:?}");
        assert_eq!(port.requested_limit.load(Ordering::SeqCst), 3, "limit override");
    }

    #[tokio::test]
    async fn empty_vehicle_set_skips_predictions() {
        let port = FakePort::new(Ok(Vec::new()), Ok(vec![1]));
        let service = EtaService::new(port.clone());

        let eta = service.nearest_eta(&TARGET).await;
        assert!(matches!(eta, Err(QueryError::NotFound)), "got {eta:?}");
        assert_eq!(
            port.prediction_calls.load(Ordering::SeqCst),
            0,
            "no predictions call without vehicles"
        );
    }

    #[tokio::test]
    async fn length_mismatch_is_not_found() {
        let port = FakePort::new(Ok(three_vehicles()), Ok(vec![4, 9]));
        let service = EtaService::new(port);

        let eta = service.nearest_eta(&TARGET).await;
        assert!(matches!(eta, Err(QueryError::NotFound)), "got {eta:?}");
    }

    #[tokio::test]
    async fn vehicle_failure_is_upstream_error() {
        let port = FakePort::new(
            Err(PortError::AllUpstreamsFailed { attempts: 3 }),
            Ok(vec![1]),
        );
        let service = EtaService::new(port.clone());

        let eta = service.nearest_eta(&TARGET).await;
        assert!(
            matches!(
                eta,
                Err(QueryError::Upstream(PortError::AllUpstreamsFailed { attempts: 3 }))
            ),
            "got {eta:?}"
        );
        assert_eq!(port.prediction_calls.load(Ordering::SeqCst), 0, "phase two skipped");
    }

    #[tokio::test]
    async fn prediction_failure_does_not_refetch_vehicles() {
        let port = FakePort::new(
            Ok(three_vehicles()),
            Err(PortError::AllUpstreamsFailed { attempts: 2 }),
        );
        let service = EtaService::new(port.clone());

        let eta = service.nearest_eta(&TARGET).await;
        assert!(matches!(eta, Err(QueryError::Upstream(_))), "got {eta:?}");
        assert_eq!(port.vehicle_calls.load(Ordering::SeqCst), 1, "single vehicle fetch");
        assert_eq!(port.prediction_calls.load(Ordering::SeqCst), 1, "single prediction fetch");
    }

    #[test]
    fn earliest_keeps_first_minimum() {
        assert_eq!(earliest(&[7, 3, 3, 9]), Some(3), "ties resolve to the same value");
        assert_eq!(earliest(&[4]), Some(4), "single prediction");
        assert_eq!(earliest(&[-1, 0]), Some(-1), "negative minutes compare normally");
        assert_eq!(earliest(&[]), None, "nothing to reduce");
    }
}
