//! Single-flight guard
//!
//! At most one scan per logical resource runs at a time. A second caller
//! does not wait; it is told the resource is busy and skips.

use std::sync::atomic::{AtomicBool, Ordering};

use lendscope_core::ProtocolError;

#[derive(Debug)]
pub struct SingleFlight {
    resource: &'static str,
    in_flight: AtomicBool,
}

impl SingleFlight {
    pub const fn new(resource: &'static str) -> Self {
        Self {
            resource,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the resource, or `None` if another scan holds it
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flight: self })
    }

    /// Like [`try_acquire`](Self::try_acquire), but busy is an error
    pub fn acquire(&self) -> Result<FlightGuard<'_>, ProtocolError> {
        self.try_acquire().ok_or_else(|| {
            tracing::debug!(resource = self.resource, "Scan already running, skipping");
            ProtocolError::AlreadyInFlight {
                resource: self.resource,
            }
        })
    }
}

/// Releases the resource on drop
#[derive(Debug)]
pub struct FlightGuard<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flight.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let flight = SingleFlight::new("position");
        let guard = flight.try_acquire();
        assert!(guard.is_some());
        assert!(flight.is_in_flight());
        assert!(flight.try_acquire().is_none());

        let err = flight.acquire().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::AlreadyInFlight { resource: "position" }
        ));
    }

    #[test]
    fn test_release_on_drop() {
        let flight = SingleFlight::new("loan");
        {
            let _guard = flight.acquire().unwrap();
        }
        assert!(!flight.is_in_flight());
        assert!(flight.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_callers_one_wins() {
        let flight = std::sync::Arc::new(SingleFlight::new("marketplace"));
        let guard = flight.acquire().unwrap();

        let other = flight.clone();
        let busy = tokio::spawn(async move { other.try_acquire().is_none() })
            .await
            .unwrap();
        assert!(busy);

        drop(guard);
        assert!(flight.try_acquire().is_some());
    }
}
