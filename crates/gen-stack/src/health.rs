//! Service Registry: per-provider health informed by classified errors.
//!
//! The generation core only ever *reports* to a [`ServiceRegistry`]:
//! classified failures, and each turn that streamed to completion. It
//! never reads from it and never waits on it, so implementations must
//! return promptly and must not panic. Anything slow (persisting state,
//! paging someone) belongs on a background task the implementation owns.
//!
//! [`HealthRegistry`] is an in-memory implementation suitable for a
//! single process.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

use crate::error::ErrorKind;

/// Receives fire-and-forget outcome notifications.
pub trait ServiceRegistry: Send + Sync {
    /// Records that `service_id` failed with `kind`.
    fn update_service_state(&self, service_id: &str, kind: ErrorKind);

    /// Records that a turn against `service_id` completed. No-op by default.
    fn record_success(&self, _service_id: &str) {}
}

/// Health snapshot of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    /// `false` once an authentication or rate-limit failure is recorded.
    pub available: bool,
    /// Most recent failure.
    pub last_error: Option<ErrorKind>,
    /// Failures since the last completed turn or [`HealthRegistry::mark_healthy`].
    pub consecutive_failures: u32,
}

impl Default for ServiceHealth {
    fn default() -> Self {
        Self {
            available: true,
            last_error: None,
            consecutive_failures: 0,
        }
    }
}

/// In-memory [`ServiceRegistry`].
///
/// Unknown services are reported healthy. A completed turn resets the
/// service, including an earlier authentication or rate-limit mark.
#[derive(Debug, Default)]
pub struct HealthRegistry {
    services: RwLock<HashMap<String, ServiceHealth>>,
}

impl HealthRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current health of `service_id`.
    pub fn health(&self, service_id: &str) -> ServiceHealth {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Shorthand for `health(service_id).available`.
    pub fn is_available(&self, service_id: &str) -> bool {
        self.health(service_id).available
    }

    /// Resets `service_id` to healthy (e.g. after a key rotation or a
    /// successful health check).
    pub fn mark_healthy(&self, service_id: &str) {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(service_id);
    }
}

impl ServiceRegistry for HealthRegistry {
    fn update_service_state(&self, service_id: &str, kind: ErrorKind) {
        let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
        let health = services.entry(service_id.to_owned()).or_default();
        health.last_error = Some(kind);
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        if matches!(kind, ErrorKind::Authentication | ErrorKind::RateLimit) {
            health.available = false;
        }
        tracing::debug!(
            service_id,
            %kind,
            failures = health.consecutive_failures,
            available = health.available,
            "service state updated"
        );
    }

    fn record_success(&self, service_id: &str) {
        let recovered = self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(service_id);
        if let Some(previous) = recovered {
            tracing::debug!(
                service_id,
                failures = previous.consecutive_failures,
                "service recovered"
            );
        }
    }
}
