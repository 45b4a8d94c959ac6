//! Readiness of the inputs a pipeline run depends on.
//!
//! A run needs both the warehouse and the source files; the pipeline is
//! ready only when every component passed its last check.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
struct CheckResult {
    healthy: bool,
    message: Option<String>,
    checked_at: Option<DateTime<Utc>>,
}

/// Result of the latest check of one component. Unchecked components are
/// not ready.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    last: RwLock<CheckResult>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            last: RwLock::new(CheckResult {
                healthy: false,
                message: None,
                checked_at: None,
            }),
        }
    }

    pub fn set_healthy(&self) {
        *self.last.write() = CheckResult {
            healthy: true,
            message: None,
            checked_at: Some(Utc::now()),
        };
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        *self.last.write() = CheckResult {
            healthy: false,
            message: Some(msg.into()),
            checked_at: Some(Utc::now()),
        };
    }

    pub fn is_healthy(&self) -> bool {
        self.last.read().healthy
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.last.read().message.clone()
    }

    fn report(&self) -> ComponentHealthReport {
        let last = self.last.read().clone();
        ComponentHealthReport {
            name: self.name,
            healthy: last.healthy,
            message: last.message,
            checked_at: last.checked_at,
        }
    }
}

/// Readiness of every component at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub ready: bool,
    pub components: Vec<ComponentHealthReport>,
}

impl HealthReport {
    /// Components that failed (or never ran) their check.
    pub fn failing(&self) -> impl Iterator<Item = &ComponentHealthReport> {
        self.components.iter().filter(|c| !c.healthy)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealthReport {
    pub name: &'static str,
    pub healthy: bool,
    pub message: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

/// Health registry: the warehouse and the CSV input files.
pub struct HealthRegistry {
    pub clickhouse: ComponentHealth,
    pub sources: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            clickhouse: ComponentHealth::new("clickhouse"),
            sources: ComponentHealth::new("sources"),
        }
    }

    pub fn report(&self) -> HealthReport {
        let components = vec![self.clickhouse.report(), self.sources.report()];
        HealthReport {
            ready: components.iter().all(|c| c.healthy),
            components,
        }
    }

    /// Whether a pipeline run can be expected to succeed.
    pub fn is_ready(&self) -> bool {
        self.clickhouse.is_healthy() && self.sources.is_healthy()
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
