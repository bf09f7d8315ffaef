//! Domain layer health check functionality
//! Aggregates the status of the API and both record stores.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::warn;

use patient_registry_data::repository::{
    PatientRepository, PatientRepositoryTrait, RepositoryError, UserRepository, UserRepositoryTrait,
};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Checks slower than this report a degraded component
const SLOW_CHECK: Duration = Duration::from_millis(250);

/// Checks slower than this report an unhealthy component
const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// System health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    /// All components are healthy
    Ok,
    /// Some components are degraded but the system is functional
    Degraded,
    /// At least one component is not functioning
    Error,
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
pub struct HealthComponent {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HealthComponent {
    fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            details: None,
        }
    }
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Component name to status, in check order
    pub components: IndexMap<String, HealthComponent>,
}

impl SystemHealth {
    /// Derive the overall status from the components
    pub fn from_components(components: IndexMap<String, HealthComponent>) -> Self {
        let statuses = components.values().map(|c| c.status);
        let status = statuses.fold(SystemStatus::Ok, |overall, component| match (overall, component) {
            (SystemStatus::Error, _) | (_, ComponentStatus::Unhealthy) => SystemStatus::Error,
            (SystemStatus::Degraded, _) | (_, ComponentStatus::Degraded) => SystemStatus::Degraded,
            _ => SystemStatus::Ok,
        });
        Self { status, components }
    }
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;
}

/// Health checks over the shared record stores
#[derive(Debug, Clone)]
pub struct HealthService {
    patients: PatientRepository,
    users: UserRepository,
}

impl HealthService {
    pub fn new(patients: PatientRepository, users: UserRepository) -> Self {
        Self { patients, users }
    }
}

/// Time a store check and grade the result
async fn check_store<F>(name: &str, check: F) -> HealthComponent
where
    F: std::future::Future<Output = Result<usize, RepositoryError>>,
{
    let start = Instant::now();
    match tokio::time::timeout(CHECK_TIMEOUT, check).await {
        Ok(Ok(rows)) if start.elapsed() > SLOW_CHECK => HealthComponent {
            status: ComponentStatus::Degraded,
            details: Some(format!("{} rows, slow response ({} ms)", rows, start.elapsed().as_millis())),
        },
        Ok(Ok(_)) => HealthComponent::healthy(),
        Ok(Err(e)) => {
            warn!("Health check for {} failed: {}", name, e);
            HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(e.to_string()),
            }
        }
        Err(_) => {
            warn!("Health check for {} timed out", name);
            HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some("Check timed out".to_string()),
            }
        }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let (patient_store, user_store) = futures::join!(
            check_store("patient_store", self.patients.count()),
            check_store("user_store", self.users.count()),
        );

        let mut components = IndexMap::new();
        components.insert("api".to_string(), HealthComponent::healthy());
        components.insert("patient_store".to_string(), patient_store);
        components.insert("user_store".to_string(), user_store);

        SystemHealth::from_components(components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(status: ComponentStatus) -> HealthComponent {
        HealthComponent { status, details: None }
    }

    #[tokio::test]
    async fn test_get_system_health() {
        let service = HealthService::new(PatientRepository::new(), UserRepository::new());

        let health = service.get_system_health().await;

        assert_eq!(health.status, SystemStatus::Ok);
        let names: Vec<&str> = health.components.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["api", "patient_store", "user_store"]);
    }

    #[test]
    fn test_overall_status() {
        let mut components = IndexMap::new();
        components.insert("a".to_string(), component(ComponentStatus::Healthy));
        components.insert("b".to_string(), component(ComponentStatus::Degraded));
        assert_eq!(SystemHealth::from_components(components.clone()).status, SystemStatus::Degraded);

        components.insert("c".to_string(), component(ComponentStatus::Unhealthy));
        components.insert("d".to_string(), component(ComponentStatus::Healthy));
        assert_eq!(SystemHealth::from_components(components).status, SystemStatus::Error);
    }

    #[tokio::test]
    async fn test_failed_store_check_is_unhealthy() {
        let component = check_store("broken", async {
            Err::<usize, _>(RepositoryError::Lock("poisoned".to_string()))
        })
        .await;

        assert_eq!(component.status, ComponentStatus::Unhealthy);
        assert!(component.details.unwrap().contains("poisoned"));
    }
}
