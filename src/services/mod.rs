//! Business logic services

pub mod catalog;
pub mod clock;
pub mod covers;
pub mod dashboard;
pub mod ledger;
pub mod loans;

use std::future::Future;
use std::sync::Arc;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub dashboard: dashboard::DashboardService,
}

impl Services {
    /// Create all services over the given repository
    pub fn new(
        repository: Repository,
        covers: Arc<dyn covers::CoverStore>,
        clock: Arc<dyn clock::Clock>,
        loans_config: &LoansConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), covers),
            loans: loans::LoansService::new(
                repository.clone(),
                clock.clone(),
                loans_config.default_duration_days,
            ),
            dashboard: dashboard::DashboardService::new(repository, clock),
        }
    }
}

pub(crate) fn not_found(entity: &str, id: i32) -> AppError {
    AppError::NotFound(format!("{} with id {} not found", entity, id))
}

/// Settle a versioned write that may have lost a race: when it conflicted,
/// check whether the row still exists. A vanished row becomes `NotFound`,
/// otherwise the conflict stands.
pub(crate) async fn settle_conflict<T, F, Fut>(
    result: AppResult<T>,
    entity: &str,
    id: i32,
    still_exists: F,
) -> AppResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<bool>>,
{
    match result {
        Err(e) if e.is_conflict() => {
            if still_exists().await? {
                tracing::warn!("{} {} update lost a concurrent write", entity, id);
                Err(e)
            } else {
                Err(not_found(entity, id))
            }
        }
        other => other,
    }
}
