//! Dashboard and overdue reporting

use std::sync::Arc;

use super::clock::Clock;
use crate::{
    error::AppResult,
    models::{DashboardSummary, LoanDetails},
    repository::Repository,
};

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Cheap round trip to the catalog store
    pub async fn check_store(&self) -> AppResult<()> {
        self.repository.books.count().await.map(|_| ())
    }

    /// Open loans whose due date is before today, soonest due first
    pub async fn list_overdue_loans(&self) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.list_overdue(self.clock.today()).await
    }

    pub async fn summary(&self) -> AppResult<DashboardSummary> {
        let overdue_loans = self.list_overdue_loans().await?;
        let total_books = self.repository.books.count().await?;
        let available_copies = self.repository.books.sum_available_copies().await?;
        let total_members = self.repository.members.count().await?;
        let active_loans = self.repository.loans.count_open().await?;

        Ok(DashboardSummary {
            total_books,
            available_copies,
            total_members,
            active_loans,
            overdue_count: overdue_loans.len(),
            overdue_loans,
        })
    }
}
