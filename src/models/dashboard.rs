//! Dashboard aggregate

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::loan::LoanDetails;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub total_books: i64,
    /// Sum of available copies across all books
    pub available_copies: i64,
    pub total_members: i64,
    /// Loans without a returned date
    pub active_loans: i64,
    pub overdue_count: usize,
    pub overdue_loans: Vec<LoanDetails>,
}
