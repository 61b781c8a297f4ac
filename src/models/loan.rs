//! Loan (borrow) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::FieldErrors;

use super::notice::Notice;
use super::option::SelectOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Open,
    Returned,
}

/// Loan record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub member_id: i32,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<DateTime<Utc>>,
    pub version: i32,
}

impl Loan {
    pub fn is_returned(&self) -> bool {
        self.returned_on.is_some()
    }

    pub fn status(&self) -> LoanStatus {
        if self.is_returned() {
            LoanStatus::Returned
        } else {
            LoanStatus::Open
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.is_returned() && self.due_on < today
    }
}

/// Loan joined with the book title and member name for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub member_id: i32,
    pub member_name: String,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<DateTime<Utc>>,
    pub version: i32,
}

impl LoanDetails {
    pub fn from_loan(loan: &Loan, book_title: impl Into<String>, member_name: impl Into<String>) -> Self {
        Self {
            id: loan.id,
            book_id: loan.book_id,
            book_title: book_title.into(),
            member_id: loan.member_id,
            member_name: member_name.into(),
            borrowed_on: loan.borrowed_on,
            due_on: loan.due_on,
            returned_on: loan.returned_on,
            version: loan.version,
        }
    }

    pub fn is_returned(&self) -> bool {
        self.returned_on.is_some()
    }
}

/// Values for a loan about to be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub book_id: i32,
    pub member_id: i32,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
}

/// Borrow form submission
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BorrowRequest {
    pub book_id: i32,
    pub member_id: Option<i32>,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
}

/// Borrow form contents: prefilled values or a rejected submission to redisplay
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowForm {
    pub book_id: i32,
    pub book_title: String,
    pub available_copies: i32,
    pub member_id: Option<i32>,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
    pub member_options: Vec<SelectOption>,
    pub errors: FieldErrors,
}

/// Administrative loan edit. Book and returned state are not editable.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoanUpdate {
    pub version: i32,
    pub member_id: i32,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
}

/// Result of a return request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    Returned(Loan),
    /// The loan had been returned before; nothing changed
    AlreadyReturned(Loan),
}

impl ReturnOutcome {
    pub fn loan(&self) -> &Loan {
        match self {
            ReturnOutcome::Returned(loan) | ReturnOutcome::AlreadyReturned(loan) => loan,
        }
    }

    pub fn into_loan(self) -> Loan {
        match self {
            ReturnOutcome::Returned(loan) | ReturnOutcome::AlreadyReturned(loan) => loan,
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            ReturnOutcome::Returned(_) => Notice::success("Book marked as returned."),
            ReturnOutcome::AlreadyReturned(_) => Notice::info("This loan was already returned."),
        }
    }
}
