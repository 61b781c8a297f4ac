//! Loan lifecycle service
//!
//! A loan is opened only by `borrow` and closed exactly once by `return_loan`.
//! Both go through the availability ledger and commit the loan change and the
//! book's new availability together.

use std::sync::Arc;

use chrono::Duration;

use super::{clock::Clock, ledger, not_found, settle_conflict};
use crate::{
    config::LOAN_DURATION_DAYS,
    error::{AppError, AppResult, FieldErrors, FORM_LEVEL},
    models::{BorrowForm, BorrowRequest, Loan, LoanDetails, LoanUpdate, NewLoan, Notice, ReturnOutcome},
    repository::Repository,
};

/// Result of a borrow form submission
#[derive(Debug, Clone)]
pub enum BorrowSubmission {
    Borrowed { loan: Loan, notice: Notice },
    /// The form to redisplay, with the entered values and field messages
    Rejected(BorrowForm),
}

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    default_duration_days: i64,
}

impl LoansService {
    /// The default loan length is held to `LOAN_DURATION_DAYS` so the
    /// prefilled due date is always valid.
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, default_duration_days: i64) -> Self {
        Self {
            repository,
            clock,
            default_duration_days: default_duration_days
                .clamp(*LOAN_DURATION_DAYS.start(), *LOAN_DURATION_DAYS.end()),
        }
    }

    /// All loans with book and member display data, most recent first
    pub async fn list_loans(&self) -> AppResult<Vec<LoanDetails>> {
        self.repository.loans.list().await
    }

    pub async fn get_loan(&self, id: i32) -> AppResult<LoanDetails> {
        self.repository
            .loans
            .get_details(id)
            .await?
            .ok_or_else(|| not_found("Loan", id))
    }

    /// Prefilled borrow form for a book that still has copies to lend
    pub async fn borrow_form(&self, book_id: i32) -> AppResult<BorrowForm> {
        let book = self
            .repository
            .books
            .get(book_id)
            .await?
            .ok_or_else(|| not_found("Book", book_id))?;

        if !book.has_available_copies() {
            return Err(AppError::NoCopiesAvailable(ledger::no_copies_errors()));
        }

        let today = self.clock.today();
        Ok(BorrowForm {
            book_id: book.id,
            book_title: book.title,
            available_copies: book.available_copies,
            member_id: None,
            borrowed_on: today,
            due_on: today + Duration::days(self.default_duration_days),
            member_options: self.repository.members.options().await?,
            errors: FieldErrors::new(),
        })
    }

    /// Open a loan. A commit that loses a race for the book row is retried
    /// once from a fresh read.
    pub async fn borrow(&self, request: &BorrowRequest) -> AppResult<(Loan, Notice)> {
        match self.try_borrow(request).await {
            Err(e) if e.is_conflict() => {
                tracing::warn!("Borrow of book {} conflicted, retrying", request.book_id);
                self.try_borrow(request).await
            }
            other => other,
        }
    }

    async fn try_borrow(&self, request: &BorrowRequest) -> AppResult<(Loan, Notice)> {
        let mut book = self
            .repository
            .books
            .get(request.book_id)
            .await?
            .ok_or_else(|| not_found("Book", request.book_id))?;

        let mut errors = FieldErrors::new();

        let member_id = match request.member_id {
            Some(id) => {
                if self.repository.members.get(id).await?.is_some() {
                    Some(id)
                } else {
                    errors.add("member_id", "The selected member does not exist.");
                    None
                }
            }
            None => {
                errors.add("member_id", "Select a member to borrow this book.");
                None
            }
        };

        if request.due_on <= request.borrowed_on {
            errors.add("due_on", "Due date must be after the borrowed date.");
        }

        if !book.has_available_copies() {
            errors.add(FORM_LEVEL, ledger::NO_COPIES_MESSAGE);
            return Err(AppError::NoCopiesAvailable(errors));
        }

        let member_id = match member_id {
            Some(id) if errors.is_empty() => id,
            _ => return Err(AppError::Validation(errors)),
        };

        ledger::decrement_on_borrow(&mut book)?;

        let new_loan = NewLoan {
            book_id: book.id,
            member_id,
            borrowed_on: request.borrowed_on,
            due_on: request.due_on,
        };
        let loan = self.repository.loans.commit_borrow(&new_loan, &book).await?;

        tracing::info!(
            "Loan {} opened: book={} member={} due={} available={}",
            loan.id,
            book.id,
            member_id,
            loan.due_on,
            book.available_copies
        );
        Ok((loan, Notice::success(format!("'{}' loaned successfully.", book.title))))
    }

    /// Form-flow borrow: rule violations come back as a form to redisplay
    /// with fresh member options and the book's current availability
    pub async fn submit_borrow(&self, request: BorrowRequest) -> AppResult<BorrowSubmission> {
        let errors = match self.borrow(&request).await {
            Ok((loan, notice)) => return Ok(BorrowSubmission::Borrowed { loan, notice }),
            Err(AppError::Validation(errors)) | Err(AppError::NoCopiesAvailable(errors)) => errors,
            Err(e) => return Err(e),
        };

        let book = self
            .repository
            .books
            .get(request.book_id)
            .await?
            .ok_or_else(|| not_found("Book", request.book_id))?;

        Ok(BorrowSubmission::Rejected(BorrowForm {
            book_id: book.id,
            book_title: book.title,
            available_copies: book.available_copies,
            member_id: request.member_id,
            borrowed_on: request.borrowed_on,
            due_on: request.due_on,
            member_options: self.repository.members.options().await?,
            errors,
        }))
    }

    /// Close a loan. Returning a loan twice is a no-op reported as
    /// `ReturnOutcome::AlreadyReturned`.
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<ReturnOutcome> {
        match self.try_return(loan_id).await {
            Err(e) if e.is_conflict() => {
                tracing::warn!("Return of loan {} conflicted, retrying", loan_id);
                self.try_return(loan_id).await
            }
            other => other,
        }
    }

    async fn try_return(&self, loan_id: i32) -> AppResult<ReturnOutcome> {
        let loan = self
            .repository
            .loans
            .get(loan_id)
            .await?
            .ok_or_else(|| not_found("Loan", loan_id))?;

        if loan.is_returned() {
            tracing::info!("Loan {} was already returned", loan_id);
            return Ok(ReturnOutcome::AlreadyReturned(loan));
        }

        let mut book = self
            .repository
            .books
            .get(loan.book_id)
            .await?
            .ok_or_else(|| not_found("Book", loan.book_id))?;
        ledger::increment_on_return(&mut book);

        let returned = self
            .repository
            .loans
            .commit_return(&loan, self.clock.now(), &book)
            .await?;

        tracing::info!(
            "Loan {} returned: book={} available={}",
            returned.id,
            book.id,
            book.available_copies
        );
        Ok(ReturnOutcome::Returned(returned))
    }

    /// Administrative edit of member and dates
    pub async fn update_loan(&self, id: i32, data: LoanUpdate) -> AppResult<(Loan, Notice)> {
        let mut errors = FieldErrors::new();
        if data.due_on <= data.borrowed_on {
            errors.add("due_on", "Due date must be after the borrowed date.");
        }
        if self.repository.members.get(data.member_id).await?.is_none() {
            errors.add("member_id", "The selected member does not exist.");
        }
        errors.into_result()?;

        let result = self.repository.loans.update(id, &data).await;
        let loan = settle_conflict(result, "Loan", id, || async {
            Ok(self.repository.loans.get(id).await?.is_some())
        })
        .await?;

        tracing::info!("Loan {} updated: member={} due={}", loan.id, loan.member_id, loan.due_on);
        Ok((loan, Notice::success("Loan updated.")))
    }

    /// Administrative removal. An open loan gives its copy back to the book in
    /// the same commit, so deletion never leaves availability short.
    pub async fn delete_loan(&self, id: i32) -> AppResult<Notice> {
        let Some(loan) = self.repository.loans.get(id).await? else {
            return Ok(Notice::info("The loan no longer exists."));
        };

        let book = if loan.is_returned() {
            None
        } else {
            let mut book = self.repository.books.get(loan.book_id).await?;
            if let Some(ref mut book) = book {
                ledger::increment_on_return(book);
            }
            book
        };

        match self.repository.loans.delete(&loan, book).await {
            Ok(()) => {
                tracing::info!("Loan {} deleted (was {:?})", id, loan.status());
                Ok(Notice::success("Loan deleted."))
            }
            Err(e) if e.is_conflict() => {
                if self.repository.loans.get(id).await?.is_none() {
                    Ok(Notice::info("The loan no longer exists."))
                } else {
                    Err(e)
                }
            }
            Err(e) => Err(e),
        }
    }
}
