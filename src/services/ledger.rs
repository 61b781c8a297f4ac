//! Availability ledger
//!
//! Keeps `Book::available_copies` in step with open loans. The functions only
//! adjust the in-memory row; the loan store persists the new count in the same
//! commit as the loan change, guarded by the version the row was read at.

use crate::{
    error::{AppError, AppResult, FieldErrors, FORM_LEVEL},
    models::Book,
};

pub const NO_COPIES_MESSAGE: &str = "This book currently has no available copies.";

/// Form-level messages for a book with nothing left to lend
pub fn no_copies_errors() -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.add(FORM_LEVEL, NO_COPIES_MESSAGE);
    errors
}

/// Take one copy off the shelf for a new loan
pub fn decrement_on_borrow(book: &mut Book) -> AppResult<()> {
    if book.available_copies <= 0 {
        return Err(AppError::NoCopiesAvailable(no_copies_errors()));
    }
    book.available_copies -= 1;
    Ok(())
}

/// Put one copy back. Never exceeds `total_copies`.
pub fn increment_on_return(book: &mut Book) {
    book.available_copies = (book.available_copies + 1).min(book.total_copies);
}
