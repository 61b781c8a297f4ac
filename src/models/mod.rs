//! Data models for the library catalog

pub mod author;
pub mod book;
pub mod dashboard;
pub mod loan;
pub mod member;
pub mod notice;
pub mod option;

// Re-export commonly used types
pub use author::{Author, AuthorInput};
pub use book::{Book, BookFilter, BookInput, BookListing, BookQuery, CoverChange, CoverUpload};
pub use dashboard::DashboardSummary;
pub use loan::{BorrowForm, BorrowRequest, Loan, LoanDetails, LoanStatus, LoanUpdate, NewLoan, ReturnOutcome};
pub use member::{Member, MemberInput};
pub use notice::{Notice, NoticeLevel};
pub use option::SelectOption;
