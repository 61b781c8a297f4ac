//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, dashboard, health, loans, members};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Catalog API",
        version = "0.3.0",
        description = "Books, authors, members and the loan ledger"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Dashboard
        dashboard::get_dashboard,
        // Authors
        authors::list_authors,
        authors::author_options,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Members
        members::list_members,
        members::member_options,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        // Loans
        loans::list_loans,
        loans::list_overdue_loans,
        loans::borrow_form,
        loans::borrow,
        loans::return_loan,
        loans::get_loan,
        loans::update_loan,
        loans::delete_loan,
    ),
    components(
        schemas(
            // Shared
            crate::models::Notice,
            crate::models::NoticeLevel,
            crate::models::SelectOption,
            crate::api::NoticeResponse,
            // Authors
            crate::models::Author,
            crate::models::AuthorInput,
            authors::UpdateAuthorRequest,
            authors::AuthorResponse,
            // Books
            crate::models::Book,
            crate::models::BookListing,
            crate::models::BookInput,
            books::BookResponse,
            // Members
            crate::models::Member,
            crate::models::MemberInput,
            members::UpdateMemberRequest,
            members::MemberResponse,
            // Loans
            crate::models::Loan,
            crate::models::LoanDetails,
            crate::models::LoanStatus,
            crate::models::LoanUpdate,
            crate::models::BorrowRequest,
            crate::models::BorrowForm,
            loans::LoanResponse,
            loans::ReturnResponse,
            // Dashboard
            crate::models::DashboardSummary,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::FieldErrors,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "dashboard", description = "Catalog totals and overdue loans"),
        (name = "authors", description = "Author management"),
        (name = "books", description = "Book catalog"),
        (name = "members", description = "Member management"),
        (name = "loans", description = "Borrowing and returning")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
