//! Loan endpoints: borrow, return and administrative edits

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{AppJson, NoticeResponse};
use crate::{
    error::AppResult,
    models::{BorrowForm, BorrowRequest, Loan, LoanDetails, LoanStatus, LoanUpdate, Notice, ReturnOutcome},
    services::loans::BorrowSubmission,
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct BorrowFormQuery {
    /// Book to borrow
    pub book_id: i32,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoanResponse {
    pub loan: Loan,
    pub notice: Notice,
}

/// Outcome of a return request. `status` is `returned` in both cases; the
/// notice tells a fresh return apart from a repeated one.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReturnResponse {
    pub status: LoanStatus,
    pub loan: Loan,
    pub notice: Notice,
}

impl From<ReturnOutcome> for ReturnResponse {
    fn from(outcome: ReturnOutcome) -> Self {
        let notice = outcome.notice();
        let loan = outcome.into_loan();
        Self {
            status: loan.status(),
            loan,
            notice,
        }
    }
}

/// List all loans, most recently borrowed first
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    responses(
        (status = 200, description = "All loans", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(State(state): State<crate::AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_loans().await?;
    Ok(Json(loans))
}

/// Open loans past their due date, soonest due first
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Overdue loans", body = Vec<LoanDetails>)
    )
)]
pub async fn list_overdue_loans(State(state): State<crate::AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.dashboard.list_overdue_loans().await?;
    Ok(Json(loans))
}

/// Prefilled borrow form for a book
#[utoipa::path(
    get,
    path = "/loans/borrow",
    tag = "loans",
    params(BorrowFormQuery),
    responses(
        (status = 200, description = "Borrow form", body = BorrowForm),
        (status = 404, description = "Book not found"),
        (status = 422, description = "No copies available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_form(
    State(state): State<crate::AppState>,
    Query(query): Query<BorrowFormQuery>,
) -> AppResult<Json<BorrowForm>> {
    let form = state.services.loans.borrow_form(query.book_id).await?;
    Ok(Json(form))
}

/// Borrow a book. A rejected submission returns the form to redisplay.
#[utoipa::path(
    post,
    path = "/loans/borrow",
    tag = "loans",
    request_body = BorrowRequest,
    responses(
        (status = 201, description = "Loan opened", body = LoanResponse),
        (status = 400, description = "Body is not valid JSON", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book was modified concurrently"),
        (status = 422, description = "Submission rejected", body = BorrowForm)
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    AppJson(request): AppJson<BorrowRequest>,
) -> AppResult<Response> {
    let response = match state.services.loans.submit_borrow(request).await? {
        BorrowSubmission::Borrowed { loan, notice } => {
            (StatusCode::CREATED, Json(LoanResponse { loan, notice })).into_response()
        }
        BorrowSubmission::Rejected(form) => (StatusCode::UNPROCESSABLE_ENTITY, Json(form)).into_response(),
    };
    Ok(response)
}

/// Return a borrowed book. Repeating the request changes nothing.
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan was modified concurrently")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let outcome = state.services.loans.return_loan(id).await?;
    Ok(Json(outcome.into()))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(State(state): State<crate::AppState>, Path(id): Path<i32>) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(id).await?;
    Ok(Json(loan))
}

/// Edit a loan's member and dates
#[utoipa::path(
    put,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = LoanUpdate,
    responses(
        (status = 200, description = "Loan updated", body = LoanResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Loan was modified concurrently"),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    AppJson(update): AppJson<LoanUpdate>,
) -> AppResult<Json<LoanResponse>> {
    let (loan, notice) = state.services.loans.update_loan(id, update).await?;
    Ok(Json(LoanResponse { loan, notice }))
}

/// Delete a loan. An open loan gives its copy back.
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan deleted", body = NoticeResponse)
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<NoticeResponse>> {
    let notice = state.services.loans.delete_loan(id).await?;
    Ok(Json(NoticeResponse { notice }))
}
