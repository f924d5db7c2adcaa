//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{CallerIdentity, CreateLoan, Loan, LoanDetails, LoanQuery},
};

/// Loan status change request
#[derive(Deserialize, ToSchema)]
pub struct UpdateLoanStatusRequest {
    /// One of "Sedang Dipinjam", "Belum Dikembalikan", "Sudah Dikembalikan"
    pub status: String,
    /// Item receiving the restock on return, when not the loan's own item
    pub id_item: Option<i32>,
}

/// Loan response with a status message
#[derive(Serialize, ToSchema)]
pub struct LoanResponse {
    pub message: String,
    pub loan: Loan,
}

/// Create a new loan (borrow an item)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanResponse),
        (status = 400, description = "Invalid dates or quantity", body = crate::error::ErrorResponse),
        (status = 403, description = "Regular users can only borrow for themselves"),
        (status = 404, description = "User or item not found"),
        (status = 409, description = "Insufficient stock", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    caller.require_self_or_admin(request.id_user)?;

    let loan = state.services.loans.create_loan(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanResponse {
            message: "Loan created".to_string(),
            loan,
        }),
    ))
}

/// List loans visible to the caller
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans with item and borrower", body = Vec<LoanDetails>),
        (status = 400, description = "Invalid pagination")
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_loans(&caller, &query).await?;
    Ok(Json(loans))
}

/// Get loan details
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan_detail(&caller, loan_id).await?;
    Ok(Json(loan))
}

/// Change a loan's status; returning restocks the item
#[utoipa::path(
    put,
    path = "/loans/{id}/status",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = UpdateLoanStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = LoanResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Loan or item not found"),
        (status = 409, description = "Loan already returned")
    )
)]
pub async fn update_loan_status(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Path(loan_id): Path<i32>,
    Json(request): Json<UpdateLoanStatusRequest>,
) -> AppResult<Json<LoanResponse>> {
    caller.require_admin()?;

    let loan = state
        .services
        .loans
        .update_loan_status(loan_id, &request.status, request.id_item)
        .await?;

    Ok(Json(LoanResponse {
        message: format!("Loan status is now '{}'", loan.status),
        loan,
    }))
}

/// Soft delete a loan
#[utoipa::path(
    delete,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan deleted", body = LoanResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn delete_loan(
    State(state): State<crate::AppState>,
    caller: CallerIdentity,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanResponse>> {
    caller.require_admin()?;

    let loan = state.services.loans.delete_loan(loan_id).await?;

    Ok(Json(LoanResponse {
        message: "Loan deleted".to_string(),
        loan,
    }))
}
