//! Member management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AppJson, NoticeResponse};
use crate::{
    error::AppResult,
    models::{Member, MemberInput, Notice, SelectOption},
};

/// Update member request
#[derive(Deserialize, ToSchema)]
pub struct UpdateMemberRequest {
    /// Version read before editing
    pub version: i32,
    #[serde(flatten)]
    pub member: MemberInput,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MemberResponse {
    pub member: Member,
    pub notice: Notice,
}

/// List members ordered by name
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    responses(
        (status = 200, description = "List of members", body = Vec<Member>)
    )
)]
pub async fn list_members(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Member>>> {
    let members = state.services.catalog.list_members().await?;
    Ok(Json(members))
}

/// Member select options, ordered by name
#[utoipa::path(
    get,
    path = "/members/options",
    tag = "members",
    responses(
        (status = 200, description = "Member options", body = Vec<SelectOption>)
    )
)]
pub async fn member_options(State(state): State<crate::AppState>) -> AppResult<Json<Vec<SelectOption>>> {
    let options = state.services.catalog.member_options().await?;
    Ok(Json(options))
}

/// Get member by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(State(state): State<crate::AppState>, Path(id): Path<i32>) -> AppResult<Json<Member>> {
    let member = state.services.catalog.get_member(id).await?;
    Ok(Json(member))
}

/// Register a member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = MemberInput,
    responses(
        (status = 201, description = "Member created", body = MemberResponse),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_member(
    State(state): State<crate::AppState>,
    AppJson(input): AppJson<MemberInput>,
) -> AppResult<(StatusCode, Json<MemberResponse>)> {
    let (member, notice) = state.services.catalog.create_member(input).await?;
    Ok((StatusCode::CREATED, Json(MemberResponse { member, notice })))
}

/// Update member
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Member updated", body = MemberResponse),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Member was modified concurrently"),
        (status = 422, description = "Invalid fields", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_member(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    AppJson(request): AppJson<UpdateMemberRequest>,
) -> AppResult<Json<MemberResponse>> {
    let (member, notice) = state
        .services
        .catalog
        .update_member(id, request.version, request.member)
        .await?;
    Ok(Json(MemberResponse { member, notice }))
}

/// Delete member and their loan history
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member deleted", body = NoticeResponse)
    )
)]
pub async fn delete_member(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<NoticeResponse>> {
    let notice = state.services.catalog.delete_member(id).await?;
    Ok(Json(NoticeResponse { notice }))
}
