//! Member roster endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{
        book::SearchQuery,
        member::{Member, MemberData},
        report::{MemberFines, MemberResults},
    },
    AppState,
};

/// Member listing filter
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MemberListQuery {
    /// Only ACTIVE members, ordered by name
    pub active: Option<bool>,
}

/// List members
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    params(MemberListQuery),
    responses(
        (status = 200, description = "List of members", body = Vec<Member>)
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<MemberListQuery>,
) -> AppResult<Json<Vec<Member>>> {
    let members = if query.active.unwrap_or(false) {
        state.services.roster.list_active().await?
    } else {
        state.services.roster.list_members().await?
    };
    Ok(Json(members))
}

/// Search members by name, email, phone, address or id
#[utoipa::path(
    get,
    path = "/members/search",
    tag = "members",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching members", body = MemberResults)
    )
)]
pub async fn search_members(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<MemberResults>> {
    let results = state
        .services
        .reports
        .search_members(query.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(results))
}

/// Get member by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Member>> {
    let member = state.services.roster.get_member(id).await?;
    Ok(Json(member))
}

/// Register a member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = MemberData,
    responses(
        (status = 201, description = "Member registered", body = Member),
        (status = 400, description = "Invalid contact details"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    Json(member): Json<MemberData>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let created = state.services.roster.add_member(member).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a member
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    request_body = MemberData,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Invalid contact details"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(member): Json<MemberData>,
) -> AppResult<Json<Member>> {
    let updated = state.services.roster.update_member(id, member).await?;
    Ok(Json(updated))
}

/// Delete a member
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found"),
        (status = 422, description = "Member has open loans or unpaid fines")
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.roster.delete_member(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fines owed by a member
#[utoipa::path(
    get,
    path = "/members/{id}/fines",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Fine summary", body = MemberFines),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member_fines(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MemberFines>> {
    let fines = state.services.roster.fines(id).await?;
    Ok(Json(fines))
}
