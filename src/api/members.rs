//! Member and author endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        author::{Author, CreateAuthor},
        member::{CreateMember, Member, MemberRanking},
    },
};

use super::books::TopQuery;

/// Most active borrowers
#[utoipa::path(
    get,
    path = "/members/top",
    tag = "members",
    params(TopQuery),
    responses(
        (status = 200, description = "Members by descending loan count", body = Vec<MemberRanking>)
    )
)]
pub async fn top_members(
    State(state): State<crate::AppState>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<MemberRanking>>> {
    let members = state.services.rankings.top_members(query.n()).await?;
    Ok(Json(members))
}

/// Get a member
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i64, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<crate::AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Member>> {
    let member = state.services.catalog.get_member(id).await?;
    Ok(Json(member))
}

/// Register a member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn create_member(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let member = state.services.catalog.create_member(&data).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Register an author
#[utoipa::path(
    post,
    path = "/authors",
    tag = "members",
    request_body = CreateAuthor,
    responses(
        (status = 201, description = "Author created", body = Author)
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    Json(data): Json<CreateAuthor>,
) -> AppResult<(StatusCode, Json<Author>)> {
    let author = state.services.catalog.create_author(&data).await?;
    Ok((StatusCode::CREATED, Json(author)))
}
