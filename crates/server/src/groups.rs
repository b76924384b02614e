//! Group lifecycle and membership endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use api_types::group::{GroupCreated, GroupNew, GroupOverviewResponse, GroupView, GroupsResponse};
use api_types::membership::{GroupRole, MemberView};
use engine::Currency;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
};

fn group_view(group: engine::Group) -> GroupView {
    GroupView {
        id: group.id,
        name: group.name,
        currency: group.currency.code().to_string(),
        owner_id: group.owner_id,
        created_at: group.created_at,
    }
}

fn member_view(member: engine::GroupMember) -> MemberView {
    MemberView {
        user_id: member.user_id,
        email: member.email,
        display_name: member.display_name,
        role: match member.role {
            engine::GroupRole::Owner => GroupRole::Owner,
            engine::GroupRole::Member => GroupRole::Member,
        },
        joined_at: member.joined_at,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<Json<GroupCreated>, ServerError> {
    let currency = payload
        .currency
        .as_deref()
        .map(Currency::try_from)
        .transpose()?;

    let id = state
        .engine
        .create_group(&payload.name, currency, &user.id, Utc::now())
        .await?;
    Ok(Json(GroupCreated { id }))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<GroupsResponse>, ServerError> {
    let groups = state
        .engine
        .list_groups_for_user(&user.id)
        .await?
        .into_iter()
        .map(group_view)
        .collect();
    Ok(Json(GroupsResponse { groups }))
}

pub async fn overview(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupOverviewResponse>, ServerError> {
    let overview = state.engine.group_overview(&group_id, &user.id).await?;
    Ok(Json(GroupOverviewResponse {
        group: group_view(overview.group),
        members: overview.members.into_iter().map(member_view).collect(),
    }))
}

pub async fn remove_member(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((group_id, member_id)): Path<(String, String)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_group_member(&group_id, &member_id, &user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_group(&group_id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
