//! Invitation endpoints (create/list/revoke are owner-only).

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use api_types::invitation::{
    InvitationAccept, InvitationAccepted, InvitationCreated, InvitationStatus, InvitationView,
    InvitationsResponse,
};

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
};

fn status_view(status: engine::InvitationStatus) -> InvitationStatus {
    match status {
        engine::InvitationStatus::Pending => InvitationStatus::Pending,
        engine::InvitationStatus::Accepted => InvitationStatus::Accepted,
        engine::InvitationStatus::Expired => InvitationStatus::Expired,
        engine::InvitationStatus::Revoked => InvitationStatus::Revoked,
    }
}

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<api_types::invitation::InvitationNew>,
) -> Result<Json<InvitationCreated>, ServerError> {
    let created = state
        .engine
        .create_invitation(&group_id, &payload.email, &user.id, Utc::now())
        .await?;

    // Delivery is out of band; the relay message carries the token.
    state.notify(
        created.invitee_email.clone(),
        "You have been invited to a ChaiPaani group".to_string(),
        format!(
            "{} invited you to split expenses. Use invitation token {} before {}.",
            user.display_name, created.token, created.expires_at
        ),
    );

    Ok(Json(InvitationCreated {
        id: created.invitation_id,
        token: created.token,
        invitee_email: created.invitee_email,
        expires_at: created.expires_at,
    }))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<InvitationsResponse>, ServerError> {
    let invitations = state
        .engine
        .list_group_invitations(&group_id, &user.id)
        .await?
        .into_iter()
        .map(|invitation| InvitationView {
            id: invitation.id,
            invitee_email: invitation.invitee_email,
            status: status_view(invitation.status),
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
            accepted_at: invitation.accepted_at,
        })
        .collect();
    Ok(Json(InvitationsResponse { invitations }))
}

pub async fn revoke(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((group_id, invitation_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .revoke_invitation(&group_id, invitation_id, &user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn accept(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<InvitationAccept>,
) -> Result<Json<InvitationAccepted>, ServerError> {
    let group_id = state
        .engine
        .accept_invitation(&payload.token, &user.id, Utc::now())
        .await?;
    Ok(Json(InvitationAccepted { group_id }))
}
