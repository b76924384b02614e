//! Invitations: time-limited, single-use offers of membership.
//!
//! An invitation references its invitee by email only - the invitee may not
//! have an account yet. The secret token is the capability: whoever presents
//! it with a matching verified email gets the membership.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Revoked => "revoked",
        }
    }

    /// Terminal statuses admit no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl TryFrom<&str> for InvitationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            other => Err(EngineError::InvalidId(format!(
                "invalid invitation status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: Uuid,
    pub group_id: String,
    pub inviter_id: String,
    pub invitee_email: String,
    pub token: String,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Builds a fresh pending invitation with a new random token.
    ///
    /// `invitee_email` must already be normalized by the caller.
    pub(crate) fn new(
        group_id: &str,
        inviter_id: &str,
        invitee_email: String,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: group_id.to_string(),
            inviter_id: inviter_id.to_string(),
            invitee_email,
            token: new_token(),
            status: InvitationStatus::Pending,
            created_at,
            expires_at: created_at + ttl,
            accepted_at: None,
        }
    }
}

/// Generates an unguessable, URL-safe invitation token.
///
/// 32 bytes drawn from two v4 UUIDs, base64url without padding.
pub(crate) fn new_token() -> String {
    let mut bytes = [0u8; 32];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invitations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub inviter_id: String,
    pub invitee_email: String,
    pub token: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub expires_at: DateTimeUtc,
    pub accepted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Invitation> for ActiveModel {
    fn from(invitation: &Invitation) -> Self {
        Self {
            id: ActiveValue::Set(invitation.id.to_string()),
            group_id: ActiveValue::Set(invitation.group_id.clone()),
            inviter_id: ActiveValue::Set(invitation.inviter_id.clone()),
            invitee_email: ActiveValue::Set(invitation.invitee_email.clone()),
            token: ActiveValue::Set(invitation.token.clone()),
            status: ActiveValue::Set(invitation.status.as_str().to_string()),
            created_at: ActiveValue::Set(invitation.created_at),
            expires_at: ActiveValue::Set(invitation.expires_at),
            accepted_at: ActiveValue::Set(invitation.accepted_at),
        }
    }
}

impl TryFrom<Model> for Invitation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "invitation")?,
            group_id: model.group_id,
            inviter_id: model.inviter_id,
            invitee_email: model.invitee_email,
            token: model.token,
            status: InvitationStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            expires_at: model.expires_at,
            accepted_at: model.accepted_at,
        })
    }
}
