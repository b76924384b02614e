use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, GroupRole, Invitation, InvitationStatus, ResultEngine, group_memberships,
    invitations, users, util::normalize_email,
};

use super::{Engine, with_tx};

/// What `create_invitation` hands back so the caller can deliver the offer
/// out of band.
#[derive(Clone, Debug, PartialEq)]
pub struct InvitationCreated {
    pub invitation_id: Uuid,
    pub token: String,
    pub invitee_email: String,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of the acceptance transaction; the expired arm commits its status
/// transition even though the overall call fails.
enum AcceptDecision {
    Joined(String),
    AlreadyAccepted(String),
    Expired,
}

impl Engine {
    /// Creates a pending invitation for `invitee_email` (owner-only).
    ///
    /// Rejects addresses that already belong to a member and emails with an
    /// invitation still pending. The returned token is the capability for
    /// [`accept_invitation`]; delivery is the caller's concern.
    ///
    /// [`accept_invitation`]: Engine::accept_invitation
    pub async fn create_invitation(
        &self,
        group_id: &str,
        invitee_email: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<InvitationCreated> {
        let invitee_email = normalize_email(invitee_email)?;

        with_tx!(self, |db_tx| {
            self.require_group_owner(&db_tx, group_id, user_id).await?;

            // Already a member? Emails are stored normalized, so an indexed
            // equality lookup suffices.
            if let Some(existing) = users::Entity::find()
                .filter(users::Column::Email.eq(invitee_email.clone()))
                .one(&db_tx)
                .await?
                && self.member_role(&db_tx, group_id, &existing.id).await?.is_some()
            {
                return Err(EngineError::ExistingKey(format!(
                    "{invitee_email} is already a member"
                )));
            }

            let active_pending = invitations::Entity::find()
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .filter(invitations::Column::InviteeEmail.eq(invitee_email.clone()))
                .filter(invitations::Column::Status.eq(InvitationStatus::Pending.as_str()))
                .filter(invitations::Column::ExpiresAt.gt(now))
                .one(&db_tx)
                .await?
                .is_some();
            if active_pending {
                return Err(EngineError::ExistingKey(format!(
                    "an invitation for {invitee_email} is already pending"
                )));
            }

            let invitation =
                Invitation::new(group_id, user_id, invitee_email.clone(), now, self.invitation_ttl);
            let created = InvitationCreated {
                invitation_id: invitation.id,
                token: invitation.token.clone(),
                invitee_email: invitation.invitee_email.clone(),
                expires_at: invitation.expires_at,
            };
            invitations::ActiveModel::from(&invitation).insert(&db_tx).await?;

            Ok(created)
        })
    }

    /// Redeems an invitation token, joining the caller to the group.
    ///
    /// The caller's stored (verified) email must match the invitee email.
    /// Mismatched callers and revoked tokens get the same rejection as an
    /// unknown token so a token holder cannot probe what gates it. Accepting
    /// an already-accepted invitation is an idempotent success. A pending
    /// invitation found past its expiry is durably marked expired even
    /// though the call itself fails.
    ///
    /// Returns the id of the joined group.
    pub async fn accept_invitation(
        &self,
        token: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<String> {
        let decision = with_tx!(self, |db_tx| {
            let model = invitations::Entity::find()
                .filter(invitations::Column::Token.eq(token.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("invitation not exists".to_string()))?;
            let invitation = Invitation::try_from(model)?;

            let caller = self
                .find_user(&db_tx, user_id)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
            if caller.email != invitation.invitee_email {
                tracing::warn!(
                    invitation_id = %invitation.id,
                    "invitation acceptance rejected: caller email does not match invitee"
                );
                return Err(EngineError::KeyNotFound("invitation not exists".to_string()));
            }

            match invitation.status {
                InvitationStatus::Accepted => {
                    Ok(AcceptDecision::AlreadyAccepted(invitation.group_id))
                }
                InvitationStatus::Revoked => {
                    Err(EngineError::KeyNotFound("invitation not exists".to_string()))
                }
                InvitationStatus::Expired => Err(EngineError::Expired(
                    "invitation expired".to_string(),
                )),
                InvitationStatus::Pending if now >= invitation.expires_at => {
                    // Lazy expiry: persist the terminal transition, then fail
                    // the call after this transaction commits.
                    let active = invitations::ActiveModel {
                        id: ActiveValue::Set(invitation.id.to_string()),
                        status: ActiveValue::Set(InvitationStatus::Expired.as_str().to_string()),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;
                    Ok(AcceptDecision::Expired)
                }
                InvitationStatus::Pending => {
                    let already_member = group_memberships::Entity::find_by_id((
                        invitation.group_id.clone(),
                        user_id.to_string(),
                    ))
                    .one(&db_tx)
                    .await?
                    .is_some();
                    if !already_member {
                        let membership = group_memberships::ActiveModel {
                            group_id: ActiveValue::Set(invitation.group_id.clone()),
                            user_id: ActiveValue::Set(user_id.to_string()),
                            role: ActiveValue::Set(GroupRole::Member.as_str().to_string()),
                            joined_at: ActiveValue::Set(now),
                        };
                        membership.insert(&db_tx).await?;
                    }

                    let active = invitations::ActiveModel {
                        id: ActiveValue::Set(invitation.id.to_string()),
                        status: ActiveValue::Set(InvitationStatus::Accepted.as_str().to_string()),
                        accepted_at: ActiveValue::Set(Some(now)),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;

                    Ok(AcceptDecision::Joined(invitation.group_id))
                }
            }
        })?;

        match decision {
            AcceptDecision::Joined(group_id) | AcceptDecision::AlreadyAccepted(group_id) => {
                Ok(group_id)
            }
            AcceptDecision::Expired => {
                Err(EngineError::Expired("invitation expired".to_string()))
            }
        }
    }

    /// Revokes a pending invitation (owner-only).
    pub async fn revoke_invitation(
        &self,
        group_id: &str,
        invitation_id: Uuid,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_group_owner(&db_tx, group_id, user_id).await?;

            let model = invitations::Entity::find_by_id(invitation_id.to_string())
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("invitation not exists".to_string()))?;
            let status = InvitationStatus::try_from(model.status.as_str())?;
            if status.is_terminal() {
                return Err(EngineError::ExistingKey(format!(
                    "invitation is already {}",
                    status.as_str()
                )));
            }

            let active = invitations::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(InvitationStatus::Revoked.as_str().to_string()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            Ok(())
        })
    }

    /// Lists a group's invitations, newest first (owner-only).
    pub async fn list_group_invitations(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<Invitation>> {
        with_tx!(self, |db_tx| {
            self.require_group_owner(&db_tx, group_id, user_id).await?;

            let models = invitations::Entity::find()
                .filter(invitations::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(invitations::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            models.into_iter().map(Invitation::try_from).collect()
        })
    }

    /// Bulk `pending -> expired` sweep for invitations past their expiry.
    ///
    /// Returns how many rows were transitioned. Run periodically; acceptance
    /// also expires lazily, so the sweep only keeps the ledger tidy.
    pub async fn expire_stale_invitations(&self, now: DateTime<Utc>) -> ResultEngine<u64> {
        let backend = self.database.get_database_backend();
        with_tx!(self, |db_tx| {
            let result = db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "UPDATE invitations SET status = ? WHERE status = ? AND expires_at <= ?;",
                    vec![
                        InvitationStatus::Expired.as_str().into(),
                        InvitationStatus::Pending.as_str().into(),
                        now.into(),
                    ],
                ))
                .await?;
            Ok(result.rows_affected())
        })
    }
}
