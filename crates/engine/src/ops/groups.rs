use chrono::{DateTime, Utc};

use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    Currency, EngineError, Group, GroupRole, ResultEngine, group_memberships, groups, users,
};

use super::{Engine, normalize_required_text, with_tx};

/// A member of a group together with their identity attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupMember {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

/// Member-visible snapshot of a group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupOverview {
    pub group: Group,
    pub members: Vec<GroupMember>,
}

impl Engine {
    /// Upserts the users row asserted by the identity provider.
    ///
    /// This is the only write path into `users`; the engine trusts the
    /// asserted identity and never authenticates.
    pub async fn sync_user(
        &self,
        user_id: &str,
        email: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let user_id = normalize_required_text(user_id, "user id")?;
        let email = crate::util::normalize_email(email)?;
        let display_name = normalize_required_text(display_name, "display name")?;

        with_tx!(self, |db_tx| {
            match self.find_user(&db_tx, &user_id).await? {
                Some(existing) => {
                    if existing.email != email || existing.display_name != display_name {
                        let active = users::ActiveModel {
                            id: ActiveValue::Set(user_id.clone()),
                            email: ActiveValue::Set(email.clone()),
                            display_name: ActiveValue::Set(display_name.clone()),
                            ..Default::default()
                        };
                        active.update(&db_tx).await?;
                    }
                }
                None => {
                    let active = users::ActiveModel {
                        id: ActiveValue::Set(user_id.clone()),
                        email: ActiveValue::Set(email.clone()),
                        display_name: ActiveValue::Set(display_name.clone()),
                        created_at: ActiveValue::Set(now),
                    };
                    active.insert(&db_tx).await?;
                }
            }
            Ok(())
        })
    }

    /// Creates a group and its owner membership row atomically.
    pub async fn create_group(
        &self,
        name: &str,
        currency: Option<Currency>,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<String> {
        let name = normalize_required_text(name, "group name")?;

        let group = Group::new(name.clone(), user_id, currency.unwrap_or_default(), now);
        let group_id = group.id.clone();
        let group_entry: groups::ActiveModel = (&group).into();

        with_tx!(self, |db_tx| {
            self.require_user_exists(&db_tx, user_id).await?;

            // Enforce unique group names per owner (case-insensitive) to avoid
            // ambiguous lookups in clients.
            let exists = groups::Entity::find()
                .filter(groups::Column::OwnerId.eq(user_id.to_string()))
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            group_entry.insert(&db_tx).await?;

            let membership = group_memberships::ActiveModel {
                group_id: ActiveValue::Set(group_id.clone()),
                user_id: ActiveValue::Set(user_id.to_string()),
                role: ActiveValue::Set(GroupRole::Owner.as_str().to_string()),
                joined_at: ActiveValue::Set(now),
            };
            membership.insert(&db_tx).await?;

            Ok(group_id)
        })
    }

    /// Lists the groups the caller belongs to.
    pub async fn list_groups_for_user(&self, user_id: &str) -> ResultEngine<Vec<Group>> {
        with_tx!(self, |db_tx| {
            let rows: Vec<(group_memberships::Model, Option<groups::Model>)> =
                group_memberships::Entity::find()
                    .filter(group_memberships::Column::UserId.eq(user_id.to_string()))
                    .find_also_related(groups::Entity)
                    .order_by_asc(group_memberships::Column::JoinedAt)
                    .all(&db_tx)
                    .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (_, group_model) in rows {
                let Some(group_model) = group_model else { continue };
                out.push(Group::try_from(group_model)?);
            }
            Ok(out)
        })
    }

    /// Returns the group and its member list (member-visible).
    pub async fn group_overview(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<GroupOverview> {
        with_tx!(self, |db_tx| {
            let group_model = self.require_group_member(&db_tx, group_id, user_id).await?;
            let group = Group::try_from(group_model)?;

            let rows: Vec<(group_memberships::Model, Option<users::Model>)> =
                group_memberships::Entity::find()
                    .filter(group_memberships::Column::GroupId.eq(group_id.to_string()))
                    .find_also_related(users::Entity)
                    .order_by_asc(group_memberships::Column::JoinedAt)
                    .all(&db_tx)
                    .await?;

            let mut members = Vec::with_capacity(rows.len());
            for (membership, user_model) in rows {
                let Some(user_model) = user_model else { continue };
                members.push(GroupMember {
                    user_id: membership.user_id,
                    email: user_model.email,
                    display_name: user_model.display_name,
                    role: GroupRole::try_from(membership.role.as_str())?,
                    joined_at: membership.joined_at,
                });
            }

            Ok(GroupOverview { group, members })
        })
    }

    /// Removes a member from a group.
    ///
    /// A member may remove themselves; the owner may remove anyone else. The
    /// owner membership row can never be removed.
    pub async fn remove_group_member(
        &self,
        group_id: &str,
        member_id: &str,
        user_id: &str,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group_model = self.require_group_member(&db_tx, group_id, user_id).await?;
            if member_id == group_model.owner_id {
                return Err(EngineError::InvalidAmount(
                    "cannot remove the group owner".to_string(),
                ));
            }
            if member_id != user_id && group_model.owner_id != user_id {
                return Err(EngineError::Forbidden(
                    "only the owner may remove other members".to_string(),
                ));
            }

            if self.member_role(&db_tx, group_id, member_id).await?.is_none() {
                return Err(EngineError::KeyNotFound("member not exists".to_string()));
            }

            group_memberships::Entity::delete_by_id((
                group_id.to_string(),
                member_id.to_string(),
            ))
            .exec(&db_tx)
            .await?;

            Ok(())
        })
    }

    /// Deletes a group and everything it owns (owner-only).
    pub async fn delete_group(&self, group_id: &str, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let group_model = self.require_group_owner(&db_tx, group_id, user_id).await?;
            let group_db_id = group_model.id;

            // Explicit cascade within one DB transaction. FKs declare ON
            // DELETE CASCADE, but SQLite only honours them with
            // foreign_keys=ON, so we do not rely on it.
            let backend = self.database.get_database_backend();

            // 1) splits for expenses in this group
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expense_splits WHERE expense_id IN (SELECT id FROM expenses WHERE group_id = ?);",
                    vec![group_db_id.clone().into()],
                ))
                .await?;

            // 2) expenses
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM expenses WHERE group_id = ?;",
                    vec![group_db_id.clone().into()],
                ))
                .await?;

            // 3) settlements and invitations
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM settlements WHERE group_id = ?;",
                    vec![group_db_id.clone().into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM invitations WHERE group_id = ?;",
                    vec![group_db_id.clone().into()],
                ))
                .await?;

            // 4) memberships, then the group itself
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM group_memberships WHERE group_id = ?;",
                    vec![group_db_id.clone().into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM groups WHERE id = ?;",
                    vec![group_db_id.clone().into()],
                ))
                .await?;

            Ok(())
        })
    }
}
