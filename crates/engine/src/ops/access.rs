//! Membership and ownership predicates.
//!
//! Every access rule in the engine funnels through these helpers, which read
//! the `groups` and `group_memberships` relations directly with one indexed
//! lookup each. Visibility of any other table must never be derived by a
//! join that itself depends on that table's own access rule; keeping the
//! predicates flat is what makes the authorization graph acyclic.
//!
//! `require_*` failures surface as `KeyNotFound` so a caller cannot tell a
//! missing group from one it is not allowed to see.

use sea_orm::{DatabaseTransaction, TransactionTrait, prelude::*};

use crate::{EngineError, GroupRole, ResultEngine, group_memberships, groups, users};

use super::{Engine, with_tx};

impl Engine {
    /// True iff a membership row exists for (`group_id`, `user_id`).
    ///
    /// Total: unknown groups and non-members both yield `false`, never an
    /// error, for any syntactically valid id.
    pub async fn is_member(&self, group_id: &str, user_id: &str) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let role = self.member_role(&db_tx, group_id, user_id).await?;
            Ok(role.is_some())
        })
    }

    /// True iff `user_id` is the creator of `group_id`.
    pub async fn is_owner(&self, group_id: &str, user_id: &str) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let model = self.find_group_by_id(&db_tx, group_id).await?;
            Ok(model.is_some_and(|group| group.owner_id == user_id))
        })
    }

    pub(super) async fn find_group_by_id(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
    ) -> ResultEngine<Option<groups::Model>> {
        groups::Entity::find_by_id(group_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn member_role(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Option<GroupRole>> {
        let row =
            group_memberships::Entity::find_by_id((group_id.to_string(), user_id.to_string()))
                .one(db)
                .await?;
        row.as_ref()
            .map(|m| GroupRole::try_from(m.role.as_str()))
            .transpose()
    }

    /// Loads the group, requiring the caller to hold a membership row.
    pub(super) async fn require_group_member(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self
            .find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        if self.member_role(db, group_id, user_id).await?.is_none() {
            return Err(EngineError::KeyNotFound("group not exists".to_string()));
        }
        Ok(model)
    }

    /// Loads the group, requiring the caller to be its creator.
    pub(super) async fn require_group_owner(
        &self,
        db: &DatabaseTransaction,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<groups::Model> {
        let model = self
            .find_group_by_id(db, group_id)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("group not exists".to_string()))?;
        if model.owner_id != user_id {
            return Err(EngineError::KeyNotFound("group not exists".to_string()));
        }
        Ok(model)
    }

    pub(super) async fn find_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Option<users::Model>> {
        users::Entity::find_by_id(user_id.to_string())
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_user_exists(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<()> {
        if self.find_user(db, user_id).await?.is_none() {
            return Err(EngineError::KeyNotFound("user not exists".to_string()));
        }
        Ok(())
    }
}
