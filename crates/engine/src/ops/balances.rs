use std::collections::HashMap;

use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait, prelude::*,
};

use crate::{EngineError, MoneyCents, ResultEngine, group_memberships};

use super::{Engine, with_tx};

/// Outstanding-balance summary for one user in one group.
///
/// Derived from unsettled splits only; settled splits leave the computation
/// entirely. Always reproducible from the ledger - nothing here is cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BalanceSummary {
    pub user_id: String,
    /// What others owe this user (their splits on expenses this user paid).
    pub amount_owed: MoneyCents,
    /// What this user owes others (their splits on expenses others paid).
    pub amount_owes: MoneyCents,
    /// `amount_owed - amount_owes`.
    pub net: MoneyCents,
}

impl Engine {
    /// Computes the outstanding balance of `target_user_id` in a group.
    ///
    /// Caller must be a member; any member may read any member's balance.
    pub async fn user_balance(
        &self,
        group_id: &str,
        target_user_id: &str,
        user_id: &str,
    ) -> ResultEngine<BalanceSummary> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;
            if self
                .member_role(&db_tx, group_id, target_user_id)
                .await?
                .is_none()
            {
                return Err(EngineError::KeyNotFound("member not exists".to_string()));
            }

            let amount_owed = self
                .sum_unsettled(&db_tx, group_id, target_user_id, OwedSide::OwedToUser)
                .await?;
            let amount_owes = self
                .sum_unsettled(&db_tx, group_id, target_user_id, OwedSide::OwedByUser)
                .await?;

            Ok(BalanceSummary {
                user_id: target_user_id.to_string(),
                amount_owed: MoneyCents::new(amount_owed),
                amount_owes: MoneyCents::new(amount_owes),
                net: MoneyCents::new(amount_owed - amount_owes),
            })
        })
    }

    /// Computes the outstanding balance of every member (member-visible).
    pub async fn group_balances(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> ResultEngine<Vec<BalanceSummary>> {
        let backend = self.database.get_database_backend();
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let memberships = group_memberships::Entity::find()
                .filter(group_memberships::Column::GroupId.eq(group_id.to_string()))
                .order_by_asc(group_memberships::Column::JoinedAt)
                .all(&db_tx)
                .await?;

            // Two grouped scans instead of 2N point queries.
            let owed_stmt = Statement::from_sql_and_values(
                backend,
                "SELECT e.payer_id AS user_id, COALESCE(SUM(s.amount_minor), 0) AS sum \
                 FROM expense_splits s \
                 INNER JOIN expenses e ON s.expense_id = e.id \
                 WHERE e.group_id = ? AND s.settled = 0 AND s.user_id <> e.payer_id \
                 GROUP BY e.payer_id",
                vec![group_id.into()],
            );
            let owes_stmt = Statement::from_sql_and_values(
                backend,
                "SELECT s.user_id AS user_id, COALESCE(SUM(s.amount_minor), 0) AS sum \
                 FROM expense_splits s \
                 INNER JOIN expenses e ON s.expense_id = e.id \
                 WHERE e.group_id = ? AND s.settled = 0 AND s.user_id <> e.payer_id \
                 GROUP BY s.user_id",
                vec![group_id.into()],
            );

            let mut owed_by_user: HashMap<String, i64> = HashMap::new();
            for row in db_tx.query_all(owed_stmt).await? {
                let uid: String = row.try_get("", "user_id")?;
                let sum: i64 = row.try_get("", "sum")?;
                owed_by_user.insert(uid, sum);
            }
            let mut owes_by_user: HashMap<String, i64> = HashMap::new();
            for row in db_tx.query_all(owes_stmt).await? {
                let uid: String = row.try_get("", "user_id")?;
                let sum: i64 = row.try_get("", "sum")?;
                owes_by_user.insert(uid, sum);
            }

            let mut out = Vec::with_capacity(memberships.len());
            for membership in memberships {
                let owed = owed_by_user.get(&membership.user_id).copied().unwrap_or(0);
                let owes = owes_by_user.get(&membership.user_id).copied().unwrap_or(0);
                out.push(BalanceSummary {
                    user_id: membership.user_id,
                    amount_owed: MoneyCents::new(owed),
                    amount_owes: MoneyCents::new(owes),
                    net: MoneyCents::new(owed - owes),
                });
            }
            Ok(out)
        })
    }

    async fn sum_unsettled(
        &self,
        db_tx: &DatabaseTransaction,
        group_id: &str,
        target_user_id: &str,
        side: OwedSide,
    ) -> ResultEngine<i64> {
        let backend = self.database.get_database_backend();
        // The payer's own split never counts as debt in either direction.
        let sql = match side {
            OwedSide::OwedToUser => {
                "SELECT COALESCE(SUM(s.amount_minor), 0) AS sum \
                 FROM expense_splits s \
                 INNER JOIN expenses e ON s.expense_id = e.id \
                 WHERE e.group_id = ? AND e.payer_id = ? \
                 AND s.user_id <> e.payer_id AND s.settled = 0"
            }
            OwedSide::OwedByUser => {
                "SELECT COALESCE(SUM(s.amount_minor), 0) AS sum \
                 FROM expense_splits s \
                 INNER JOIN expenses e ON s.expense_id = e.id \
                 WHERE e.group_id = ? AND s.user_id = ? \
                 AND e.payer_id <> s.user_id AND s.settled = 0"
            }
        };
        let stmt = Statement::from_sql_and_values(
            backend,
            sql,
            vec![group_id.into(), target_user_id.into()],
        );
        let row = db_tx.query_one(stmt).await?;
        Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
    }
}

#[derive(Clone, Copy)]
enum OwedSide {
    OwedToUser,
    OwedByUser,
}
