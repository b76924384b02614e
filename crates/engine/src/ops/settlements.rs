use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    JoinType, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, MoneyCents, ResultEngine, Settlement, SettleDebtCmd, expense_splits, expenses,
    settlements, util::parse_uuid,
};

use super::{Engine, normalize_optional_text, with_tx};

/// Result of a settlement request.
///
/// `settled_amount + remaining_amount` always equals the requested amount;
/// a zero `settled_amount` is a valid outcome (no split small enough to
/// consume), not an error.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementOutcome {
    pub settled_split_ids: Vec<Uuid>,
    pub settled_amount: MoneyCents,
    pub remaining_amount: MoneyCents,
    /// Receipt written when anything was settled.
    pub receipt_id: Option<Uuid>,
}

impl Engine {
    /// Applies a payment from a debtor to a creditor against their unsettled
    /// splits, oldest debt first.
    ///
    /// Splits are retired whole: a split larger than the remaining payment
    /// stops the walk and the unapplied remainder is returned to the caller.
    /// Requests for the same (group, debtor, creditor) triple serialize on an
    /// advisory lock held across the whole transaction; each chosen split is
    /// then claimed with a conditional update so a row another writer already
    /// settled is skipped instead of double-counted.
    pub async fn settle_debt(
        &self,
        cmd: SettleDebtCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<SettlementOutcome> {
        // Cheap rejections happen before any locking.
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "settlement amount must be > 0".to_string(),
            ));
        }
        if cmd.from_user_id == cmd.to_user_id {
            return Err(EngineError::InvalidAmount(
                "from_user_id and to_user_id must differ".to_string(),
            ));
        }
        if cmd.user_id != cmd.from_user_id && cmd.user_id != cmd.to_user_id {
            return Err(EngineError::Forbidden(
                "only the debtor or the creditor may settle this debt".to_string(),
            ));
        }
        let note = normalize_optional_text(cmd.note.as_deref());

        let _pair_guard = self
            .settlement_locks
            .acquire(&cmd.group_id, &cmd.from_user_id, &cmd.to_user_id)
            .await;

        let backend = self.database.get_database_backend();
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;
            for party in [&cmd.from_user_id, &cmd.to_user_id] {
                if self
                    .member_role(&db_tx, &cmd.group_id, party)
                    .await?
                    .is_none()
                {
                    return Err(EngineError::Forbidden(format!(
                        "{party} is not a member of this group"
                    )));
                }
            }

            // FIFO debt retirement: storage order is never trusted, the sort
            // is explicit.
            let candidates = expense_splits::Entity::find()
                .join(JoinType::InnerJoin, expense_splits::Relation::Expenses.def())
                .filter(expenses::Column::GroupId.eq(cmd.group_id.clone()))
                .filter(expenses::Column::PayerId.eq(cmd.to_user_id.clone()))
                .filter(expense_splits::Column::UserId.eq(cmd.from_user_id.clone()))
                .filter(expense_splits::Column::Settled.eq(false))
                .order_by_asc(expense_splits::Column::CreatedAt)
                .order_by_asc(expense_splits::Column::Id)
                .all(&db_tx)
                .await?;

            let mut remaining = cmd.amount_minor;
            let mut settled_total: i64 = 0;
            let mut settled_split_ids: Vec<Uuid> = Vec::new();

            for split in candidates {
                if split.amount_minor > remaining {
                    // Splits are atomic; never partially settle one.
                    break;
                }

                // Claim the row only if still unsettled. Zero rows affected
                // means another writer took it: skip and move on.
                let claim = db_tx
                    .execute(Statement::from_sql_and_values(
                        backend,
                        "UPDATE expense_splits SET settled = 1, settled_at = ? \
                         WHERE id = ? AND settled = 0;",
                        vec![now.into(), split.id.clone().into()],
                    ))
                    .await?;
                if claim.rows_affected() == 0 {
                    continue;
                }

                remaining -= split.amount_minor;
                settled_total += split.amount_minor;
                settled_split_ids.push(parse_uuid(&split.id, "expense_split")?);
            }

            // Receipt carries the amount actually settled, not the request.
            let receipt_id = if settled_total > 0 {
                let receipt = Settlement::new(
                    &cmd.group_id,
                    &cmd.from_user_id,
                    &cmd.to_user_id,
                    settled_total,
                    note.clone(),
                    now,
                );
                let id = receipt.id;
                settlements::ActiveModel::from(&receipt).insert(&db_tx).await?;
                Some(id)
            } else {
                None
            };

            Ok(SettlementOutcome {
                settled_split_ids,
                settled_amount: MoneyCents::new(settled_total),
                remaining_amount: MoneyCents::new(cmd.amount_minor - settled_total),
                receipt_id,
            })
        })
    }

    /// Lists a group's settlement receipts, newest first (member-visible).
    pub async fn list_group_settlements(
        &self,
        group_id: &str,
        user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<Settlement>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let models = settlements::Entity::find()
                .filter(settlements::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(settlements::Column::CreatedAt)
                .limit(limit)
                .all(&db_tx)
                .await?;

            models.into_iter().map(Settlement::try_from).collect()
        })
    }
}
