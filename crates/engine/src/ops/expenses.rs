use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{
    EngineError, Expense, ExpenseSplit, MoneyCents, RecordExpenseCmd, ResultEngine,
    expense_splits, expenses, group_memberships,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Records a shared expense and its per-member splits as one atomic unit.
    ///
    /// The split amounts must sum to the expense amount exactly (amounts are
    /// integer minor units, so the check is plain equality). Any failure
    /// rolls back the whole insert; there is no state with an expense and no
    /// splits.
    pub async fn record_expense(
        &self,
        cmd: RecordExpenseCmd,
        now: DateTime<Utc>,
    ) -> ResultEngine<Uuid> {
        let description = normalize_required_text(&cmd.description, "description")?;
        let category = normalize_optional_text(cmd.category.as_deref());

        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        if cmd.splits.is_empty() {
            return Err(EngineError::InvalidAmount(
                "expense needs at least one split".to_string(),
            ));
        }

        let mut split_total: i64 = 0;
        let mut seen: HashSet<&str> = HashSet::with_capacity(cmd.splits.len());
        for share in &cmd.splits {
            if share.amount_minor < 0 {
                return Err(EngineError::InvalidAmount(
                    "split amounts must be >= 0".to_string(),
                ));
            }
            if !seen.insert(share.user_id.as_str()) {
                return Err(EngineError::InvalidAmount(format!(
                    "duplicate split for user {}",
                    share.user_id
                )));
            }
            split_total = split_total.checked_add(share.amount_minor).ok_or_else(|| {
                EngineError::InvalidAmount("split amounts overflow".to_string())
            })?;
        }
        if split_total != cmd.amount_minor {
            return Err(EngineError::InvalidAmount(format!(
                "splits sum to {}, expense amount is {}",
                MoneyCents::new(split_total),
                MoneyCents::new(cmd.amount_minor)
            )));
        }

        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, &cmd.group_id, &cmd.user_id)
                .await?;

            // One membership scan covers the payer and every split debtor.
            let member_ids: HashSet<String> = group_memberships::Entity::find()
                .filter(group_memberships::Column::GroupId.eq(cmd.group_id.clone()))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.user_id)
                .collect();

            if !member_ids.contains(&cmd.payer_id) {
                return Err(EngineError::Forbidden(
                    "payer is not a group member".to_string(),
                ));
            }
            for share in &cmd.splits {
                if !member_ids.contains(&share.user_id) {
                    return Err(EngineError::Forbidden(format!(
                        "split user {} is not a group member",
                        share.user_id
                    )));
                }
            }

            let expense = Expense::new(
                &cmd.group_id,
                &cmd.payer_id,
                description,
                cmd.amount_minor,
                category,
                cmd.spent_at.unwrap_or(now),
                now,
            )?;
            let expense_id = expense.id;
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;

            for share in &cmd.splits {
                let split = ExpenseSplit::new(expense_id, &share.user_id, share.amount_minor, now);
                expense_splits::ActiveModel::from(&split).insert(&db_tx).await?;
            }

            Ok(expense_id)
        })
    }

    /// Lists a group's expenses with their splits, newest first.
    pub async fn list_group_expenses(
        &self,
        group_id: &str,
        user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<(Expense, Vec<ExpenseSplit>)>> {
        with_tx!(self, |db_tx| {
            self.require_group_member(&db_tx, group_id, user_id).await?;

            let expense_models = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group_id.to_string()))
                .order_by_desc(expenses::Column::CreatedAt)
                .order_by_desc(expenses::Column::Id)
                .limit(limit)
                .all(&db_tx)
                .await?;

            let expense_ids: Vec<String> =
                expense_models.iter().map(|m| m.id.clone()).collect();
            let split_models = expense_splits::Entity::find()
                .filter(expense_splits::Column::ExpenseId.is_in(expense_ids))
                .order_by_asc(expense_splits::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let mut splits_by_expense: HashMap<Uuid, Vec<ExpenseSplit>> = HashMap::new();
            for model in split_models {
                let split = ExpenseSplit::try_from(model)?;
                splits_by_expense
                    .entry(split.expense_id)
                    .or_default()
                    .push(split);
            }

            let mut out = Vec::with_capacity(expense_models.len());
            for model in expense_models {
                let expense = Expense::try_from(model)?;
                let splits = splits_by_expense.remove(&expense.id).unwrap_or_default();
                out.push((expense, splits));
            }
            Ok(out)
        })
    }
}
