//! Expense ledger endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;

use api_types::expense::{ExpenseCreated, ExpenseList, ExpenseNew, ExpenseView, ExpensesResponse, SplitView};
use engine::RecordExpenseCmd;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
};

const DEFAULT_LIST_LIMIT: u64 = 50;

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<ExpenseNew>,
) -> Result<Json<ExpenseCreated>, ServerError> {
    let mut cmd = RecordExpenseCmd::new(
        &group_id,
        &user.id,
        payload.description,
        payload.amount_minor,
    );
    if let Some(payer_id) = payload.payer_id {
        cmd = cmd.payer_id(payer_id);
    }
    if let Some(category) = payload.category {
        cmd = cmd.category(category);
    }
    if let Some(spent_at) = payload.spent_at {
        cmd = cmd.spent_at(spent_at);
    }
    for split in payload.splits {
        cmd = cmd.split(split.user_id, split.amount_minor);
    }

    let id = state.engine.record_expense(cmd, Utc::now()).await?;
    Ok(Json(ExpenseCreated { id }))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Query(query): Query<ExpenseList>,
) -> Result<Json<ExpensesResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let expenses = state
        .engine
        .list_group_expenses(&group_id, &user.id, limit)
        .await?
        .into_iter()
        .map(|(expense, splits)| ExpenseView {
            id: expense.id,
            payer_id: expense.payer_id,
            description: expense.description,
            amount_minor: expense.amount_minor,
            category: expense.category,
            spent_at: expense.spent_at,
            created_at: expense.created_at,
            splits: splits
                .into_iter()
                .map(|split| SplitView {
                    id: split.id,
                    user_id: split.user_id,
                    amount_minor: split.amount_minor,
                    settled: split.settled,
                    settled_at: split.settled_at,
                })
                .collect(),
        })
        .collect();
    Ok(Json(ExpensesResponse { expenses }))
}
