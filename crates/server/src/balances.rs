//! Outstanding-balance endpoints (pure reads).

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use api_types::balance::{BalanceView, BalancesResponse};
use engine::BalanceSummary;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
};

fn balance_view(summary: BalanceSummary) -> BalanceView {
    BalanceView {
        user_id: summary.user_id,
        amount_owed_minor: summary.amount_owed.cents(),
        amount_owes_minor: summary.amount_owes.cents(),
        net_minor: summary.net.cents(),
    }
}

pub async fn group(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
) -> Result<Json<BalancesResponse>, ServerError> {
    let balances = state
        .engine
        .group_balances(&group_id, &user.id)
        .await?
        .into_iter()
        .map(balance_view)
        .collect();
    Ok(Json(BalancesResponse { balances }))
}

pub async fn user(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((group_id, target_user_id)): Path<(String, String)>,
) -> Result<Json<BalanceView>, ServerError> {
    let summary = state
        .engine
        .user_balance(&group_id, &target_user_id, &user.id)
        .await?;
    Ok(Json(balance_view(summary)))
}
