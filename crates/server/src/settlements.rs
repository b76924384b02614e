//! Settlement endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::Utc;

use api_types::settlement::{
    SettlementList, SettlementNew, SettlementResult, SettlementView, SettlementsResponse,
};
use engine::SettleDebtCmd;

use crate::{
    ServerError,
    server::{AuthUser, ServerState},
};

const DEFAULT_LIST_LIMIT: u64 = 50;

pub async fn create(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Json(payload): Json<SettlementNew>,
) -> Result<Json<SettlementResult>, ServerError> {
    let from_user_id = payload.from_user_id.clone();
    let to_user_id = payload.to_user_id.clone();

    let mut cmd = SettleDebtCmd::new(
        &group_id,
        &user.id,
        payload.from_user_id,
        payload.to_user_id,
        payload.amount_minor,
    );
    if let Some(note) = payload.note {
        cmd = cmd.note(note);
    }

    let outcome = state.engine.settle_debt(cmd, Utc::now()).await?;

    // Tell the counterparty once something was actually settled.
    if outcome.settled_amount.is_positive()
        && let Ok(overview) = state.engine.group_overview(&group_id, &user.id).await
    {
        let counterparty_id = if user.id == from_user_id {
            &to_user_id
        } else {
            &from_user_id
        };
        if let Some(counterparty) = overview
            .members
            .iter()
            .find(|member| &member.user_id == counterparty_id)
        {
            state.notify(
                counterparty.email.clone(),
                format!("Debt settled in {}", overview.group.name),
                format!(
                    "{} settled {} {} between {} and {}.",
                    user.display_name,
                    outcome.settled_amount,
                    overview.group.currency.code(),
                    from_user_id,
                    to_user_id
                ),
            );
        }
    }

    Ok(Json(SettlementResult {
        settled_split_ids: outcome.settled_split_ids,
        settled_amount_minor: outcome.settled_amount.cents(),
        remaining_amount_minor: outcome.remaining_amount.cents(),
        receipt_id: outcome.receipt_id,
    }))
}

pub async fn list(
    Extension(user): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(group_id): Path<String>,
    Query(query): Query<SettlementList>,
) -> Result<Json<SettlementsResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let settlements = state
        .engine
        .list_group_settlements(&group_id, &user.id, limit)
        .await?
        .into_iter()
        .map(|settlement| SettlementView {
            id: settlement.id,
            payer_id: settlement.payer_id,
            receiver_id: settlement.receiver_id,
            amount_minor: settlement.amount_minor,
            description: settlement.description,
            created_at: settlement.created_at,
        })
        .collect();
    Ok(Json(SettlementsResponse { settlements }))
}
