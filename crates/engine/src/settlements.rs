//! Settlements: append-only receipts of debt payments.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub group_id: String,
    pub payer_id: String,
    pub receiver_id: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    pub fn new(
        group_id: &str,
        payer_id: &str,
        receiver_id: &str,
        amount_minor: i64,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: group_id.to_string(),
            payer_id: payer_id.to_string(),
            receiver_id: receiver_id.to_string(),
            amount_minor,
            description,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: String,
    pub payer_id: String,
    pub receiver_id: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
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

impl From<&Settlement> for ActiveModel {
    fn from(settlement: &Settlement) -> Self {
        Self {
            id: ActiveValue::Set(settlement.id.to_string()),
            group_id: ActiveValue::Set(settlement.group_id.clone()),
            payer_id: ActiveValue::Set(settlement.payer_id.clone()),
            receiver_id: ActiveValue::Set(settlement.receiver_id.clone()),
            amount_minor: ActiveValue::Set(settlement.amount_minor),
            description: ActiveValue::Set(settlement.description.clone()),
            created_at: ActiveValue::Set(settlement.created_at),
        }
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "settlement")?,
            group_id: model.group_id,
            payer_id: model.payer_id,
            receiver_id: model.receiver_id,
            amount_minor: model.amount_minor,
            description: model.description,
            created_at: model.created_at,
        })
    }
}
