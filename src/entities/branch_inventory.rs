use super::item_ref::ItemType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-(tenant, branch, item) stock figure. Mutated only by the queue
/// processor and the direct applier, always through the guarded conditional
/// update in `services::movement`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "branch_inventory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub min_quantity: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_below_minimum(&self) -> bool {
        match self.min_quantity {
            Some(min) => self.quantity <= min,
            None => false,
        }
    }
}
