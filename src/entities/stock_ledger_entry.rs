use super::item_ref::ItemType;
use super::stock_event::StockEventKind;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only record of an applied stock movement.
///
/// Rows are written once and never updated or deleted. `quantity` is the
/// absolute moved amount; `delta` carries the sign actually applied to the
/// branch balance, so conservation is a plain SUM over this table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub kind: StockEventKind,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub delta: Decimal,
    /// Origin of the movement: "queue", a caller-supplied label, or one of
    /// the transfer contexts ("transfer_out", "transfer_in", "transfer_cancel").
    pub context: String,
    pub reference_id: Option<Uuid>,
    pub metadata: Option<Json>,
    pub applied_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Signed movement applied to the branch balance.
    pub fn signed_delta(&self) -> Decimal {
        self.delta
    }
}
