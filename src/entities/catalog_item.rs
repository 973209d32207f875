use super::item_ref::ItemType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read model of the catalog store. Source of truth for item existence and
/// the defaults used to seed bridge rows; read-only from this core.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub item_type: ItemType,
    pub name: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub default_price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub default_cost: Option<Decimal>,
    pub default_code: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub default_min_quantity: Option<Decimal>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn item_ref(&self) -> super::item_ref::ItemRef {
        super::item_ref::ItemRef::new(self.item_type, self.id)
    }
}
