use super::item_ref::ItemType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-(item, branch) override row bridging a shared catalog item into a
/// branch. Unique per pair; auto-replicated under shared catalog mode.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_branch_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub item_type: ItemType,
    pub item_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub price: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub cost: Option<Decimal>,
    /// Branch-local code, unique per (tenant, branch) case-insensitively
    /// after trimming.
    pub local_code: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub min_quantity: Option<Decimal>,
    pub status: Option<String>,
    pub visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Normalised form used for branch-local code uniqueness.
pub fn normalize_local_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_codes_normalise_case_and_whitespace() {
        assert_eq!(normalize_local_code("  SKU-01 "), "sku-01");
        assert_eq!(normalize_local_code("sku-01"), "sku-01");
    }
}
