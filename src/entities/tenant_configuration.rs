use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How stock figures are tracked for a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum InventoryMode {
    /// One pool per (tenant, item); reads go through the business aggregate.
    #[sea_orm(string_value = "centralized")]
    Centralized,
    /// Separate figure per branch.
    #[sea_orm(string_value = "per_branch")]
    PerBranch,
}

/// Whether catalog items are shared across branches (with bridge rows) or
/// managed per branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CatalogMode {
    #[sea_orm(string_value = "shared")]
    Shared,
    #[sea_orm(string_value = "per_branch")]
    PerBranch,
}

/// One row per tenant, auto-created on first touch.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant_configurations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: Uuid,
    pub inventory_mode: InventoryMode,
    pub catalog_mode: CatalogMode,
    pub transfers_allowed: bool,
    pub transfer_auto_confirm: bool,
    pub default_branch_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Immutable flag snapshot handed to multi-step workflows so a live config
/// change cannot corrupt an in-flight operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub inventory_mode: InventoryMode,
    pub catalog_mode: CatalogMode,
    pub transfers_allowed: bool,
    pub transfer_auto_confirm: bool,
    pub default_branch_id: Uuid,
}

impl From<&Model> for ConfigSnapshot {
    fn from(model: &Model) -> Self {
        Self {
            inventory_mode: model.inventory_mode,
            catalog_mode: model.catalog_mode,
            transfers_allowed: model.transfers_allowed,
            transfer_auto_confirm: model.transfer_auto_confirm,
            default_branch_id: model.default_branch_id,
        }
    }
}
