//! Read-side lookups against the tenant/branch directory and the catalog
//! store. Both are owned by external collaborators; this core only resolves
//! existence, active status and defaults, always scoped by tenant.

use crate::entities::{branch, catalog_item, ItemRef};
use crate::errors::ServiceError;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

/// Looks up a branch and requires it to belong to the tenant and be active.
pub async fn require_active_branch<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    branch_id: Uuid,
) -> Result<branch::Model, ServiceError> {
    let found = branch::Entity::find_by_id(branch_id)
        .filter(branch::Column::TenantId.eq(tenant_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Branch {} not found for tenant {}", branch_id, tenant_id))
        })?;

    if !found.active {
        return Err(ServiceError::Validation(format!(
            "Branch {} is inactive",
            branch_id
        )));
    }

    Ok(found)
}

/// All active branches of a tenant.
pub async fn active_branches<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
) -> Result<Vec<branch::Model>, ServiceError> {
    branch::Entity::find()
        .filter(branch::Column::TenantId.eq(tenant_id))
        .filter(branch::Column::Active.eq(true))
        .all(conn)
        .await
        .map_err(ServiceError::Database)
}

/// Looks up a catalog item by its typed reference, scoped by tenant.
pub async fn require_catalog_item<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    item: ItemRef,
) -> Result<catalog_item::Model, ServiceError> {
    catalog_item::Entity::find_by_id(item.item_id())
        .filter(catalog_item::Column::TenantId.eq(tenant_id))
        .filter(catalog_item::Column::ItemType.eq(item.item_type()))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Catalog item {} not found for tenant {}", item, tenant_id))
        })
}
