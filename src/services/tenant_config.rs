//! Per-tenant mode flags: inventory mode, catalog mode, transfer
//! permissions and the default branch. One row per tenant, auto-created on
//! tenant creation. Workflows take a [`ConfigSnapshot`] instead of
//! re-reading ambient config mid-operation.

use crate::db::DbPool;
use crate::entities::{
    tenant_configuration, CatalogMode, ConfigSnapshot, InventoryMode,
};
use crate::errors::ServiceError;
use crate::services::directory;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Partial update of the tenant flags; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TenantConfigUpdate {
    pub inventory_mode: Option<InventoryMode>,
    pub catalog_mode: Option<CatalogMode>,
    pub transfers_allowed: Option<bool>,
    pub transfer_auto_confirm: Option<bool>,
    pub default_branch_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct TenantConfigService {
    db: Arc<DbPool>,
}

impl TenantConfigService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Fetches the tenant configuration, creating the default row on first
    /// touch (per-branch inventory, shared catalog, transfers allowed,
    /// auto-confirm off). The default branch must be an active branch of the
    /// tenant.
    #[instrument(skip(self))]
    pub async fn ensure_for_tenant(
        &self,
        tenant_id: Uuid,
        default_branch_id: Uuid,
    ) -> Result<tenant_configuration::Model, ServiceError> {
        let db = self.db.as_ref();

        if let Some(existing) = tenant_configuration::Entity::find_by_id(tenant_id)
            .one(db)
            .await?
        {
            return Ok(existing);
        }

        directory::require_active_branch(db, tenant_id, default_branch_id).await?;

        let now = Utc::now();
        let fresh = tenant_configuration::ActiveModel {
            tenant_id: Set(tenant_id),
            inventory_mode: Set(InventoryMode::PerBranch),
            catalog_mode: Set(CatalogMode::Shared),
            transfers_allowed: Set(true),
            transfer_auto_confirm: Set(false),
            default_branch_id: Set(default_branch_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        fresh.insert(db).await.map_err(ServiceError::Database)
    }

    /// Reads the configuration row; `NotFound` when the tenant was never
    /// onboarded.
    pub async fn get(&self, tenant_id: Uuid) -> Result<tenant_configuration::Model, ServiceError> {
        tenant_configuration::Entity::find_by_id(tenant_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No configuration for tenant {}", tenant_id))
            })
    }

    /// Immutable flag snapshot for multi-step workflows.
    pub async fn snapshot(&self, tenant_id: Uuid) -> Result<ConfigSnapshot, ServiceError> {
        Ok(ConfigSnapshot::from(&self.get(tenant_id).await?))
    }

    /// Applies a partial flag update. Changing the default branch validates
    /// that the new branch exists, belongs to the tenant and is active, so
    /// the "one active default branch" invariant holds.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        tenant_id: Uuid,
        update: TenantConfigUpdate,
    ) -> Result<tenant_configuration::Model, ServiceError> {
        let db = self.db.as_ref();
        let updated = db
            .transaction::<_, tenant_configuration::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let current = tenant_configuration::Entity::find_by_id(tenant_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "No configuration for tenant {}",
                                tenant_id
                            ))
                        })?;

                    if let Some(branch_id) = update.default_branch_id {
                        directory::require_active_branch(txn, tenant_id, branch_id).await?;
                    }

                    let mut active: tenant_configuration::ActiveModel = current.into();
                    if let Some(mode) = update.inventory_mode {
                        active.inventory_mode = Set(mode);
                    }
                    if let Some(mode) = update.catalog_mode {
                        active.catalog_mode = Set(mode);
                    }
                    if let Some(allowed) = update.transfers_allowed {
                        active.transfers_allowed = Set(allowed);
                    }
                    if let Some(auto) = update.transfer_auto_confirm {
                        active.transfer_auto_confirm = Set(auto);
                    }
                    if let Some(branch_id) = update.default_branch_id {
                        active.default_branch_id = Set(branch_id);
                    }
                    active.updated_at = Set(Utc::now());

                    active.update(txn).await.map_err(ServiceError::Database)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        Ok(updated)
    }
}
