//! Replicates shared catalog items into per-branch bridge rows.
//!
//! Under shared catalog mode every (item, branch) pair gets a bridge row
//! cloned from the item defaults; branch operators then override price,
//! cost, local code, threshold or visibility per branch. Bulk replication
//! disambiguates duplicate local codes deterministically instead of
//! rejecting them; explicit overrides reject collisions.

use crate::db::DbPool;
use crate::entities::catalog_branch_entry::normalize_local_code;
use crate::entities::{catalog_branch_entry, catalog_item, CatalogMode, ItemRef};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{directory, tenant_config::TenantConfigService};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Branch-specific override fields; `None` keeps the current (or default)
/// value.
#[derive(Debug, Clone, Default)]
pub struct BridgeOverride {
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub local_code: Option<String>,
    pub min_quantity: Option<Decimal>,
    pub status: Option<String>,
    pub visible: Option<bool>,
}

#[derive(Clone)]
pub struct CatalogBridgeService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    config: TenantConfigService,
}

impl CatalogBridgeService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let config = TenantConfigService::new(db.clone());
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Clones every active catalog item into a bridge row for the new
    /// branch, skipping pairs that already exist. No-op unless the tenant's
    /// catalog mode is shared. Returns rows created.
    #[instrument(skip(self))]
    pub async fn on_branch_created(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
    ) -> Result<u64, ServiceError> {
        let cfg = self.config.get(tenant_id).await?;
        if cfg.catalog_mode != CatalogMode::Shared {
            return Ok(0);
        }

        let db = self.db.as_ref();
        directory::require_active_branch(db, tenant_id, branch_id).await?;

        let rows = db
            .transaction::<_, u64, ServiceError>(move |txn| {
                Box::pin(async move {
                    let items = catalog_item::Entity::find()
                        .filter(catalog_item::Column::TenantId.eq(tenant_id))
                        .filter(catalog_item::Column::Active.eq(true))
                        .all(txn)
                        .await?;

                    let existing = catalog_branch_entry::Entity::find()
                        .filter(catalog_branch_entry::Column::TenantId.eq(tenant_id))
                        .filter(catalog_branch_entry::Column::BranchId.eq(branch_id))
                        .all(txn)
                        .await?;

                    let mut present: HashSet<(crate::entities::ItemType, Uuid)> = HashSet::new();
                    let mut taken_codes: HashSet<String> = HashSet::new();
                    for row in &existing {
                        present.insert((row.item_type, row.item_id));
                        if let Some(code) = &row.local_code {
                            taken_codes.insert(normalize_local_code(code));
                        }
                    }

                    let mut created = 0u64;
                    for item in items {
                        if present.contains(&(item.item_type, item.id)) {
                            continue;
                        }
                        let code = dedupe_code(item.default_code.as_deref(), &mut taken_codes);
                        insert_bridge_row(txn, tenant_id, branch_id, &item, code).await?;
                        created += 1;
                    }

                    Ok(created)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.event_sender
            .notify(Event::BranchCatalogReplicated {
                tenant_id,
                branch_id,
                rows,
            })
            .await;

        Ok(rows)
    }

    /// Mirror of `on_branch_created` for a newly appeared catalog item:
    /// seeds a bridge row in every active branch under shared mode.
    #[instrument(skip(self))]
    pub async fn on_catalog_item_created(
        &self,
        tenant_id: Uuid,
        item: ItemRef,
    ) -> Result<u64, ServiceError> {
        let cfg = self.config.get(tenant_id).await?;
        if cfg.catalog_mode != CatalogMode::Shared {
            return Ok(0);
        }

        let db = self.db.as_ref();
        let rows = db
            .transaction::<_, u64, ServiceError>(move |txn| {
                Box::pin(async move {
                    let model = directory::require_catalog_item(txn, tenant_id, item).await?;
                    let branches = directory::active_branches(txn, tenant_id).await?;

                    let mut created = 0u64;
                    for branch in branches {
                        let exists = catalog_branch_entry::Entity::find()
                            .filter(catalog_branch_entry::Column::BranchId.eq(branch.id))
                            .filter(
                                catalog_branch_entry::Column::ItemType.eq(item.item_type()),
                            )
                            .filter(catalog_branch_entry::Column::ItemId.eq(item.item_id()))
                            .one(txn)
                            .await?
                            .is_some();
                        if exists {
                            continue;
                        }

                        let mut taken_codes = branch_codes(txn, tenant_id, branch.id).await?;
                        let code = dedupe_code(model.default_code.as_deref(), &mut taken_codes);
                        insert_bridge_row(txn, tenant_id, branch.id, &model, code).await?;
                        created += 1;
                    }

                    Ok(created)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        Ok(rows)
    }

    /// Upserts the (item, branch) override. An explicit local code that
    /// collides with another row of the same (tenant, branch) after
    /// normalisation is rejected.
    #[instrument(skip(self, fields))]
    pub async fn override_for_branch(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        item: ItemRef,
        fields: BridgeOverride,
    ) -> Result<catalog_branch_entry::Model, ServiceError> {
        let db = self.db.as_ref();
        let model = db
            .transaction::<_, catalog_branch_entry::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    directory::require_active_branch(txn, tenant_id, branch_id).await?;
                    let catalog = directory::require_catalog_item(txn, tenant_id, item).await?;

                    if let Some(code) = &fields.local_code {
                        let normalized = normalize_local_code(code);
                        if normalized.is_empty() {
                            return Err(ServiceError::Validation(
                                "Local code cannot be blank".to_string(),
                            ));
                        }
                        let siblings = catalog_branch_entry::Entity::find()
                            .filter(catalog_branch_entry::Column::TenantId.eq(tenant_id))
                            .filter(catalog_branch_entry::Column::BranchId.eq(branch_id))
                            .filter(catalog_branch_entry::Column::LocalCode.is_not_null())
                            .all(txn)
                            .await?;
                        let collision = siblings.iter().any(|row| {
                            (row.item_type != item.item_type() || row.item_id != item.item_id())
                                && row
                                    .local_code
                                    .as_deref()
                                    .map(normalize_local_code)
                                    .as_deref()
                                    == Some(normalized.as_str())
                        });
                        if collision {
                            return Err(ServiceError::Validation(format!(
                                "Local code '{}' already in use at branch {}",
                                code, branch_id
                            )));
                        }
                    }

                    let existing = catalog_branch_entry::Entity::find()
                        .filter(catalog_branch_entry::Column::BranchId.eq(branch_id))
                        .filter(catalog_branch_entry::Column::ItemType.eq(item.item_type()))
                        .filter(catalog_branch_entry::Column::ItemId.eq(item.item_id()))
                        .one(txn)
                        .await?;

                    let now = Utc::now();
                    match existing {
                        Some(row) => {
                            let mut active: catalog_branch_entry::ActiveModel = row.into();
                            if let Some(price) = fields.price {
                                active.price = Set(Some(price));
                            }
                            if let Some(cost) = fields.cost {
                                active.cost = Set(Some(cost));
                            }
                            if let Some(code) = fields.local_code {
                                active.local_code = Set(Some(code.trim().to_string()));
                            }
                            if let Some(min) = fields.min_quantity {
                                active.min_quantity = Set(Some(min));
                            }
                            if let Some(status) = fields.status {
                                active.status = Set(Some(status));
                            }
                            if let Some(visible) = fields.visible {
                                active.visible = Set(visible);
                            }
                            active.updated_at = Set(now);
                            active.update(txn).await.map_err(ServiceError::Database)
                        }
                        None => {
                            let fresh = catalog_branch_entry::ActiveModel {
                                tenant_id: Set(tenant_id),
                                branch_id: Set(branch_id),
                                item_type: Set(item.item_type()),
                                item_id: Set(item.item_id()),
                                price: Set(fields.price.or(catalog.default_price)),
                                cost: Set(fields.cost.or(catalog.default_cost)),
                                local_code: Set(fields
                                    .local_code
                                    .map(|c| c.trim().to_string())
                                    .or(catalog.default_code.clone())),
                                min_quantity: Set(fields
                                    .min_quantity
                                    .or(catalog.default_min_quantity)),
                                status: Set(fields.status),
                                visible: Set(fields.visible.unwrap_or(true)),
                                created_at: Set(now),
                                updated_at: Set(now),
                                ..Default::default()
                            };
                            fresh.insert(txn).await.map_err(ServiceError::Database)
                        }
                    }
                })
            })
            .await
            .map_err(ServiceError::from)?;

        Ok(model)
    }
}

/// Picks a branch-unique local code for a replicated row. Collisions get a
/// deterministic numeric suffix ("sku", "sku-2", "sku-3", ...) rather than
/// failing the whole replication.
fn dedupe_code(default_code: Option<&str>, taken: &mut HashSet<String>) -> Option<String> {
    let base = default_code?.trim();
    if base.is_empty() {
        return None;
    }

    let normalized_base = normalize_local_code(base);
    if taken.insert(normalized_base.clone()) {
        return Some(base.to_string());
    }

    let mut suffix = 2u32;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        let normalized = normalize_local_code(&candidate);
        if taken.insert(normalized) {
            return Some(candidate);
        }
        suffix += 1;
    }
}

async fn branch_codes<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    branch_id: Uuid,
) -> Result<HashSet<String>, ServiceError> {
    let rows = catalog_branch_entry::Entity::find()
        .filter(catalog_branch_entry::Column::TenantId.eq(tenant_id))
        .filter(catalog_branch_entry::Column::BranchId.eq(branch_id))
        .filter(catalog_branch_entry::Column::LocalCode.is_not_null())
        .all(conn)
        .await?;
    Ok(rows
        .iter()
        .filter_map(|r| r.local_code.as_deref().map(normalize_local_code))
        .collect())
}

async fn insert_bridge_row<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    branch_id: Uuid,
    item: &catalog_item::Model,
    local_code: Option<String>,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    let row = catalog_branch_entry::ActiveModel {
        tenant_id: Set(tenant_id),
        branch_id: Set(branch_id),
        item_type: Set(item.item_type),
        item_id: Set(item.id),
        price: Set(item.default_price),
        cost: Set(item.default_cost),
        local_code: Set(local_code),
        min_quantity: Set(item.default_min_quantity),
        status: Set(None),
        visible: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    row.insert(conn).await?;
    Ok(())
}
