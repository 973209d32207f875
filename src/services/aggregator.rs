//! Mode-aware read path over branch and business stock figures.
//!
//! The business aggregate is a derived cache: `resync_business_aggregate`
//! recomputes it from branch figures on demand. Between resyncs it may lag;
//! that staleness is a deliberate trade-off favouring write throughput over
//! live trigger maintenance.

use crate::db::DbPool;
use crate::entities::{
    branch_inventory, business_inventory, tenant_configuration, InventoryMode, ItemRef, ItemType,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Mode-aware stock answer, always carrying the raw figures for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct VisibleStock {
    /// What callers should display for this (branch, item) under the
    /// tenant's inventory mode.
    pub visible: Decimal,
    pub mode: InventoryMode,
    pub branch_quantity: Option<Decimal>,
    pub business_quantity: Option<Decimal>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct InventoryAggregator {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InventoryAggregator {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Centralized mode answers with the business total (falling back to the
    /// branch figure when no aggregate row exists yet); per-branch mode
    /// answers with the branch figure.
    #[instrument(skip(self))]
    pub async fn get_visible_stock(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        item: ItemRef,
    ) -> Result<VisibleStock, ServiceError> {
        let db = self.db.as_ref();

        let cfg = tenant_configuration::Entity::find_by_id(tenant_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No configuration for tenant {}", tenant_id))
            })?;

        let branch_row = branch_inventory::Entity::find()
            .filter(branch_inventory::Column::TenantId.eq(tenant_id))
            .filter(branch_inventory::Column::BranchId.eq(branch_id))
            .filter(branch_inventory::Column::ItemType.eq(item.item_type()))
            .filter(branch_inventory::Column::ItemId.eq(item.item_id()))
            .one(db)
            .await?;

        let business_row = business_inventory::Entity::find()
            .filter(business_inventory::Column::TenantId.eq(tenant_id))
            .filter(business_inventory::Column::ItemType.eq(item.item_type()))
            .filter(business_inventory::Column::ItemId.eq(item.item_id()))
            .one(db)
            .await?;

        let branch_quantity = branch_row.as_ref().map(|r| r.quantity);
        let business_quantity = business_row.as_ref().map(|r| r.quantity);

        let (visible, updated_at) = match cfg.inventory_mode {
            InventoryMode::Centralized => match (&business_row, &branch_row) {
                (Some(biz), _) => (biz.quantity, Some(biz.resynced_at)),
                (None, Some(branch)) => (branch.quantity, Some(branch.updated_at)),
                (None, None) => (Decimal::ZERO, None),
            },
            InventoryMode::PerBranch => (
                branch_quantity.unwrap_or(Decimal::ZERO),
                branch_row.as_ref().map(|r| r.updated_at),
            ),
        };

        Ok(VisibleStock {
            visible,
            mode: cfg.inventory_mode,
            branch_quantity,
            business_quantity,
            updated_at,
        })
    }

    /// Recomputes the business aggregate as the sum of branch figures for
    /// the tenant (optionally a single item). Idempotent; aggregate rows
    /// whose item no longer has branch figures are zeroed, not deleted, so
    /// reserved quantities survive. Returns rows written.
    #[instrument(skip(self))]
    pub async fn resync_business_aggregate(
        &self,
        tenant_id: Uuid,
        item: Option<ItemRef>,
    ) -> Result<u64, ServiceError> {
        let db = self.db.as_ref();
        let rows = db
            .transaction::<_, u64, ServiceError>(move |txn| {
                Box::pin(async move { resync_in_txn(txn, tenant_id, item).await })
            })
            .await
            .map_err(ServiceError::from)?;

        self.event_sender
            .notify(Event::BusinessAggregateResynced { tenant_id, rows })
            .await;

        Ok(rows)
    }

    /// Branch rows at or below their minimum threshold; the read contract
    /// replenishment dashboards validate stock against.
    #[instrument(skip(self))]
    pub async fn low_stock(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Vec<branch_inventory::Model>, ServiceError> {
        let rows = branch_inventory::Entity::find()
            .filter(branch_inventory::Column::TenantId.eq(tenant_id))
            .filter(branch_inventory::Column::BranchId.eq(branch_id))
            .filter(branch_inventory::Column::MinQuantity.is_not_null())
            .all(self.db.as_ref())
            .await?;

        Ok(rows.into_iter().filter(|r| r.is_below_minimum()).collect())
    }
}

async fn resync_in_txn<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    item: Option<ItemRef>,
) -> Result<u64, ServiceError> {
    let mut branch_query =
        branch_inventory::Entity::find().filter(branch_inventory::Column::TenantId.eq(tenant_id));
    if let Some(item) = item {
        branch_query = branch_query
            .filter(branch_inventory::Column::ItemType.eq(item.item_type()))
            .filter(branch_inventory::Column::ItemId.eq(item.item_id()));
    }
    let branch_rows = branch_query.all(conn).await?;

    let mut sums: HashMap<(ItemType, Uuid), Decimal> = HashMap::new();
    for row in &branch_rows {
        *sums
            .entry((row.item_type, row.item_id))
            .or_insert(Decimal::ZERO) += row.quantity;
    }

    let mut existing_query = business_inventory::Entity::find()
        .filter(business_inventory::Column::TenantId.eq(tenant_id));
    if let Some(item) = item {
        existing_query = existing_query
            .filter(business_inventory::Column::ItemType.eq(item.item_type()))
            .filter(business_inventory::Column::ItemId.eq(item.item_id()));
    }
    let existing = existing_query.all(conn).await?;

    let now = Utc::now();
    let mut written = 0u64;

    for row in existing {
        let key = (row.item_type, row.item_id);
        let target = sums.remove(&key).unwrap_or(Decimal::ZERO);
        if row.quantity != target || row.resynced_at < now {
            let mut active: business_inventory::ActiveModel = row.into();
            active.quantity = Set(target);
            active.resynced_at = Set(now);
            active.update(conn).await?;
            written += 1;
        }
    }

    for ((item_type, item_id), total) in sums {
        let fresh = business_inventory::ActiveModel {
            tenant_id: Set(tenant_id),
            item_type: Set(item_type),
            item_id: Set(item_id),
            quantity: Set(total),
            reserved: Set(Decimal::ZERO),
            resynced_at: Set(now),
            ..Default::default()
        };
        fresh.insert(conn).await?;
        written += 1;
    }

    Ok(written)
}
