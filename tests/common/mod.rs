#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use branchstock_api::db::{self, DbConfig, DbPool};
use branchstock_api::entities::{
    branch, branch_inventory, catalog_item, stock_ledger_entry, ItemRef, ItemType,
};
use branchstock_api::events::{Event, EventSender};
use branchstock_api::services::{
    CatalogBridgeService, DirectBatchApplier, InventoryAggregator, StockQueueService,
    TenantConfigService, TransferService,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Test harness over a fresh in-memory SQLite database with migrations
/// applied. Each harness gets its own named database so parallel tests never
/// share state.
pub struct TestCtx {
    pub db: Arc<DbPool>,
    pub events: Arc<EventSender>,
    // Keeps the channel open so notifies stay quiet.
    _event_rx: mpsc::Receiver<Event>,
}

impl TestCtx {
    pub async fn new() -> Self {
        let config = DbConfig {
            url: format!(
                "sqlite:file:test-{}?mode=memory&cache=shared",
                Uuid::new_v4()
            ),
            max_connections: 5,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&config)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let (tx, rx) = mpsc::channel(256);
        Self {
            db: Arc::new(pool),
            events: Arc::new(EventSender::new(tx)),
            _event_rx: rx,
        }
    }

    pub fn queue(&self) -> StockQueueService {
        StockQueueService::new(self.db.clone(), self.events.clone())
    }

    pub fn queue_with_lease(&self, lease: Duration) -> StockQueueService {
        self.queue().with_claim_lease(lease)
    }

    pub fn applier(&self) -> DirectBatchApplier {
        DirectBatchApplier::new(self.db.clone(), self.events.clone())
    }

    pub fn aggregator(&self) -> InventoryAggregator {
        InventoryAggregator::new(self.db.clone(), self.events.clone())
    }

    pub fn bridge(&self) -> CatalogBridgeService {
        CatalogBridgeService::new(self.db.clone(), self.events.clone())
    }

    pub fn transfers(&self) -> TransferService {
        TransferService::new(self.db.clone(), self.events.clone())
    }

    pub fn tenant_config(&self) -> TenantConfigService {
        TenantConfigService::new(self.db.clone())
    }
}

/// Creates a branch for the tenant and returns its id.
pub async fn insert_branch(ctx: &TestCtx, tenant_id: Uuid, name: &str, active: bool) -> Uuid {
    let id = Uuid::new_v4();
    let row = branch::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id),
        name: Set(name.to_string()),
        active: Set(active),
        created_at: Set(Utc::now()),
    };
    row.insert(ctx.db.as_ref()).await.expect("insert branch");
    id
}

/// Seeds a tenant with one active branch and its default configuration row.
/// Returns (tenant_id, default_branch_id).
pub async fn seed_tenant(ctx: &TestCtx) -> (Uuid, Uuid) {
    let tenant_id = Uuid::new_v4();
    let branch_id = insert_branch(ctx, tenant_id, "Main", true).await;
    ctx.tenant_config()
        .ensure_for_tenant(tenant_id, branch_id)
        .await
        .expect("seed tenant configuration");
    (tenant_id, branch_id)
}

pub async fn insert_product(ctx: &TestCtx, tenant_id: Uuid, name: &str) -> ItemRef {
    insert_item(ctx, tenant_id, ItemType::Product, name, None).await
}

pub async fn insert_item(
    ctx: &TestCtx,
    tenant_id: Uuid,
    item_type: ItemType,
    name: &str,
    default_code: Option<&str>,
) -> ItemRef {
    let id = Uuid::new_v4();
    let row = catalog_item::ActiveModel {
        id: Set(id),
        tenant_id: Set(tenant_id),
        item_type: Set(item_type),
        name: Set(name.to_string()),
        default_price: Set(None),
        default_cost: Set(None),
        default_code: Set(default_code.map(str::to_string)),
        default_min_quantity: Set(None),
        active: Set(true),
        created_at: Set(Utc::now()),
    };
    row.insert(ctx.db.as_ref()).await.expect("insert item");
    ItemRef::new(item_type, id)
}

/// Seeds a branch inventory row directly.
pub async fn seed_stock(
    ctx: &TestCtx,
    tenant_id: Uuid,
    branch_id: Uuid,
    item: ItemRef,
    quantity: Decimal,
    min_quantity: Option<Decimal>,
) {
    let row = branch_inventory::ActiveModel {
        tenant_id: Set(tenant_id),
        branch_id: Set(branch_id),
        item_type: Set(item.item_type()),
        item_id: Set(item.item_id()),
        quantity: Set(quantity),
        min_quantity: Set(min_quantity),
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    row.insert(ctx.db.as_ref()).await.expect("seed stock");
}

/// Current branch quantity, or `None` when the row does not exist.
pub async fn branch_qty(
    ctx: &TestCtx,
    tenant_id: Uuid,
    branch_id: Uuid,
    item: ItemRef,
) -> Option<Decimal> {
    branch_inventory::Entity::find()
        .filter(branch_inventory::Column::TenantId.eq(tenant_id))
        .filter(branch_inventory::Column::BranchId.eq(branch_id))
        .filter(branch_inventory::Column::ItemType.eq(item.item_type()))
        .filter(branch_inventory::Column::ItemId.eq(item.item_id()))
        .one(ctx.db.as_ref())
        .await
        .expect("query branch inventory")
        .map(|r| r.quantity)
}

/// Ledger rows for one (tenant, branch, item), oldest first.
pub async fn ledger_rows(
    ctx: &TestCtx,
    tenant_id: Uuid,
    branch_id: Uuid,
    item: ItemRef,
) -> Vec<stock_ledger_entry::Model> {
    stock_ledger_entry::Entity::find()
        .filter(stock_ledger_entry::Column::TenantId.eq(tenant_id))
        .filter(stock_ledger_entry::Column::BranchId.eq(branch_id))
        .filter(stock_ledger_entry::Column::ItemType.eq(item.item_type()))
        .filter(stock_ledger_entry::Column::ItemId.eq(item.item_id()))
        .all(ctx.db.as_ref())
        .await
        .expect("query ledger")
}

/// Sum of signed ledger deltas; must always equal the branch quantity for
/// rows this engine created itself.
pub async fn ledger_sum(ctx: &TestCtx, tenant_id: Uuid, branch_id: Uuid, item: ItemRef) -> Decimal {
    ledger_rows(ctx, tenant_id, branch_id, item)
        .await
        .iter()
        .map(|r| r.delta)
        .sum()
}
