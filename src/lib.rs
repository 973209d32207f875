//! Branchstock API Library
//!
//! Multi-tenant, multi-branch stock consistency engine: a durable stock
//! event queue with a lease-claiming batch processor, a synchronous batch
//! applier, mode-aware inventory reads with an explicit business-aggregate
//! resync, a catalog/branch replication bridge, a transfer workflow and the
//! per-tenant configuration that drives all of them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared state wiring the pool, configuration and services together for a
/// worker or an embedding application.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub queue: services::StockQueueService,
    pub applier: services::DirectBatchApplier,
    pub aggregator: services::InventoryAggregator,
    pub catalog_bridge: services::CatalogBridgeService,
    pub transfers: services::TransferService,
    pub tenant_config: services::TenantConfigService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: Arc<events::EventSender>,
    ) -> Self {
        let queue = services::StockQueueService::new(db.clone(), event_sender.clone())
            .with_claim_lease(std::time::Duration::from_secs(config.claim_lease_secs));
        Self {
            queue,
            applier: services::DirectBatchApplier::new(db.clone(), event_sender.clone()),
            aggregator: services::InventoryAggregator::new(db.clone(), event_sender.clone()),
            catalog_bridge: services::CatalogBridgeService::new(db.clone(), event_sender.clone()),
            transfers: services::TransferService::new(db.clone(), event_sender.clone()),
            tenant_config: services::TenantConfigService::new(db.clone()),
            db,
            config,
            event_sender,
        }
    }
}
