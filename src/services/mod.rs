//! Service layer: one struct per workflow, all sharing the connection pool
//! and the event sender.

pub mod aggregator;
pub mod applier;
pub mod catalog_bridge;
pub mod directory;
pub mod movement;
pub mod queue;
pub mod tenant_config;
pub mod transfers;

pub use aggregator::{InventoryAggregator, VisibleStock};
pub use applier::DirectBatchApplier;
pub use catalog_bridge::{BridgeOverride, CatalogBridgeService};
pub use movement::{NormalizedMovement, StockEventDraft};
pub use queue::StockQueueService;
pub use tenant_config::{TenantConfigService, TenantConfigUpdate};
pub use transfers::{TransferLineDraft, TransferService};
