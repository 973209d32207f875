pub mod branch;
pub mod branch_inventory;
pub mod business_inventory;
pub mod catalog_branch_entry;
pub mod catalog_item;
pub mod item_ref;
pub mod stock_event;
pub mod stock_ledger_entry;
pub mod stock_transfer;
pub mod stock_transfer_line;
pub mod tenant_configuration;

pub use item_ref::{ItemRef, ItemType};
pub use stock_event::StockEventKind;
pub use stock_transfer::TransferStatus;
pub use tenant_configuration::{CatalogMode, ConfigSnapshot, InventoryMode};
