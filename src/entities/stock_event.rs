use super::item_ref::ItemType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Movement kinds. The sign convention is fixed: `sale` debits stock,
/// `purchase` and `adjustment` credit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum StockEventKind {
    #[sea_orm(string_value = "sale")]
    Sale,
    #[sea_orm(string_value = "purchase")]
    Purchase,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl StockEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockEventKind::Sale => "sale",
            StockEventKind::Purchase => "purchase",
            StockEventKind::Adjustment => "adjustment",
        }
    }

    /// Accepts the canonical names and the legacy Spanish labels still sent
    /// by older point-of-sale integrations.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sale" | "venta" => Some(StockEventKind::Sale),
            "purchase" | "compra" => Some(StockEventKind::Purchase),
            "adjustment" | "ajuste" => Some(StockEventKind::Adjustment),
            _ => None,
        }
    }

    /// Sign applied to the absolute quantity when mutating a balance.
    pub fn sign(&self) -> Decimal {
        match self {
            StockEventKind::Sale => Decimal::NEGATIVE_ONE,
            StockEventKind::Purchase | StockEventKind::Adjustment => Decimal::ONE,
        }
    }
}

/// A pending or processed stock movement in the durable queue.
///
/// `processed_at == None` iff the event is pending; once set it is never
/// cleared. `claimed_by`/`claimed_at` implement the non-blocking claim lease:
/// a claimed-but-unprocessed event is invisible to other drainers until the
/// claim is released or its lease expires.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Absent means "tenant default branch", resolved at processing time.
    pub branch_id: Option<Uuid>,
    pub item_type: ItemType,
    pub item_id: Uuid,
    pub kind: StockEventKind,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity: Decimal,
    pub reference_id: Option<Uuid>,
    pub metadata: Option<Json>,
    pub claimed_by: Option<Uuid>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_pending(&self) -> bool {
        self.processed_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_aliases() {
        assert_eq!(StockEventKind::parse("venta"), Some(StockEventKind::Sale));
        assert_eq!(
            StockEventKind::parse("  Compra "),
            Some(StockEventKind::Purchase)
        );
        assert_eq!(
            StockEventKind::parse("ajuste"),
            Some(StockEventKind::Adjustment)
        );
        assert_eq!(StockEventKind::parse("merma"), None);
    }

    #[test]
    fn sale_is_the_only_negative_kind() {
        assert_eq!(StockEventKind::Sale.sign(), Decimal::NEGATIVE_ONE);
        assert_eq!(StockEventKind::Purchase.sign(), Decimal::ONE);
        assert_eq!(StockEventKind::Adjustment.sign(), Decimal::ONE);
    }
}
