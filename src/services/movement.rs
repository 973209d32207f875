//! The single mutation path for branch stock.
//!
//! Every write to `branch_inventory` goes through [`apply_delta`]: one
//! guarded conditional UPDATE that refuses to drive a balance negative and
//! reports zero affected rows instead of partially applying. Sales,
//! purchases, adjustments and transfer debits/credits all serialize through
//! it, which is what keeps concurrent validate-then-debit spans from jointly
//! overdrawing a row.

use crate::entities::{
    branch_inventory, stock_ledger_entry, tenant_configuration, ItemRef, StockEventKind,
};
use crate::errors::ServiceError;
use crate::services::directory;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use uuid::Uuid;

/// Caller-facing shape of one stock movement, as accepted by `enqueue` and
/// `apply_batch`. Mirrors the loose payloads upstream transaction paths send:
/// kind and quantity are optional and defaulted during validation.
#[derive(Debug, Clone, Deserialize)]
pub struct StockEventDraft {
    pub item: Option<ItemRef>,
    pub kind: Option<String>,
    pub quantity: Option<Decimal>,
    pub branch_id: Option<Uuid>,
    pub reference_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

impl StockEventDraft {
    pub fn new(item: ItemRef, kind: &str, quantity: Decimal) -> Self {
        Self {
            item: Some(item),
            kind: Some(kind.to_string()),
            quantity: Some(quantity),
            branch_id: None,
            reference_id: None,
            metadata: None,
        }
    }

    pub fn at_branch(mut self, branch_id: Uuid) -> Self {
        self.branch_id = Some(branch_id);
        self
    }

    pub fn with_reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }
}

/// A validated movement with defaults applied.
#[derive(Debug, Clone)]
pub struct NormalizedMovement {
    pub item: ItemRef,
    pub kind: StockEventKind,
    pub quantity: Decimal,
    pub branch_id: Option<Uuid>,
    pub reference_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

impl NormalizedMovement {
    /// Signed delta applied to the branch balance.
    pub fn delta(&self) -> Decimal {
        self.kind.sign() * self.quantity
    }
}

/// Validates a batch of drafts. Kind defaults to `adjustment`, quantity to
/// zero; a missing or nil item reference and a negative quantity are
/// rejected.
pub fn normalize_drafts(drafts: &[StockEventDraft]) -> Result<Vec<NormalizedMovement>, ServiceError> {
    let mut normalized = Vec::with_capacity(drafts.len());

    for (idx, draft) in drafts.iter().enumerate() {
        let item = draft
            .item
            .filter(|item| !item.is_nil())
            .ok_or_else(|| {
                ServiceError::Validation(format!("Event {}: missing item reference", idx))
            })?;

        let kind = match &draft.kind {
            Some(raw) => StockEventKind::parse(raw).ok_or_else(|| {
                ServiceError::Validation(format!("Event {}: unknown kind '{}'", idx, raw))
            })?,
            None => StockEventKind::Adjustment,
        };

        let quantity = draft.quantity.unwrap_or(Decimal::ZERO);
        if quantity < Decimal::ZERO {
            return Err(ServiceError::Validation(format!(
                "Event {}: quantity must be non-negative, got {}",
                idx, quantity
            )));
        }

        normalized.push(NormalizedMovement {
            item,
            kind,
            quantity,
            branch_id: draft.branch_id,
            reference_id: draft.reference_id,
            metadata: draft.metadata.clone(),
        });
    }

    Ok(normalized)
}

/// Resolves the branch a movement targets: the explicit branch when given,
/// otherwise the tenant's default branch. Either way the branch must exist,
/// belong to the tenant and be active.
pub(crate) async fn resolve_branch<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    explicit: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    let branch_id = match explicit {
        Some(id) => id,
        None => {
            let cfg = tenant_configuration::Entity::find_by_id(tenant_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("No configuration for tenant {}", tenant_id))
                })?;
            cfg.default_branch_id
        }
    };

    directory::require_active_branch(conn, tenant_id, branch_id).await?;
    Ok(branch_id)
}

/// Applies a signed delta to one branch inventory row.
///
/// The update is conditional on `quantity + delta >= 0`; zero affected rows
/// is disambiguated into `Underflow` (row present, insufficient stock) or
/// `NotFound` (row absent). With `create_missing`, a non-negative delta
/// against an absent row seeds it instead.
pub(crate) async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    branch_id: Uuid,
    item: ItemRef,
    delta: Decimal,
    create_missing: bool,
) -> Result<(), ServiceError> {
    let mut update = branch_inventory::Entity::update_many()
        .col_expr(
            branch_inventory::Column::Quantity,
            Expr::col(branch_inventory::Column::Quantity).add(delta),
        )
        .col_expr(
            branch_inventory::Column::UpdatedAt,
            Expr::value(Utc::now()),
        )
        .filter(branch_inventory::Column::TenantId.eq(tenant_id))
        .filter(branch_inventory::Column::BranchId.eq(branch_id))
        .filter(branch_inventory::Column::ItemType.eq(item.item_type()))
        .filter(branch_inventory::Column::ItemId.eq(item.item_id()));

    if delta < Decimal::ZERO {
        // Non-negativity guard; also the serialization point under contention.
        update = update.filter(branch_inventory::Column::Quantity.gte(-delta));
    }

    let rows = update.exec(conn).await?.rows_affected;
    if rows == 1 {
        return Ok(());
    }

    let existing = branch_inventory::Entity::find()
        .filter(branch_inventory::Column::TenantId.eq(tenant_id))
        .filter(branch_inventory::Column::BranchId.eq(branch_id))
        .filter(branch_inventory::Column::ItemType.eq(item.item_type()))
        .filter(branch_inventory::Column::ItemId.eq(item.item_id()))
        .one(conn)
        .await?;

    match existing {
        Some(row) => Err(ServiceError::Underflow(format!(
            "Insufficient stock for {} at branch {}: available {}, delta {}",
            item, branch_id, row.quantity, delta
        ))),
        None if create_missing && delta >= Decimal::ZERO => {
            let seeded = branch_inventory::ActiveModel {
                tenant_id: Set(tenant_id),
                branch_id: Set(branch_id),
                item_type: Set(item.item_type()),
                item_id: Set(item.item_id()),
                quantity: Set(delta),
                min_quantity: Set(None),
                updated_at: Set(Utc::now()),
                ..Default::default()
            };
            seeded.insert(conn).await.map_err(|e| {
                // Unique key raced with a concurrent seed of the same row.
                ServiceError::ConcurrencyConflict(format!(
                    "Branch inventory row for {} at {} created concurrently: {}",
                    item, branch_id, e
                ))
            })?;
            Ok(())
        }
        None => Err(ServiceError::NotFound(format!(
            "No branch inventory row for {} at branch {}",
            item, branch_id
        ))),
    }
}

/// Appends the write-once ledger record for an applied movement.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn append_ledger<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    branch_id: Uuid,
    item: ItemRef,
    kind: StockEventKind,
    quantity: Decimal,
    delta: Decimal,
    context: &str,
    reference_id: Option<Uuid>,
    metadata: Option<serde_json::Value>,
) -> Result<(), ServiceError> {
    let entry = stock_ledger_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        branch_id: Set(branch_id),
        item_type: Set(item.item_type()),
        item_id: Set(item.item_id()),
        kind: Set(kind),
        quantity: Set(quantity),
        delta: Set(delta),
        context: Set(context.to_string()),
        reference_id: Set(reference_id),
        metadata: Set(metadata),
        applied_at: Set(Utc::now()),
    };
    entry.insert(conn).await?;
    Ok(())
}

/// Applies one normalized movement against a resolved branch and writes its
/// ledger row. Used by the queue processor, the direct applier and the
/// transfer workflow, always inside the caller's transaction.
pub(crate) async fn apply_movement<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    branch_id: Uuid,
    movement: &NormalizedMovement,
    context: &str,
    create_missing: bool,
) -> Result<(), ServiceError> {
    let delta = movement.delta();
    apply_delta(conn, tenant_id, branch_id, movement.item, delta, create_missing).await?;
    append_ledger(
        conn,
        tenant_id,
        branch_id,
        movement.item,
        movement.kind,
        movement.quantity,
        delta,
        context,
        movement.reference_id,
        movement.metadata.clone(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product_draft(qty: Decimal, kind: Option<&str>) -> StockEventDraft {
        StockEventDraft {
            item: Some(ItemRef::Product(Uuid::new_v4())),
            kind: kind.map(str::to_string),
            quantity: Some(qty),
            branch_id: None,
            reference_id: None,
            metadata: None,
        }
    }

    #[test]
    fn defaults_kind_and_quantity() {
        let draft = StockEventDraft {
            item: Some(ItemRef::Product(Uuid::new_v4())),
            kind: None,
            quantity: None,
            branch_id: None,
            reference_id: None,
            metadata: None,
        };
        let normalized = normalize_drafts(&[draft]).expect("valid draft");
        assert_eq!(normalized[0].kind, StockEventKind::Adjustment);
        assert_eq!(normalized[0].quantity, Decimal::ZERO);
    }

    #[test]
    fn rejects_missing_item() {
        let draft = StockEventDraft {
            item: None,
            kind: Some("sale".into()),
            quantity: Some(dec!(1)),
            branch_id: None,
            reference_id: None,
            metadata: None,
        };
        assert!(matches!(
            normalize_drafts(&[draft]),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn rejects_nil_item_and_unknown_kind() {
        let nil = StockEventDraft {
            item: Some(ItemRef::Product(Uuid::nil())),
            kind: None,
            quantity: None,
            branch_id: None,
            reference_id: None,
            metadata: None,
        };
        assert!(normalize_drafts(&[nil]).is_err());
        assert!(normalize_drafts(&[product_draft(dec!(1), Some("refund"))]).is_err());
    }

    #[test]
    fn sale_delta_is_negative() {
        let normalized = normalize_drafts(&[product_draft(dec!(5), Some("venta"))]).unwrap();
        assert_eq!(normalized[0].delta(), dec!(-5));
    }

    #[test]
    fn rejects_negative_quantity() {
        assert!(matches!(
            normalize_drafts(&[product_draft(dec!(-3), Some("purchase"))]),
            Err(ServiceError::Validation(_))
        ));
    }
}
