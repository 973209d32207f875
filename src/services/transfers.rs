//! Stock transfer state machine: draft → confirmed → received, with
//! cancellation from draft or (with a symmetric reversal of the origin
//! debit) from confirmed.
//!
//! Mode flags are snapshotted onto the header at creation; the workflow
//! never re-reads ambient configuration mid-operation. Status flips use a
//! conditional update on the expected status, so two concurrent confirms of
//! the same transfer cannot both debit.

use crate::db::DbPool;
use crate::entities::{
    stock_transfer, stock_transfer_line, ConfigSnapshot, ItemRef, StockEventKind, TransferStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::applier::DirectBatchApplier;
use crate::services::movement::NormalizedMovement;
use crate::services::{directory, tenant_config::TenantConfigService};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One requested line of a transfer.
#[derive(Debug, Clone)]
pub struct TransferLineDraft {
    pub item: ItemRef,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub lot: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TransferLineDraft {
    pub fn new(item: ItemRef, quantity: Decimal) -> Self {
        Self {
            item,
            quantity,
            unit: None,
            lot: None,
            metadata: None,
        }
    }
}

#[derive(Clone)]
pub struct TransferService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    config: TenantConfigService,
}

impl TransferService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let config = TenantConfigService::new(db.clone());
        Self {
            db,
            event_sender,
            config,
        }
    }

    /// Creates a draft transfer, snapshotting the tenant flags for the rest
    /// of the workflow. No stock moves yet.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn create(
        &self,
        tenant_id: Uuid,
        origin_branch_id: Uuid,
        destination_branch_id: Uuid,
        lines: Vec<TransferLineDraft>,
        created_by: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        if origin_branch_id == destination_branch_id {
            return Err(ServiceError::Validation(
                "Origin and destination branches must differ".to_string(),
            ));
        }
        if lines.is_empty() {
            return Err(ServiceError::Validation(
                "A transfer requires at least one line".to_string(),
            ));
        }
        for (idx, line) in lines.iter().enumerate() {
            if line.quantity <= Decimal::ZERO {
                return Err(ServiceError::Validation(format!(
                    "Line {}: quantity must be positive, got {}",
                    idx, line.quantity
                )));
            }
            if line.item.is_nil() {
                return Err(ServiceError::Validation(format!(
                    "Line {}: missing item reference",
                    idx
                )));
            }
        }

        let snapshot: ConfigSnapshot = self.config.snapshot(tenant_id).await?;
        if !snapshot.transfers_allowed {
            return Err(ServiceError::Validation(format!(
                "Transfers are disabled for tenant {}",
                tenant_id
            )));
        }

        let db = self.db.as_ref();
        let created = db
            .transaction::<_, stock_transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    directory::require_active_branch(txn, tenant_id, origin_branch_id).await?;
                    directory::require_active_branch(txn, tenant_id, destination_branch_id).await?;

                    let header = stock_transfer::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        tenant_id: Set(tenant_id),
                        origin_branch_id: Set(origin_branch_id),
                        destination_branch_id: Set(destination_branch_id),
                        status: Set(TransferStatus::Draft),
                        created_by: Set(created_by),
                        approved_by: Set(None),
                        snapshot_inventory_mode: Set(snapshot.inventory_mode),
                        snapshot_transfers_allowed: Set(snapshot.transfers_allowed),
                        snapshot_auto_confirm: Set(snapshot.transfer_auto_confirm),
                        metadata: Set(None),
                        created_at: Set(Utc::now()),
                        confirmed_at: Set(None),
                        received_at: Set(None),
                        cancelled_at: Set(None),
                    };
                    let header = header.insert(txn).await?;

                    for line in lines {
                        let row = stock_transfer_line::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            transfer_id: Set(header.id),
                            item_type: Set(line.item.item_type()),
                            item_id: Set(line.item.item_id()),
                            quantity: Set(line.quantity),
                            unit: Set(line.unit),
                            lot: Set(line.lot),
                            metadata: Set(line.metadata),
                        };
                        row.insert(txn).await?;
                    }

                    Ok(header)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.event_sender
            .notify(Event::TransferCreated(created.id))
            .await;

        Ok(created)
    }

    /// Confirms a draft: validates and debits origin stock for every line
    /// atomically (context "transfer_out"). Any line that would underflow
    /// rejects the whole transfer with no partial effect. When the creation
    /// snapshot had auto-confirm set, the transfer is received immediately
    /// after.
    #[instrument(skip(self))]
    pub async fn confirm(
        &self,
        transfer_id: Uuid,
        approver: Uuid,
    ) -> Result<stock_transfer::Model, ServiceError> {
        let db = self.db.as_ref();
        let confirmed = db
            .transaction::<_, stock_transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = require_transfer(txn, transfer_id).await?;
                    claim_transition(txn, &header, TransferStatus::Draft, TransferStatus::Confirmed)
                        .await?;

                    let movements =
                        line_movements(txn, &header, StockEventKind::Sale).await?;
                    DirectBatchApplier::apply_in_txn(
                        txn,
                        header.tenant_id,
                        &movements,
                        "transfer_out",
                    )
                    .await?;

                    let mut active: stock_transfer::ActiveModel = header.into();
                    active.status = Set(TransferStatus::Confirmed);
                    active.approved_by = Set(Some(approver));
                    active.confirmed_at = Set(Some(Utc::now()));
                    active.update(txn).await.map_err(ServiceError::Database)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.event_sender
            .notify(Event::TransferConfirmed(confirmed.id))
            .await;

        if confirmed.snapshot_auto_confirm {
            info!(transfer_id = %confirmed.id, "auto-confirm snapshot set; receiving immediately");
            return self.receive(confirmed.id).await;
        }

        Ok(confirmed)
    }

    /// Receives a confirmed transfer: credits the destination per line
    /// (context "transfer_in"), creating missing branch rows.
    #[instrument(skip(self))]
    pub async fn receive(&self, transfer_id: Uuid) -> Result<stock_transfer::Model, ServiceError> {
        let db = self.db.as_ref();
        let received = db
            .transaction::<_, stock_transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = require_transfer(txn, transfer_id).await?;
                    claim_transition(
                        txn,
                        &header,
                        TransferStatus::Confirmed,
                        TransferStatus::Received,
                    )
                    .await?;

                    let movements =
                        destination_movements(txn, &header, StockEventKind::Purchase).await?;
                    DirectBatchApplier::apply_in_txn(
                        txn,
                        header.tenant_id,
                        &movements,
                        "transfer_in",
                    )
                    .await?;

                    let mut active: stock_transfer::ActiveModel = header.into();
                    active.status = Set(TransferStatus::Received);
                    active.received_at = Set(Some(Utc::now()));
                    active.update(txn).await.map_err(ServiceError::Database)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.event_sender
            .notify(Event::TransferReceived(received.id))
            .await;

        Ok(received)
    }

    /// Cancels a transfer. From draft this only flips the status; from
    /// confirmed the origin debit is symmetrically reversed (context
    /// "transfer_cancel") in the same transaction. Received and cancelled
    /// transfers cannot be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel(&self, transfer_id: Uuid) -> Result<stock_transfer::Model, ServiceError> {
        let db = self.db.as_ref();
        let cancelled = db
            .transaction::<_, stock_transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = require_transfer(txn, transfer_id).await?;

                    match header.status {
                        TransferStatus::Draft => {
                            claim_transition(
                                txn,
                                &header,
                                TransferStatus::Draft,
                                TransferStatus::Cancelled,
                            )
                            .await?;
                        }
                        TransferStatus::Confirmed => {
                            claim_transition(
                                txn,
                                &header,
                                TransferStatus::Confirmed,
                                TransferStatus::Cancelled,
                            )
                            .await?;
                            // Undo the origin debit so conservation holds.
                            let movements =
                                line_movements(txn, &header, StockEventKind::Purchase).await?;
                            DirectBatchApplier::apply_in_txn(
                                txn,
                                header.tenant_id,
                                &movements,
                                "transfer_cancel",
                            )
                            .await?;
                        }
                        TransferStatus::Received | TransferStatus::Cancelled => {
                            return Err(ServiceError::InvalidStateTransition(format!(
                                "Transfer {} is {} and cannot be cancelled",
                                header.id,
                                header.status.as_str()
                            )));
                        }
                    }

                    let mut active: stock_transfer::ActiveModel = header.into();
                    active.status = Set(TransferStatus::Cancelled);
                    active.cancelled_at = Set(Some(Utc::now()));
                    active.update(txn).await.map_err(ServiceError::Database)
                })
            })
            .await
            .map_err(ServiceError::from)?;

        self.event_sender
            .notify(Event::TransferCancelled(cancelled.id))
            .await;

        Ok(cancelled)
    }

    /// Loads a transfer header with its lines.
    pub async fn get(
        &self,
        transfer_id: Uuid,
    ) -> Result<(stock_transfer::Model, Vec<stock_transfer_line::Model>), ServiceError> {
        let db = self.db.as_ref();
        let header = require_transfer(db, transfer_id).await?;
        let lines = stock_transfer_line::Entity::find()
            .filter(stock_transfer_line::Column::TransferId.eq(transfer_id))
            .all(db)
            .await?;
        Ok((header, lines))
    }
}

async fn require_transfer<C: ConnectionTrait>(
    conn: &C,
    transfer_id: Uuid,
) -> Result<stock_transfer::Model, ServiceError> {
    stock_transfer::Entity::find_by_id(transfer_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))
}

/// Conditionally claims a status transition. Zero affected rows means the
/// header is not in `from` anymore: wrong-state calls and concurrent racers
/// both land here, with no side effect.
async fn claim_transition(
    txn: &DatabaseTransaction,
    header: &stock_transfer::Model,
    from: TransferStatus,
    to: TransferStatus,
) -> Result<(), ServiceError> {
    if header.status != from {
        return Err(ServiceError::InvalidStateTransition(format!(
            "Transfer {} is {}, expected {} to move to {}",
            header.id,
            header.status.as_str(),
            from.as_str(),
            to.as_str()
        )));
    }

    let rows = stock_transfer::Entity::update_many()
        .col_expr(stock_transfer::Column::Status, Expr::value(to))
        .filter(stock_transfer::Column::Id.eq(header.id))
        .filter(stock_transfer::Column::Status.eq(from))
        .exec(txn)
        .await?
        .rows_affected;

    if rows == 0 {
        return Err(ServiceError::ConcurrencyConflict(format!(
            "Transfer {} left state {} concurrently",
            header.id,
            from.as_str()
        )));
    }

    Ok(())
}

/// Movements against the origin branch, one per line. `Sale` debits for the
/// confirm path; `Purchase` credits for the confirmed-cancel reversal.
async fn line_movements<C: ConnectionTrait>(
    conn: &C,
    header: &stock_transfer::Model,
    kind: StockEventKind,
) -> Result<Vec<NormalizedMovement>, ServiceError> {
    movements_for(conn, header, header.origin_branch_id, kind).await
}

async fn destination_movements<C: ConnectionTrait>(
    conn: &C,
    header: &stock_transfer::Model,
    kind: StockEventKind,
) -> Result<Vec<NormalizedMovement>, ServiceError> {
    movements_for(conn, header, header.destination_branch_id, kind).await
}

async fn movements_for<C: ConnectionTrait>(
    conn: &C,
    header: &stock_transfer::Model,
    branch_id: Uuid,
    kind: StockEventKind,
) -> Result<Vec<NormalizedMovement>, ServiceError> {
    let lines = stock_transfer_line::Entity::find()
        .filter(stock_transfer_line::Column::TransferId.eq(header.id))
        .all(conn)
        .await?;

    if lines.is_empty() {
        return Err(ServiceError::Internal(format!(
            "Transfer {} has no lines",
            header.id
        )));
    }

    Ok(lines
        .into_iter()
        .map(|line| NormalizedMovement {
            item: ItemRef::new(line.item_type, line.item_id),
            kind,
            quantity: line.quantity,
            branch_id: Some(branch_id),
            reference_id: Some(header.id),
            metadata: None,
        })
        .collect())
}
