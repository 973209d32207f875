//! Durable stock event queue and its batch processor.
//!
//! `enqueue` inserts pending events (`processed_at IS NULL`); `drain_batch`
//! claims a slice of the backlog with a lease-based non-blocking claim and
//! applies each event in its own transaction: guarded balance update, ledger
//! append and processed marker commit as one unit. Concurrent drainers
//! partition the backlog without processing any event twice.

use crate::db::DbPool;
use crate::entities::stock_event;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::movement::{self, NormalizedMovement, StockEventDraft};
use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// How long a claim shields an event from other drainers before it is
/// considered abandoned. Crash-safety: a drainer that dies mid-batch loses
/// its claims after this lease and the events become visible again.
pub const DEFAULT_CLAIM_LEASE: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct StockQueueService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    claim_lease: Duration,
}

impl StockQueueService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db,
            event_sender,
            claim_lease: DEFAULT_CLAIM_LEASE,
        }
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    /// Validates and inserts a batch of pending events. Empty input is a
    /// no-op returning 0. Returns the number of events inserted.
    #[instrument(skip(self, drafts), fields(count = drafts.len()))]
    pub async fn enqueue(
        &self,
        tenant_id: Uuid,
        drafts: &[StockEventDraft],
    ) -> Result<u64, ServiceError> {
        if drafts.is_empty() {
            return Ok(0);
        }

        let movements = movement::normalize_drafts(drafts)?;
        let count = movements.len() as u64;

        let db = self.db.as_ref();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                for m in movements {
                    let event = stock_event::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        tenant_id: Set(tenant_id),
                        branch_id: Set(m.branch_id),
                        item_type: Set(m.item.item_type()),
                        item_id: Set(m.item.item_id()),
                        kind: Set(m.kind),
                        quantity: Set(m.quantity),
                        reference_id: Set(m.reference_id),
                        metadata: Set(m.metadata),
                        claimed_by: Set(None),
                        claimed_at: Set(None),
                        created_at: Set(Utc::now()),
                        processed_at: Set(None),
                    };
                    event.insert(txn).await?;
                }
                Ok(())
            })
        })
        .await
        .map_err(ServiceError::from)?;

        self.event_sender
            .notify(Event::StockEventsEnqueued { tenant_id, count })
            .await;

        Ok(count)
    }

    /// Claims up to `max_items` pending events and applies them. Each event
    /// commits (ledger row, balance update, processed marker) atomically;
    /// failures are isolated per event and release the claim. Returns the
    /// number of events processed.
    #[instrument(skip(self))]
    pub async fn drain_batch(&self, max_items: u64) -> Result<u64, ServiceError> {
        if max_items == 0 {
            return Ok(0);
        }

        let worker = Uuid::new_v4();
        let claimed = self.claim(worker, max_items).await?;
        if claimed.is_empty() {
            return Ok(0);
        }
        debug!(worker = %worker, claimed = claimed.len(), "claimed pending stock events");

        let mut processed = 0u64;
        for event in claimed {
            let event_id = event.id;
            match self.process_one(event).await {
                Ok(()) => processed += 1,
                Err(err) => {
                    warn!(event_id = %event_id, error = %err, "stock event failed; releasing claim");
                    if let Err(release_err) = self.release_claim(event_id).await {
                        warn!(event_id = %event_id, error = %release_err, "failed to release claim");
                    }
                }
            }
        }

        if processed > 0 {
            self.event_sender
                .notify(Event::StockBatchDrained { processed })
                .await;
        }

        Ok(processed)
    }

    /// Lease-based claim: stamp up to `max_items` oldest pending, unclaimed
    /// (or lease-expired) events with this worker's token, then read back
    /// only the rows the stamp actually won. Overlapping claimers can select
    /// the same candidates but the conditional update partitions them.
    async fn claim(
        &self,
        worker: Uuid,
        max_items: u64,
    ) -> Result<Vec<stock_event::Model>, ServiceError> {
        let db = self.db.as_ref();
        let lease_cutoff = Utc::now()
            - ChronoDuration::from_std(self.claim_lease)
                .map_err(|e| ServiceError::Internal(format!("invalid claim lease: {}", e)))?;

        let claimable = stock_event::Column::ClaimedBy
            .is_null()
            .or(stock_event::Column::ClaimedAt.lt(lease_cutoff));

        let candidates: Vec<Uuid> = stock_event::Entity::find()
            .select_only()
            .column(stock_event::Column::Id)
            .filter(stock_event::Column::ProcessedAt.is_null())
            .filter(claimable.clone())
            .order_by_asc(stock_event::Column::CreatedAt)
            .limit(max_items)
            .into_tuple()
            .all(db)
            .await?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        stock_event::Entity::update_many()
            .col_expr(stock_event::Column::ClaimedBy, Expr::value(worker))
            .col_expr(stock_event::Column::ClaimedAt, Expr::value(Utc::now()))
            .filter(stock_event::Column::Id.is_in(candidates))
            .filter(stock_event::Column::ProcessedAt.is_null())
            .filter(claimable)
            .exec(db)
            .await?;

        stock_event::Entity::find()
            .filter(stock_event::Column::ClaimedBy.eq(worker))
            .filter(stock_event::Column::ProcessedAt.is_null())
            .order_by_asc(stock_event::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::Database)
    }

    /// Applies one claimed event. All three effects commit atomically; a
    /// `processed_at IS NULL` guard on the marker makes application
    /// at-most-once even if a lease expired and another drainer raced us.
    async fn process_one(&self, event: stock_event::Model) -> Result<(), ServiceError> {
        let db = self.db.as_ref();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move { apply_event(txn, &event).await })
        })
        .await
        .map_err(ServiceError::from)
    }

    async fn release_claim(&self, event_id: Uuid) -> Result<(), ServiceError> {
        stock_event::Entity::update_many()
            .col_expr(stock_event::Column::ClaimedBy, Expr::value(Option::<Uuid>::None))
            .col_expr(
                stock_event::Column::ClaimedAt,
                Expr::value(Option::<chrono::DateTime<Utc>>::None),
            )
            .filter(stock_event::Column::Id.eq(event_id))
            .filter(stock_event::Column::ProcessedAt.is_null())
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}

async fn apply_event(
    txn: &DatabaseTransaction,
    event: &stock_event::Model,
) -> Result<(), ServiceError> {
    let branch_id = movement::resolve_branch(txn, event.tenant_id, event.branch_id).await?;

    let normalized = NormalizedMovement {
        item: crate::entities::ItemRef::new(event.item_type, event.item_id),
        kind: event.kind,
        quantity: event.quantity,
        branch_id: Some(branch_id),
        reference_id: event.reference_id,
        metadata: event.metadata.clone(),
    };

    // Queue events never seed missing rows; seeding is the applier's job.
    movement::apply_movement(txn, event.tenant_id, branch_id, &normalized, "queue", false).await?;

    let stamped = stock_event::Entity::update_many()
        .col_expr(stock_event::Column::ProcessedAt, Expr::value(Utc::now()))
        .filter(stock_event::Column::Id.eq(event.id))
        .filter(stock_event::Column::ProcessedAt.is_null())
        .exec(txn)
        .await?
        .rows_affected;

    if stamped == 0 {
        // Another drainer finished this event after our lease view; roll
        // everything back so nothing is applied twice.
        return Err(ServiceError::ConcurrencyConflict(format!(
            "Stock event {} already processed",
            event.id
        )));
    }

    Ok(())
}
