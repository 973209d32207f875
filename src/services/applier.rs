//! Synchronous immediate-effect path for stock movements.
//!
//! Unlike the queue there is no pending bookkeeping: the caller owns
//! non-duplication. Used for manual corrections and, through
//! [`DirectBatchApplier::apply_in_txn`], by the transfer workflow for its
//! debits and credits.

use crate::db::DbPool;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::movement::{self, NormalizedMovement, StockEventDraft};
use sea_orm::{ConnectionTrait, TransactionTrait};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct DirectBatchApplier {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl DirectBatchApplier {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Validates and applies a batch immediately, all-or-nothing, tagging
    /// every ledger row with `context`. Positive movements seed missing
    /// branch rows; negative movements against a missing row or a would-be
    /// negative balance fail the whole batch. Returns the count applied.
    #[instrument(skip(self, drafts), fields(count = drafts.len()))]
    pub async fn apply_batch(
        &self,
        tenant_id: Uuid,
        drafts: &[StockEventDraft],
        context: &str,
    ) -> Result<u64, ServiceError> {
        if drafts.is_empty() {
            return Ok(0);
        }

        let movements = movement::normalize_drafts(drafts)?;
        let count = movements.len() as u64;
        let context_owned = context.to_string();

        let db = self.db.as_ref();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                apply_movements(txn, tenant_id, &movements, &context_owned).await
            })
        })
        .await
        .map_err(ServiceError::from)?;

        self.event_sender
            .notify(Event::StockBatchApplied {
                tenant_id,
                context: context.to_string(),
                count,
            })
            .await;

        Ok(count)
    }

    /// Applies pre-normalized movements inside the caller's transaction.
    /// The transfer workflow uses this so its validate-then-debit span and
    /// status flip commit as one unit.
    pub(crate) async fn apply_in_txn<C: ConnectionTrait>(
        conn: &C,
        tenant_id: Uuid,
        movements: &[NormalizedMovement],
        context: &str,
    ) -> Result<u64, ServiceError> {
        apply_movements(conn, tenant_id, movements, context).await?;
        Ok(movements.len() as u64)
    }
}

async fn apply_movements<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
    movements: &[NormalizedMovement],
    context: &str,
) -> Result<(), ServiceError> {
    for m in movements {
        let branch_id = movement::resolve_branch(conn, tenant_id, m.branch_id).await?;
        let create_missing = m.delta() >= rust_decimal::Decimal::ZERO;
        movement::apply_movement(conn, tenant_id, branch_id, m, context, create_missing).await?;
    }
    Ok(())
}
