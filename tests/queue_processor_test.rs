mod common;

use assert_matches::assert_matches;
use branchstock_api::entities::stock_event;
use branchstock_api::errors::ServiceError;
use branchstock_api::services::StockEventDraft;
use common::*;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

async fn pending_events(ctx: &TestCtx) -> Vec<stock_event::Model> {
    stock_event::Entity::find()
        .filter(stock_event::Column::ProcessedAt.is_null())
        .all(ctx.db.as_ref())
        .await
        .expect("query stock events")
}

#[tokio::test]
async fn sale_event_drains_into_branch_balance_and_ledger() {
    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Espresso beans").await;
    seed_stock(&ctx, tenant, branch, item, dec!(10), None).await;

    let queue = ctx.queue();
    let enqueued = queue
        .enqueue(
            tenant,
            &[StockEventDraft::new(item, "venta", dec!(3)).at_branch(branch)],
        )
        .await
        .unwrap();
    assert_eq!(enqueued, 1);

    // Nothing moves until a drain pass runs.
    assert_eq!(branch_qty(&ctx, tenant, branch, item).await, Some(dec!(10)));

    let processed = queue.drain_batch(50).await.unwrap();
    assert_eq!(processed, 1);
    assert_eq!(branch_qty(&ctx, tenant, branch, item).await, Some(dec!(7)));

    let ledger = ledger_rows(&ctx, tenant, branch, item).await;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].delta, dec!(-3));
    assert_eq!(ledger[0].quantity, dec!(3));
    assert_eq!(ledger[0].context, "queue");
    assert!(pending_events(&ctx).await.is_empty());
}

#[tokio::test]
async fn drain_is_exactly_once() {
    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Filters").await;
    seed_stock(&ctx, tenant, branch, item, dec!(5), None).await;

    let queue = ctx.queue();
    queue
        .enqueue(
            tenant,
            &[StockEventDraft::new(item, "sale", dec!(2)).at_branch(branch)],
        )
        .await
        .unwrap();

    assert_eq!(queue.drain_batch(50).await.unwrap(), 1);
    assert_eq!(queue.drain_batch(50).await.unwrap(), 0);
    assert_eq!(queue.drain_batch(50).await.unwrap(), 0);

    assert_eq!(branch_qty(&ctx, tenant, branch, item).await, Some(dec!(3)));
    assert_eq!(ledger_rows(&ctx, tenant, branch, item).await.len(), 1);
}

#[tokio::test]
async fn empty_queue_and_empty_batch_are_noops() {
    let ctx = TestCtx::new().await;
    let (tenant, _branch) = seed_tenant(&ctx).await;

    let queue = ctx.queue();
    assert_eq!(queue.enqueue(tenant, &[]).await.unwrap(), 0);
    assert_eq!(queue.drain_batch(50).await.unwrap(), 0);
    assert_eq!(queue.drain_batch(0).await.unwrap(), 0);
}

#[tokio::test]
async fn oversell_leaves_event_pending_and_balance_untouched() {
    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Mugs").await;
    seed_stock(&ctx, tenant, branch, item, dec!(4), None).await;

    let queue = ctx.queue();
    queue
        .enqueue(
            tenant,
            &[StockEventDraft::new(item, "sale", dec!(9)).at_branch(branch)],
        )
        .await
        .unwrap();

    assert_eq!(queue.drain_batch(50).await.unwrap(), 0);

    assert_eq!(branch_qty(&ctx, tenant, branch, item).await, Some(dec!(4)));
    assert!(ledger_rows(&ctx, tenant, branch, item).await.is_empty());

    // Claim was released so a later pass can retry once stock arrives.
    let pending = pending_events(&ctx).await;
    assert_eq!(pending.len(), 1);
    assert!(pending[0].claimed_by.is_none());
}

#[tokio::test]
async fn failing_event_does_not_block_the_rest_of_the_batch() {
    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let tracked = insert_product(&ctx, tenant, "Tracked").await;
    let untracked = insert_product(&ctx, tenant, "Untracked").await;
    seed_stock(&ctx, tenant, branch, tracked, dec!(10), None).await;

    let queue = ctx.queue();
    queue
        .enqueue(
            tenant,
            &[
                // No branch inventory row; the queue never seeds one.
                StockEventDraft::new(untracked, "sale", dec!(1)).at_branch(branch),
                StockEventDraft::new(tracked, "sale", dec!(4)).at_branch(branch),
            ],
        )
        .await
        .unwrap();

    assert_eq!(queue.drain_batch(50).await.unwrap(), 1);

    assert_eq!(
        branch_qty(&ctx, tenant, branch, tracked).await,
        Some(dec!(6))
    );
    assert_eq!(branch_qty(&ctx, tenant, branch, untracked).await, None);
    assert_eq!(pending_events(&ctx).await.len(), 1);
}

#[tokio::test]
async fn missing_branch_falls_back_to_tenant_default() {
    let ctx = TestCtx::new().await;
    let (tenant, default_branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Beans").await;
    seed_stock(&ctx, tenant, default_branch, item, dec!(8), None).await;

    let queue = ctx.queue();
    queue
        .enqueue(tenant, &[StockEventDraft::new(item, "compra", dec!(2))])
        .await
        .unwrap();
    assert_eq!(queue.drain_batch(50).await.unwrap(), 1);

    assert_eq!(
        branch_qty(&ctx, tenant, default_branch, item).await,
        Some(dec!(10))
    );
}

#[tokio::test]
async fn inactive_branch_rejects_the_event() {
    let ctx = TestCtx::new().await;
    let (tenant, _branch) = seed_tenant(&ctx).await;
    let closed = insert_branch(&ctx, tenant, "Closed", false).await;
    let item = insert_product(&ctx, tenant, "Beans").await;

    let queue = ctx.queue();
    queue
        .enqueue(
            tenant,
            &[StockEventDraft::new(item, "purchase", dec!(2)).at_branch(closed)],
        )
        .await
        .unwrap();

    assert_eq!(queue.drain_batch(50).await.unwrap(), 0);
    assert_eq!(pending_events(&ctx).await.len(), 1);
}

#[tokio::test]
async fn enqueue_rejects_unknown_kind_and_negative_quantity() {
    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Beans").await;

    let queue = ctx.queue();
    assert_matches!(
        queue
            .enqueue(
                tenant,
                &[StockEventDraft::new(item, "refund", dec!(1)).at_branch(branch)]
            )
            .await,
        Err(ServiceError::Validation(_))
    );
    assert_matches!(
        queue
            .enqueue(
                tenant,
                &[StockEventDraft::new(item, "sale", dec!(-1)).at_branch(branch)]
            )
            .await,
        Err(ServiceError::Validation(_))
    );
    assert!(pending_events(&ctx).await.is_empty());
}

#[tokio::test]
async fn concurrent_drainers_apply_each_event_exactly_once() {
    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Beans").await;
    seed_stock(&ctx, tenant, branch, item, dec!(200), None).await;

    let drafts: Vec<_> = (0..80)
        .map(|_| StockEventDraft::new(item, "sale", dec!(1)).at_branch(branch))
        .collect();
    ctx.queue().enqueue(tenant, &drafts).await.unwrap();

    // Two drainers with distinct worker tokens race over the same backlog;
    // their candidate selects overlap but the conditional claim stamp
    // partitions the events between them.
    let first_drainer = ctx.queue();
    let second_drainer = ctx.queue();
    let (first, second) = tokio::join!(
        first_drainer.drain_batch(50),
        second_drainer.drain_batch(50)
    );
    let drained = first.unwrap() + second.unwrap();

    // No event was applied twice, whatever the interleaving: one ledger row
    // per processed event, and the balance reflects exactly that count.
    assert!(drained <= 80);
    assert_eq!(
        ledger_rows(&ctx, tenant, branch, item).await.len() as u64,
        drained
    );
    assert_eq!(
        branch_qty(&ctx, tenant, branch, item).await,
        Some(dec!(200) - rust_decimal::Decimal::from(drained))
    );

    // When both racers selected the same candidates, the loser walks away
    // empty-handed; a catch-up pass finishes the remainder.
    let rest = ctx.queue().drain_batch(80).await.unwrap();
    assert_eq!(drained + rest, 80);
    assert_eq!(
        branch_qty(&ctx, tenant, branch, item).await,
        Some(dec!(120))
    );
    assert_eq!(ledger_rows(&ctx, tenant, branch, item).await.len(), 80);
    assert!(pending_events(&ctx).await.is_empty());
}

#[tokio::test]
async fn expired_claims_become_visible_to_other_drainers() {
    use chrono::{Duration as ChronoDuration, Utc};
    use sea_orm::sea_query::Expr;

    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Beans").await;
    seed_stock(&ctx, tenant, branch, item, dec!(10), None).await;

    let queue = ctx.queue();
    queue
        .enqueue(
            tenant,
            &[StockEventDraft::new(item, "sale", dec!(2)).at_branch(branch)],
        )
        .await
        .unwrap();

    // Simulate a drainer that claimed the event and then died.
    stock_event::Entity::update_many()
        .col_expr(
            stock_event::Column::ClaimedBy,
            Expr::value(uuid::Uuid::new_v4()),
        )
        .col_expr(
            stock_event::Column::ClaimedAt,
            Expr::value(Utc::now() - ChronoDuration::seconds(120)),
        )
        .exec(ctx.db.as_ref())
        .await
        .unwrap();

    // A fresh claim would normally be shielded, but this one's lease (60s by
    // default) has expired, so the event is drained.
    assert_eq!(queue.drain_batch(50).await.unwrap(), 1);
    assert_eq!(branch_qty(&ctx, tenant, branch, item).await, Some(dec!(8)));
}

#[tokio::test]
async fn live_claims_shield_events_from_other_drainers() {
    use chrono::Utc;
    use sea_orm::sea_query::Expr;

    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Beans").await;
    seed_stock(&ctx, tenant, branch, item, dec!(10), None).await;

    let queue = ctx.queue();
    queue
        .enqueue(
            tenant,
            &[StockEventDraft::new(item, "sale", dec!(2)).at_branch(branch)],
        )
        .await
        .unwrap();

    // Another drainer holds a fresh claim on the event.
    stock_event::Entity::update_many()
        .col_expr(
            stock_event::Column::ClaimedBy,
            Expr::value(uuid::Uuid::new_v4()),
        )
        .col_expr(stock_event::Column::ClaimedAt, Expr::value(Utc::now()))
        .exec(ctx.db.as_ref())
        .await
        .unwrap();

    assert_eq!(queue.drain_batch(50).await.unwrap(), 0);
    assert_eq!(branch_qty(&ctx, tenant, branch, item).await, Some(dec!(10)));
}

#[tokio::test]
async fn mixed_batch_conserves_ledger_sum() {
    let ctx = TestCtx::new().await;
    let (tenant, branch) = seed_tenant(&ctx).await;
    let item = insert_product(&ctx, tenant, "Beans").await;
    seed_stock(&ctx, tenant, branch, item, dec!(20), None).await;

    let queue = ctx.queue();
    queue
        .enqueue(
            tenant,
            &[
                StockEventDraft::new(item, "venta", dec!(5)).at_branch(branch),
                StockEventDraft::new(item, "compra", dec!(3)).at_branch(branch),
                StockEventDraft::new(item, "ajuste", dec!(1)).at_branch(branch),
            ],
        )
        .await
        .unwrap();
    assert_eq!(queue.drain_batch(50).await.unwrap(), 3);

    assert_eq!(branch_qty(&ctx, tenant, branch, item).await, Some(dec!(19)));
    // Seeded 20 plus the summed deltas lands on the same figure.
    assert_eq!(ledger_sum(&ctx, tenant, branch, item).await, dec!(-1));
}
