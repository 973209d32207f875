mod common;

use assert_matches::assert_matches;
use branchstock_api::entities::InventoryMode;
use branchstock_api::errors::ServiceError;
use branchstock_api::services::TenantConfigUpdate;
use common::*;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn per_branch_mode_shows_only_the_branch_figure() {
    let ctx = TestCtx::new().await;
    let (tenant, main) = seed_tenant(&ctx).await;
    let north = insert_branch(&ctx, tenant, "North", true).await;
    let item = insert_product(&ctx, tenant, "Beans").await;
    seed_stock(&ctx, tenant, main, item, dec!(10), None).await;
    seed_stock(&ctx, tenant, north, item, dec!(4), None).await;

    let aggregator = ctx.aggregator();
    let main_view = aggregator.get_visible_stock(tenant, main, item).await.unwrap();
    assert_eq!(main_view.mode, InventoryMode::PerBranch);
    assert_eq!(main_view.visible, dec!(10));
    assert_eq!(main_view.branch_quantity, Some(dec!(10)));

    let north_view = aggregator
        .get_visible_stock(tenant, north, item)
        .await
        .unwrap();
    assert_eq!(north_view.visible, dec!(4));

    // Unknown item reads as zero, not as an error.
    let ghost = insert_product(&ctx, tenant, "Ghost").await;
    let ghost_view = aggregator.get_visible_stock(tenant, main, ghost).await.unwrap();
    assert_eq!(ghost_view.visible, dec!(0));
    assert_eq!(ghost_view.branch_quantity, None);
}

#[tokio::test]
async fn centralized_mode_shows_the_business_total_after_resync() {
    let ctx = TestCtx::new().await;
    let (tenant, main) = seed_tenant(&ctx).await;
    let north = insert_branch(&ctx, tenant, "North", true).await;
    let item = insert_product(&ctx, tenant, "Beans").await;
    seed_stock(&ctx, tenant, main, item, dec!(10), None).await;
    seed_stock(&ctx, tenant, north, item, dec!(4), None).await;

    ctx.tenant_config()
        .update(
            tenant,
            TenantConfigUpdate {
                inventory_mode: Some(InventoryMode::Centralized),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let aggregator = ctx.aggregator();

    // Before any resync the aggregate row is missing; the branch figure is
    // the fallback answer.
    let before = aggregator.get_visible_stock(tenant, main, item).await.unwrap();
    assert_eq!(before.mode, InventoryMode::Centralized);
    assert_eq!(before.visible, dec!(10));
    assert_eq!(before.business_quantity, None);

    let written = aggregator.resync_business_aggregate(tenant, None).await.unwrap();
    assert_eq!(written, 1);

    // Both branches now see the same total.
    let main_view = aggregator.get_visible_stock(tenant, main, item).await.unwrap();
    assert_eq!(main_view.visible, dec!(14));
    assert_eq!(main_view.business_quantity, Some(dec!(14)));
    let north_view = aggregator
        .get_visible_stock(tenant, north, item)
        .await
        .unwrap();
    assert_eq!(north_view.visible, dec!(14));
}

#[tokio::test]
async fn resync_tracks_later_movements_and_scopes_to_one_item() {
    let ctx = TestCtx::new().await;
    let (tenant, main) = seed_tenant(&ctx).await;
    let beans = insert_product(&ctx, tenant, "Beans").await;
    let mugs = insert_product(&ctx, tenant, "Mugs").await;
    seed_stock(&ctx, tenant, main, beans, dec!(10), None).await;
    seed_stock(&ctx, tenant, main, mugs, dec!(5), None).await;

    let aggregator = ctx.aggregator();
    assert_eq!(
        aggregator.resync_business_aggregate(tenant, None).await.unwrap(),
        2
    );

    // Move beans, then resync only beans.
    use branchstock_api::services::StockEventDraft;
    ctx.applier()
        .apply_batch(
            tenant,
            &[StockEventDraft::new(beans, "sale", dec!(6)).at_branch(main)],
            "manual",
        )
        .await
        .unwrap();

    aggregator
        .resync_business_aggregate(tenant, Some(beans))
        .await
        .unwrap();

    let beans_view = aggregator.get_visible_stock(tenant, main, beans).await.unwrap();
    assert_eq!(beans_view.branch_quantity, Some(dec!(4)));
    let mugs_view = aggregator.get_visible_stock(tenant, main, mugs).await.unwrap();
    assert_eq!(mugs_view.business_quantity, Some(dec!(5)));
}

#[tokio::test]
async fn unconfigured_tenant_is_not_found() {
    let ctx = TestCtx::new().await;
    let item = insert_product(&ctx, Uuid::new_v4(), "Beans").await;
    assert_matches!(
        ctx.aggregator()
            .get_visible_stock(Uuid::new_v4(), Uuid::new_v4(), item)
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn low_stock_lists_only_rows_at_or_below_their_threshold() {
    let ctx = TestCtx::new().await;
    let (tenant, main) = seed_tenant(&ctx).await;
    let low = insert_product(&ctx, tenant, "Low").await;
    let fine = insert_product(&ctx, tenant, "Fine").await;
    let untracked = insert_product(&ctx, tenant, "Untracked").await;
    seed_stock(&ctx, tenant, main, low, dec!(2), Some(dec!(5))).await;
    seed_stock(&ctx, tenant, main, fine, dec!(9), Some(dec!(5))).await;
    seed_stock(&ctx, tenant, main, untracked, dec!(0), None).await;

    let rows = ctx.aggregator().low_stock(tenant, main).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item_id, low.item_id());
}
