use std::{sync::Arc, time::Duration};

use tokio::{signal, sync::mpsc, time};
use tracing::{error, info, warn};

use branchstock_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let db_arc = Arc::new(db_pool);
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = Arc::new(api::events::EventSender::new(event_tx));
    tokio::spawn(api::events::process_events(event_rx));

    let state = api::AppState::new(db_arc, cfg.clone(), event_sender);

    info!(
        interval_secs = cfg.drain_interval_secs,
        batch_size = cfg.drain_batch_size,
        "stock event drain worker started"
    );

    let mut ticker = time::interval(Duration::from_secs(cfg.drain_interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match state.queue.drain_batch(cfg.drain_batch_size).await {
                    Ok(0) => {}
                    Ok(processed) => info!(processed, "drained stock events"),
                    Err(e) => warn!("drain pass failed: {}", e),
                }
            }
            _ = signal::ctrl_c() => {
                info!("shutdown signal received; stopping drain worker");
                break;
            }
        }
    }

    Ok(())
}
