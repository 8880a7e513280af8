mod api;
mod config;
mod face;
mod purchase;
mod records;

use anyhow::Result;
use config::CONFIG;
use dotenv::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use purchase::PurchaseDesk;
use records::{RecordStore, RecordsClient};
use std::sync::Arc;

#[macro_use]
extern crate log;

#[tokio::main]
async fn main() -> Result<()> {
    // read .env
    dotenv().ok();

    // init logger
    let log_level = std::env::var("RUST_LOG").unwrap_or_default();

    if log_level == "debug" {
        Builder::new()
            .filter(None, LevelFilter::Off)
            .filter(Some("clinic_desk::face"), LevelFilter::Debug)
            .filter(Some("clinic_desk"), LevelFilter::Debug)
            .init();
    } else if log_level == "info" {
        Builder::new()
            .filter(None, LevelFilter::Off)
            .filter(Some("clinic_desk::face"), LevelFilter::Info)
            .filter(Some("clinic_desk"), LevelFilter::Info)
            .init();
    } else {
        env_logger::init();
    }

    let records: Arc<dyn RecordStore> = Arc::new(RecordsClient::new(
        &CONFIG.records_url,
        CONFIG.records_key.as_deref().unwrap_or_default(),
        &CONFIG.records_version,
    )?);
    for (name, id) in [
        ("customer", &CONFIG.customer_db_id),
        ("consultation", &CONFIG.consultation_db_id),
        ("income", &CONFIG.income_db_id),
    ] {
        match id {
            Some(id) => info!("{} database: {}", name, id),
            None => warn!("{} database id not set, its routes will fail", name),
        }
    }

    let desk = PurchaseDesk::open(&CONFIG.desk()).await?;
    let state = Arc::new(api::State::new(&CONFIG, records, desk));

    info!(
        "face match threshold: {}, server running at port: {}",
        CONFIG.match_threshold, CONFIG.port
    );
    warp::serve(api::routes(state))
        .run(([0, 0, 0, 0], CONFIG.port))
        .await;

    Ok(())
}
