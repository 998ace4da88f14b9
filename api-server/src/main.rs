mod auth;
mod config;
mod handlers;
mod response;
mod session;
mod store;

use std::{path::PathBuf, sync::Arc};

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use config::{read_env_optional_path, read_env_string, AppState, DEFAULT_BIND_ADDR, DEFAULT_STORE_PATH};
use store::SqliteStore;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let bind_addr = read_env_string("API_BIND_ADDR", DEFAULT_BIND_ADDR);
    let store_path = PathBuf::from(read_env_string("STORE_PATH", DEFAULT_STORE_PATH));
    let map_dir = read_env_optional_path("MAP_DATA_DIR");

    let store = SqliteStore::open(&store_path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    tracing::info!(
        "starting helicarrier api: bind_addr={} store={} map_dir={}",
        bind_addr,
        store_path.display(),
        map_dir
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<random placement>".to_string()),
    );

    let state = AppState::new(Arc::new(store), map_dir);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
