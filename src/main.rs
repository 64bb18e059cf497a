use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::io;
use std::sync::Arc;

use social_api::api::{self, AppState};
use social_api::config::Config;
use social_api::store::Store;

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // Initialize store
    let store = Arc::new(Store::new(&config.database_path).map_err(|e| {
        log::error!("Failed to initialize database {}: {}", config.database_path, e);
        io::Error::other(e)
    })?);

    match store.count_users() {
        Ok(count) => log::info!("Database: {} ({} users)", config.database_path, count),
        Err(e) => log::warn!("Database: {} (could not count users: {})", config.database_path, e),
    }

    let state = web::Data::new(AppState {
        store: store.clone(),
    });

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(api::configure_routes)
    })
    .workers(config.workers);

    log::info!("Starting social-api server on {}:{}", config.host, config.port);

    server.bind((config.host.as_str(), config.port))?.run().await
}
