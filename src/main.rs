use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use log::{info, warn};
use std::io;

use tasktrack::config::Config;
use tasktrack::routes::{self, health};
use tasktrack::store::{MemoryStore, PgStore};
use tasktrack::AppState;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    let state = match &config.database_url {
        Some(database_url) => {
            let store = PgStore::connect(database_url)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            store
                .migrate()
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
            AppState::new(store, &config.auth)
        }
        None => {
            warn!("DATABASE_URL is not set, using the in-memory store; data is lost on restart");
            AppState::new(MemoryStore::new(), &config.auth)
        }
    };
    let state = web::Data::new(state);

    info!("Starting server at {}", config.server_url());

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .service(health::health)
            .service(web::scope("/api").configure(routes::config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
