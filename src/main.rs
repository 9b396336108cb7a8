mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod routes;
mod utils;

use std::io;

use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use log::info;

use crate::config::Settings;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let settings =
        Settings::from_env().map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

    // Initialize the database pool
    let pool = db::create_pool(&settings)
        .await
        .map_err(|err| io::Error::new(io::ErrorKind::ConnectionRefused, err))?;

    if settings.run_migrations {
        db::run_migrations(&pool)
            .await
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    }

    info!("Starting server at {}", settings.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .configure(routes::configure)
    })
    .bind(&settings.bind_address)?
    .run()
    .await
}
