mod auth;
mod bookings;
mod config;
mod db;
mod error;
mod mailer;
mod models;
mod routes;
mod slots;
mod state;
mod users;

use actix_web::{middleware, web, App, HttpServer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use crate::{auth::JwtConfig, config::Config, mailer::Mailer, state::AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = run().await {
        eprintln!("Startup error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();
    db::ensure_sqlite_dir(&config.database_url)?;

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;

    db::run_migrations(&pool).await?;
    db::seed_admin(&pool, &config).await?;

    if config.smtp.host.is_none() {
        log::warn!("SMTP_HOST not set. Booking notifications are disabled.");
    }

    let state = AppState {
        db: pool.clone(),
        jwt: JwtConfig {
            secret: config.jwt_secret.clone(),
        },
        mailer: Mailer::new(config.smtp.clone(), config.brand.clone()),
        brand: config.brand.clone(),
    };

    let address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting slotbook on http://{address}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(routes::public::configure)
            .configure(routes::admin::configure)
    })
    .bind(address)?
    .run()
    .await?;

    Ok(())
}
