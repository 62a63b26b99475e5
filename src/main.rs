use sqlx::postgres::PgPoolOptions;

mod ledger;
mod models;
mod repositories;
pub mod services;
pub mod settings;

#[tokio::main]
async fn main() {
    let config = settings::Settings::new().expect("Could not load config file.");
    log4rs::init_file("log4rs.yaml", Default::default()).expect("Could not initialize logging.");

    let conn = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.postgres.url)
        .await
        .expect("Could not connect to database.");

    sqlx::migrate!("./migrations")
        .run(&conn)
        .await
        .expect("Could not run database migrations.");

    println!("[*] Starting services.");
    services::start_services(conn, config)
        .await
        .expect("Could not start services.");
}
