use courtside::{config::create_app, state::DbPool};
use diesel::{
    SqliteConnection,
    r2d2::{ConnectionManager, Pool},
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let db_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "league.db".to_string());
    tracing::info!(db_url, "opening database");

    let pool: DbPool = Pool::builder()
        .max_size(if db_url == ":memory:" { 1 } else { 10 })
        .build(ConnectionManager::<SqliteConnection>::new(db_url))
        .unwrap();

    let app = create_app(pool);

    let addr = std::env::var("LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    tracing::info!(addr, "listening");

    axum::serve(listener, app).await.unwrap();
}
