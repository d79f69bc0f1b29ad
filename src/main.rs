use std::path::Path;

mod api;
mod models;
mod parser;
mod stats;
mod storage;

const DEFAULT_DB_PATH: &str = "combat_sessions.db";
const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() {
    // DB path from the first CLI argument, port from the environment
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    // Storage is best-effort: run without it if the database won't open
    let db = match storage::Database::open(Path::new(&db_path)) {
        Ok(db) => Some(db),
        Err(e) => {
            eprintln!("Database unavailable ({}), sessions will not be stored", e);
            None
        }
    };

    let app = api::create_router(db);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind port {}: {}", port, e);
            return;
        }
    };

    println!("Combat log analyzer listening on http://localhost:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .ok();
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
}
