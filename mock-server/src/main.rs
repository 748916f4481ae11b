use std::sync::Arc;

use mock_server::{MockState, DEFAULT_PASSWORD, DEFAULT_USERNAME};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let username = std::env::var("WALLBOX_MOCK_USERNAME").unwrap_or_else(|_| DEFAULT_USERNAME.to_string());
    let password = std::env::var("WALLBOX_MOCK_PASSWORD").unwrap_or_else(|_| DEFAULT_PASSWORD.to_string());

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    log::info!("listening on {addr} (user {username})");
    mock_server::run(listener, Arc::new(MockState::new(&username, &password))).await
}
