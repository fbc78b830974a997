use std::{net::SocketAddr, sync::Arc};

use backend::database::Database;
use backend::providers::KakaoDirections;
use backend::{create_router, AppState, StraightLineProvider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::new().await.expect("connect to database");
    db.migrate().await.expect("run migrations");
    let store = Arc::new(db);

    let addr: SocketAddr = "0.0.0.0:8080".parse().expect("valid socket address");

    match KakaoDirections::from_env() {
        Ok(provider) => {
            tracing::info!("using Kakao directions provider");
            let state = AppState {
                provider: Arc::new(provider),
                store,
                defaults: Default::default(),
            };
            serve(addr, create_router(state)).await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "no directions provider configured, falling back to straight-line routes");
            let state = AppState {
                provider: Arc::new(StraightLineProvider),
                store,
                defaults: Default::default(),
            };
            serve(addr, create_router(state)).await;
        }
    }
}

async fn serve(addr: SocketAddr, app: axum::Router) {
    tracing::info!("starting backend on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}
