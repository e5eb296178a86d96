use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::info;

use crate::cache::LinksCache;
use crate::db::repo::Repo;
use crate::detector::UpdateDetector;
use crate::error::AppResult;

use super::routes;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repo>,
    pub detector: Arc<UpdateDetector>,
    pub cache: LinksCache,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/tg-chat/{id}",
            post(routes::register_chat).delete(routes::delete_chat),
        )
        .route(
            "/links",
            get(routes::list_links)
                .post(routes::add_link)
                .delete(routes::remove_link),
        )
        .route("/updates", get(routes::updates))
        .route("/updates_by_tags", get(routes::updates_by_tags))
        .with_state(state)
}

pub async fn serve(state: AppState, host: &str, port: u16) -> AppResult<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
