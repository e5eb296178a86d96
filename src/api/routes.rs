//! Request handlers.
//!
//! Chat identity for the /links family comes from the `Tg-Chat-Id`
//! header; a missing or malformed header is a validation error, not a
//! routing miss.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::api::schemas::{
    AddLinkRequest, LinkResponse, ListLinksResponse, ListLinksUpdate, RemoveLinkRequest,
};
use crate::db::types::Tags;
use crate::error::{AppError, AppResult};

use super::server::AppState;

const CHAT_ID_HEADER: &str = "tg-chat-id";

fn chat_id_from_headers(headers: &HeaderMap) -> AppResult<i64> {
    headers
        .get(CHAT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| AppError::Validation("Missing or malformed Tg-Chat-Id header".to_string()))
}

fn validate_link(url: &str) -> AppResult<()> {
    let supported = github_client::GithubTarget::parse(url).is_some()
        || stackoverflow_client::question_id_from_url(url).is_some();
    if supported {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Unsupported link: {}", url)))
    }
}

pub async fn register_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<StatusCode> {
    state.repo.add_chat(chat_id).await?;
    info!("Registered chat {}", chat_id);
    Ok(StatusCode::OK)
}

pub async fn delete_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> AppResult<StatusCode> {
    if !state.repo.delete_chat(chat_id).await? {
        return Err(AppError::ChatNotFound(chat_id));
    }
    state.cache.invalidate(chat_id).await;
    info!("Deleted chat {}", chat_id);
    Ok(StatusCode::OK)
}

pub async fn list_links(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ListLinksResponse>> {
    let chat_id = chat_id_from_headers(&headers)?;

    if let Some(cached) = state.cache.get(chat_id).await {
        return Ok(Json(cached));
    }

    let tracked = state.repo.list_subscriptions(chat_id).await?;
    let links: Vec<LinkResponse> = tracked
        .into_iter()
        .map(|t| LinkResponse {
            id: t.id,
            url: t.url,
            tags: t.tags.0,
            filters: t.filters.0,
        })
        .collect();
    let response = ListLinksResponse {
        size: links.len(),
        links,
    };

    state.cache.insert(chat_id, response.clone()).await;
    Ok(Json(response))
}

pub async fn add_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AddLinkRequest>,
) -> AppResult<Json<LinkResponse>> {
    let chat_id = chat_id_from_headers(&headers)?;
    validate_link(&request.link)?;

    let link_id = state
        .repo
        .add_subscription(
            chat_id,
            &request.link,
            Tags(request.tags.clone()),
            Tags(request.filters.clone()),
        )
        .await?;

    state.cache.invalidate(chat_id).await;
    info!("Chat {} now tracks {}", chat_id, request.link);

    Ok(Json(LinkResponse {
        id: link_id,
        url: request.link,
        tags: request.tags,
        filters: request.filters,
    }))
}

pub async fn remove_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(request): Query<RemoveLinkRequest>,
) -> AppResult<Json<LinkResponse>> {
    let chat_id = chat_id_from_headers(&headers)?;

    let removed = state
        .repo
        .remove_subscription(chat_id, &request.link)
        .await?
        .ok_or_else(|| AppError::LinkNotFound(request.link.clone()))?;

    state.cache.invalidate(chat_id).await;
    info!("Chat {} stopped tracking {}", chat_id, request.link);

    let (link_id, tags, filters) = removed;
    Ok(Json(LinkResponse {
        id: link_id,
        url: request.link,
        tags: tags.0,
        filters: filters.0,
    }))
}

pub async fn updates(State(state): State<AppState>) -> AppResult<Json<ListLinksUpdate>> {
    let links = state.detector.detect_all().await?;
    Ok(Json(ListLinksUpdate { links }))
}

#[derive(Debug, Deserialize)]
pub struct UpdatesByTagsParams {
    pub tg_chat_id: i64,
    /// Comma-separated tag list
    pub tags: String,
}

pub async fn updates_by_tags(
    State(state): State<AppState>,
    Query(params): Query<UpdatesByTagsParams>,
) -> AppResult<Json<ListLinksUpdate>> {
    let tags: Vec<String> = params
        .tags
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if tags.is_empty() {
        return Err(AppError::Validation("No tags given".to_string()));
    }

    let links = state
        .detector
        .detect_by_tags(params.tg_chat_id, &tags)
        .await?;
    Ok(Json(ListLinksUpdate { links }))
}
