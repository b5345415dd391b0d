//! Client directory routes.
//!
//! - `GET    /api/v1/clients?q=&limit=`         : autocomplete search
//! - `GET    /api/v1/clients/all?page=&per_page=`: paged listing
//! - `POST   /api/v1/clients/resolve`           : find or create from contact info
//! - `GET    /api/v1/clients/{id}`              : client with order history
//! - `PATCH  /api/v1/clients/{id}`              : admin profile edit
//! - `DELETE /api/v1/clients/{id}`              : guarded delete
//! - `POST   /api/v1/clients/{id}/stats`        : recompute aggregates

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bakehouse_core::clients::{ClientSearchResult, SearchRequest};
use bakehouse_core::domain::contact::{ContactInfo, OrderChannel};
use bakehouse_core::domain::customer::{Customer, CustomerId, DeleteClientOutcome, ProfileUpdate};
use bakehouse_core::domain::order::Order;
use bakehouse_db::{ClientDirectory, ClientPage};
use serde::{Deserialize, Serialize};

use crate::api::{parse_id, ApiError};

const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Clone)]
pub struct ClientsState {
    directory: ClientDirectory,
}

#[derive(Debug, Deserialize)]
pub struct ResolveClientRequest {
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveClientResponse {
    pub client: Customer,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct ClientDetail {
    pub client: Customer,
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub fn router(directory: ClientDirectory) -> Router {
    Router::new()
        .route("/api/v1/clients", get(search_clients))
        .route("/api/v1/clients/all", get(list_clients))
        .route("/api/v1/clients/resolve", post(resolve_client))
        .route("/api/v1/clients/{id}", get(get_client).patch(update_client).delete(delete_client))
        .route("/api/v1/clients/{id}/stats", post(recompute_stats))
        .with_state(ClientsState { directory })
}

fn client_id(raw: &str) -> Result<CustomerId, ApiError> {
    parse_id(raw, "client").map(CustomerId)
}

async fn search_clients(
    State(state): State<ClientsState>,
    query: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<Vec<ClientSearchResult>>, ApiError> {
    let Query(request) = query?;
    let results = state.directory.search(&request.query, request.limit).await?;
    Ok(Json(results))
}

async fn list_clients(
    State(state): State<ClientsState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ClientPage>, ApiError> {
    let Query(page) = query?;
    let listing = state
        .directory
        .list(page.page.unwrap_or(1), page.per_page.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;
    Ok(Json(listing))
}

async fn resolve_client(
    State(state): State<ClientsState>,
    payload: Result<Json<ResolveClientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ResolveClientResponse>), ApiError> {
    let Json(request) = payload?;
    let channel = request.channel.as_deref().map(OrderChannel::parse);

    let resolved = state.directory.find_or_create(&request.contact, channel).await?;
    let status = if resolved.is_new { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ResolveClientResponse { client: resolved.customer, is_new: resolved.is_new })))
}

async fn get_client(
    State(state): State<ClientsState>,
    Path(id): Path<String>,
) -> Result<Json<ClientDetail>, ApiError> {
    let id = client_id(&id)?;
    let client = state
        .directory
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("client `{id}` not found")))?;
    let orders = state.directory.orders_for(&id).await?;
    Ok(Json(ClientDetail { client, orders }))
}

async fn update_client(
    State(state): State<ClientsState>,
    Path(id): Path<String>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<Customer>, ApiError> {
    let id = client_id(&id)?;
    let Json(update) = payload?;
    Ok(Json(state.directory.update_profile(&id, &update).await?))
}

async fn delete_client(
    State(state): State<ClientsState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<DeleteClientOutcome>), ApiError> {
    let id = client_id(&id)?;
    let outcome = state.directory.delete(&id).await?;
    let status =
        if outcome == DeleteClientOutcome::NotFound { StatusCode::NOT_FOUND } else { StatusCode::OK };
    Ok((status, Json(outcome)))
}

async fn recompute_stats(
    State(state): State<ClientsState>,
    Path(id): Path<String>,
) -> Result<Json<Customer>, ApiError> {
    let id = client_id(&id)?;
    Ok(Json(state.directory.update_stats(&id).await?))
}
