use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use bakehouse_core::domain::customer::Customer;
use bakehouse_core::domain::order::OrderId;
use bakehouse_db::{ClientDirectory, OrderIntake, RecordedOrder};
use serde::Serialize;

use crate::api::{parse_id, ApiError};

#[derive(Clone)]
pub struct OrdersState {
    directory: ClientDirectory,
}

#[derive(Debug, Serialize)]
pub struct RemovedOrder {
    pub order_id: OrderId,
    pub client: Customer,
}

pub fn router(directory: ClientDirectory) -> Router {
    Router::new()
        .route("/api/v1/orders", post(record_order))
        .route("/api/v1/orders/{id}", delete(remove_order))
        .with_state(OrdersState { directory })
}

async fn record_order(
    State(state): State<OrdersState>,
    payload: Result<Json<OrderIntake>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordedOrder>), ApiError> {
    let Json(intake) = payload?;
    let recorded = state.directory.record_order(&intake).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

async fn remove_order(
    State(state): State<OrdersState>,
    Path(id): Path<String>,
) -> Result<Json<RemovedOrder>, ApiError> {
    let order_id = OrderId(parse_id(&id, "order")?);
    let client = state.directory.remove_order(&order_id).await?;
    Ok(Json(RemovedOrder { order_id, client }))
}
