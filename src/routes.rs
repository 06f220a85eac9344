use std::sync::Arc;
use axum::{extract::{Json, Path, State}, http::StatusCode, routing::{get, post}, Router};
use serde_json::{Value, json};

use crate::{cqrs::{CommandHandler, GetOrderQuery, PlaceOrderCommand, QueryHandler}, dtos::ApiError, errors::PlacementError, events::MessageBroker, inventory::InventoryClient, metrics::WorkflowInstrumentation, repositories::OrderRepository, state::AppState};

pub async fn index() -> &'static str {
    "Hello, World!"
}

pub async fn place_order<T1, T2, T3, T4>(state: State<Arc<AppState<T1, T2, T3, T4>>>, Json(place_order_command): Json<PlaceOrderCommand>) -> (StatusCode, Json<Value>)
where
    T1: InventoryClient + 'static,
    T2: OrderRepository + 'static,
    T3: MessageBroker + 'static,
    T4: WorkflowInstrumentation + 'static,
{
    match state.place_order_command_handler.handle(&place_order_command).await {
        Ok(response) => (StatusCode::CREATED, Json(json!(response))),
        Err(e) => {
            let body = match &e {
                // the order exists even though the event did not go out, so
                // the identifier still has to reach the caller
                PlacementError::Publish { order_id, reason } => json!({
                    "orderId": order_id,
                    "warning": format!("order accepted but event delivery is delayed: {}", reason)
                }),
                _ => json!(ApiError{error: e.to_string()})
            };
            (e.status_code(), Json(body))
        }
    }
}

pub async fn get_order<T1, T2, T3, T4>(Path(id): Path<String>, State(state): State<Arc<AppState<T1, T2, T3, T4>>>) -> (StatusCode, Json<Value>)
where
    T1: InventoryClient + 'static,
    T2: OrderRepository + 'static,
    T3: MessageBroker + 'static,
    T4: WorkflowInstrumentation + 'static,
{
    let input = GetOrderQuery {
        id: id.to_string()
    };

    match state.get_order_query_handler.handle(&input).await {
        Ok(Some(response)) => (StatusCode::OK, Json(json!(response))),
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!(ApiError{error: format!("Order with id {} did not exist", id)}))),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!(ApiError{error: e.to_string()})))
    }
}

pub fn build_router<T1, T2, T3, T4>(state: Arc<AppState<T1, T2, T3, T4>>) -> Router
where
    T1: InventoryClient + 'static,
    T2: OrderRepository + 'static,
    T3: MessageBroker + 'static,
    T4: WorkflowInstrumentation + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/orders", post(place_order::<T1, T2, T3, T4>))
        .route("/orders/{id}", get(get_order::<T1, T2, T3, T4>))
        .with_state(state)
}
