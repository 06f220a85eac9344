// define modules in crate
mod cqrs;
mod domain;
mod dtos;
mod errors;
mod events;
mod inventory;
mod metrics;
mod repositories;
mod routes;
mod state;

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use cqrs::{GetOrderQueryHandler, PlaceOrderCommandHandler};
use dotenv::dotenv;
use events::{RabbitMqInitializationInfo, RabbitMqMessageBroker};
use inventory::{HttpInventoryClient, InventoryClientInitializationInfo, RetryPolicy};
use metrics::PrometheusWorkflowInstrumentation;
use mongodb::Client;
use repositories::{MongoDbInitializationInfo, MongoDbOrderRepository};
use routes::build_router;
use state::AppState;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[tokio::main]
async fn main() {
    dotenv().ok();

    // logging comes up before any collaborator so wiring failures are visible
    match env::var("LOG_PATH") {
        Ok(log_path) => tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .with_ansi(false)
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true)
            .with_writer(Arc::new(std::fs::File::create(log_path).unwrap()))
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .with_ansi(false)
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true)
            .init(),
    }

    let info = MongoDbInitializationInfo {
        uri: String::from(env::var("MONGODB_URI").unwrap()),
        database: String::from(env::var("MONGODB_DB").unwrap()),
        collection: String::from(env::var("MONGODB_COLLECTION").unwrap()),
    };

    let client: Client = Client::with_uri_str(&info.uri).await.unwrap();

    let client_session = Arc::new(Mutex::new(client.start_session().await.unwrap()));

    let order_repository = Arc::new(MongoDbOrderRepository::new(&info, &client, client_session));

    let message_broker = Arc::new(
        RabbitMqMessageBroker::new(RabbitMqInitializationInfo::new(
            String::from(env::var("RABBITMQ_URI").unwrap()),
            env::var("RABBITMQ_PORT").unwrap().parse().unwrap(),
            String::from(env::var("RABBITMQ_USER").unwrap()),
            String::from(env::var("RABBITMQ_PASS").unwrap()),
        ))
        .await
        .unwrap(),
    );

    let inventory_client = Arc::new(
        HttpInventoryClient::new(&InventoryClientInitializationInfo {
            base_url: String::from(env::var("INVENTORY_SERVICE_URL").unwrap()),
            request_timeout: Duration::from_millis(
                env::var("INVENTORY_REQUEST_TIMEOUT_MS")
                    .map(|raw| raw.parse().unwrap())
                    .unwrap_or(5000),
            ),
            retry_policy: RetryPolicy {
                max_retries: env::var("INVENTORY_MAX_RETRIES")
                    .map(|raw| raw.parse().unwrap())
                    .unwrap_or(2),
                ..RetryPolicy::default()
            },
        })
        .unwrap(),
    );

    let instrumentation = Arc::new(PrometheusWorkflowInstrumentation::new().unwrap());

    let place_order_command_handler = Arc::new(PlaceOrderCommandHandler::new(
        inventory_client,
        order_repository.clone(),
        message_broker,
        instrumentation.clone(),
        env::var("ORDER_PLACED_TOPIC").unwrap_or(String::from("order.placed")),
    ));
    let get_order_query_handler = Arc::new(GetOrderQueryHandler::new(order_repository));

    let state = Arc::new(AppState {
        place_order_command_handler: place_order_command_handler,
        get_order_query_handler: get_order_query_handler,
    });

    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();

    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", env::var("AXUM_PORT").unwrap()))
            .await
            .unwrap();

    let instrumentation_for_metrics_route = instrumentation.clone();
    axum::serve(
        listener,
        build_router(state)
            .route(
                "/metrics",
                get(move || async move {
                    format!(
                        "{}{}",
                        metrics_handle.render(),
                        instrumentation_for_metrics_route.render()
                    )
                }),
            )
            .layer(prometheus_layer)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            ),
    )
    .await
    .unwrap();
}
