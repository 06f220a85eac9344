use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("Invalid order request: {0}")]
    Validation(String),

    // unknown counts as not in stock
    #[error("Products not in stock: {product_codes:?}")]
    OutOfStock { product_codes: Vec<String> },

    #[error("Inventory service unavailable: {0}")]
    InventoryUnavailable(#[from] InventoryClientError),

    #[error("Failed to persist order: {0}")]
    Store(#[from] StoreError),

    // partial success, the order exists but the event did not go out
    #[error("Order {order_id} was persisted but the event publish failed: {reason}")]
    Publish {
        order_id: String,
        #[source]
        reason: PublishError,
    },
}

impl PlacementError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlacementError::Validation(_) => StatusCode::BAD_REQUEST,
            PlacementError::OutOfStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PlacementError::InventoryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PlacementError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PlacementError::Publish { .. } => StatusCode::ACCEPTED,
        }
    }
}

#[derive(Debug, Error)]
pub enum InventoryClientError {
    #[error("Inventory request timed out")]
    Timeout,

    #[error("Failed to reach inventory service: {0}")]
    Transport(String),

    #[error("Inventory service returned status {0}")]
    Status(u16),

    #[error("Failed to decode inventory response: {0}")]
    Decode(String),
}

impl InventoryClientError {
    // only network-level failures are worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            InventoryClientError::Timeout => true,
            InventoryClientError::Transport(_) => true,
            InventoryClientError::Status(code) => *code >= 500,
            InventoryClientError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for InventoryClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InventoryClientError::Timeout
        } else if e.is_decode() {
            InventoryClientError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            InventoryClientError::Status(status.as_u16())
        } else {
            InventoryClientError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to run order transaction: {0}")]
    Transaction(String),

    #[error("Failed to write order: {0}")]
    Database(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to open broker channel: {0}")]
    Channel(String),

    #[error("Failed to serialize event: {0}")]
    Serialize(String),

    #[error("Failed to publish event to broker: {0}")]
    Publish(String),
}
