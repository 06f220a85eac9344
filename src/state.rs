use std::sync::Arc;

use crate::cqrs::{GetOrderQueryHandler, PlaceOrderCommandHandler};
use crate::events::MessageBroker;
use crate::inventory::InventoryClient;
use crate::metrics::WorkflowInstrumentation;
use crate::repositories::OrderRepository;

pub struct AppState<T1: InventoryClient, T2: OrderRepository, T3: MessageBroker, T4: WorkflowInstrumentation> {
    pub place_order_command_handler: Arc<PlaceOrderCommandHandler<T1, T2, T3, T4>>,
    pub get_order_query_handler: Arc<GetOrderQueryHandler<T2>>,
}
