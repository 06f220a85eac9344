use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::{domain::{Order, OrderLineItem}, dtos::{GetOrderResponse, OrderLineItemDto, OrderLineItemResponse, PlaceOrderResponse, Response}, errors::{PlacementError, StoreError}, events::{MessageBroker, OrderPlacedEvent}, inventory::{InventoryClient, InventoryStatus}, metrics::WorkflowInstrumentation, repositories::OrderRepository};

// traits
pub trait Command{}
pub trait Query{}

#[async_trait]
pub trait CommandHandler<C: Command + Sync, R: Response>{
    async fn handle(&self, input: &C) -> Result<R, PlacementError>;
}

#[async_trait]
pub trait QueryHandler<Q: Query + Sync, R: Response>{
    async fn handle(&self, input: &Q) -> Result<Option<R>, StoreError>;
}

// commands
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderCommand{
    pub order_line_items: Vec<OrderLineItemDto>,
}
impl Command for PlaceOrderCommand{}

// queries
pub struct GetOrderQuery{
    pub id: String
}
impl Query for GetOrderQuery{}

// command handlers
#[derive(Clone)]
pub struct PlaceOrderCommandHandler<T1: InventoryClient, T2: OrderRepository, T3: MessageBroker, T4: WorkflowInstrumentation>{
    inventory_client: Arc<T1>,
    order_repository: Arc<T2>,
    message_broker: Arc<T3>,
    instrumentation: Arc<T4>,
    order_placed_topic: String,
}

impl<T1: InventoryClient, T2: OrderRepository, T3: MessageBroker, T4: WorkflowInstrumentation> PlaceOrderCommandHandler<T1, T2, T3, T4>{
    pub fn new(
        inventory_client: Arc<T1>,
        order_repository: Arc<T2>,
        message_broker: Arc<T3>,
        instrumentation: Arc<T4>,
        order_placed_topic: String) -> Self{
        PlaceOrderCommandHandler{
            inventory_client: inventory_client,
            order_repository: order_repository,
            message_broker: message_broker,
            instrumentation: instrumentation,
            order_placed_topic: order_placed_topic,
        }
    }
}

#[async_trait]
impl<T1: InventoryClient + 'static, T2: OrderRepository + 'static, T3: MessageBroker + 'static, T4: WorkflowInstrumentation + 'static> CommandHandler<PlaceOrderCommand, PlaceOrderResponse> for PlaceOrderCommandHandler<T1, T2, T3, T4>{
    async fn handle(&self, input: &PlaceOrderCommand) -> Result<PlaceOrderResponse, PlacementError> {
        match validate_order_request(input) {
            Ok(()) => {},
            Err(reason) => {
                self.instrumentation.order_rejected("validation");
                event!(Level::INFO, "Rejecting invalid order request: {}", reason);
                return Err(PlacementError::Validation(reason));
            }
        }

        let order = build_order(input);
        let product_codes = distinct_product_codes(&order.line_items);

        self.instrumentation.inventory_lookup_started(&order.id, &product_codes);
        let lookup_started_at = Instant::now();
        let statuses = match self.inventory_client.check_stock(product_codes.clone()).await {
            Ok(statuses) => {
                self.instrumentation.inventory_lookup_completed(&order.id, statuses.len(), lookup_started_at.elapsed());
                statuses
            },
            Err(e) => {
                self.instrumentation.inventory_lookup_failed(&order.id, &e.to_string(), lookup_started_at.elapsed());
                self.instrumentation.order_rejected("inventory_unavailable");
                event!(Level::ERROR, "Inventory lookup for order {} ({:?}) failed: {}", order.id, product_codes, e);
                return Err(PlacementError::InventoryUnavailable(e));
            }
        };

        // decided against this one response snapshot, never re-queried
        let unavailable_product_codes = find_unavailable_product_codes(&product_codes, &statuses);
        if !unavailable_product_codes.is_empty() {
            self.instrumentation.order_rejected("out_of_stock");
            event!(Level::INFO, "Order {} is not fulfillable, no stock for {:?}", order.id, unavailable_product_codes);
            return Err(PlacementError::OutOfStock { product_codes: unavailable_product_codes });
        }

        // save and publish run on their own task so they complete even if the
        // caller goes away
        let order_repository = Arc::clone(&self.order_repository);
        let message_broker = Arc::clone(&self.message_broker);
        let instrumentation = Arc::clone(&self.instrumentation);
        let destination_name = self.order_placed_topic.clone();
        let order_id = order.id.clone();

        let persist_and_publish = tokio::spawn(async move {
            match order_repository.save(&order).await {
                Ok(()) => {
                    event!(Level::INFO, "Order {} persisted with {} line items", order.id, order.line_items.len());
                },
                Err(e) => {
                    instrumentation.order_rejected("store_failure");
                    event!(Level::ERROR, "Failed to persist order {}: {}", order.id, e);
                    return Err(PlacementError::Store(e));
                }
            }

            let placed_event = OrderPlacedEvent {
                order_id: order.id.clone(),
            };
            match message_broker.publish_message(&placed_event, &destination_name).await {
                Ok(()) => {
                    instrumentation.order_placed(&order.id);
                    Ok(())
                },
                Err(e) => {
                    instrumentation.publish_failed(&order.id);
                    event!(Level::ERROR, "Order {} was persisted but publishing to {} failed: {}", order.id, destination_name, e);
                    Err(PlacementError::Publish {
                        order_id: order.id.clone(),
                        reason: e,
                    })
                }
            }
        });

        match persist_and_publish.await {
            Ok(Ok(())) => Ok(PlaceOrderResponse {
                order_id: order_id
            }),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(PlacementError::Store(StoreError::Database(format!("Persistence task for order {} did not complete: {}", order_id, e))))
        }
    }
}

// query handlers
#[derive(Clone)]
pub struct GetOrderQueryHandler<T1: OrderRepository>{
    order_repository: Arc<T1>,
}

impl<T1: OrderRepository> GetOrderQueryHandler<T1>{
    pub fn new(order_repository: Arc<T1>) -> Self {
        GetOrderQueryHandler{
            order_repository: order_repository
        }
    }
}

#[async_trait]
impl<T1: OrderRepository + 'static> QueryHandler<GetOrderQuery, GetOrderResponse> for GetOrderQueryHandler<T1>{
    async fn handle(&self, input: &GetOrderQuery) -> Result<Option<GetOrderResponse>, StoreError> {
        match self.order_repository.find_by_id(input.id.as_str()).await {
            Ok(Some(order)) => Ok(Some(map_order_to_response(&order))),
            Ok(None) => Ok(None),
            Err(e) => {
                event!(Level::ERROR, "Failed to look up order {}: {}", input.id, e);
                Err(e)
            }
        }
    }
}

fn validate_order_request(input: &PlaceOrderCommand) -> Result<(), String> {
    if input.order_line_items.is_empty() {
        return Err(String::from("order must contain at least one line item"));
    }

    for line_item in &input.order_line_items {
        if line_item.quantity <= 0 {
            return Err(format!("quantity for product {} must be positive", line_item.product_code));
        }
        if line_item.price < 0.0 {
            return Err(format!("price for product {} must not be negative", line_item.product_code));
        }
    }

    Ok(())
}

fn build_order(input: &PlaceOrderCommand) -> Order {
    let line_items = input.order_line_items
        .iter()
        .map(map_line_item_from_dto)
        .collect();

    Order {
        id: uuid::Uuid::new_v4().to_string(),
        line_items: line_items,
        created_at: chrono::Utc::now(),
    }
}

fn map_line_item_from_dto(dto: &OrderLineItemDto) -> OrderLineItem {
    OrderLineItem {
        product_code: dto.product_code.clone(),
        quantity: dto.quantity,
        price: dto.price,
    }
}

fn distinct_product_codes(line_items: &[OrderLineItem]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut product_codes = Vec::new();

    for line_item in line_items {
        if seen.insert(line_item.product_code.clone()) {
            product_codes.push(line_item.product_code.clone());
        }
    }

    product_codes
}

// a requested code must be confirmed in stock; any out-of-stock entry rejects
// its code, duplicates and unrequested codes included
fn find_unavailable_product_codes(requested: &[String], statuses: &[InventoryStatus]) -> Vec<String> {
    let mut confirmed = HashSet::new();
    let mut reported_out = HashSet::new();
    for status in statuses {
        if status.in_stock {
            confirmed.insert(status.product_code.as_str());
        } else {
            reported_out.insert(status.product_code.as_str());
        }
    }

    let mut unavailable: Vec<String> = requested
        .iter()
        .filter(|product_code| {
            reported_out.contains(product_code.as_str()) || !confirmed.contains(product_code.as_str())
        })
        .cloned()
        .collect();

    for status in statuses {
        if !status.in_stock && !unavailable.contains(&status.product_code) {
            unavailable.push(status.product_code.clone());
        }
    }

    unavailable
}

fn map_order_to_response(order: &Order) -> GetOrderResponse {
    GetOrderResponse {
        id: order.id.clone(),
        order_line_items: order.line_items
            .iter()
            .map(|line_item| OrderLineItemResponse {
                product_code: line_item.product_code.clone(),
                quantity: line_item.quantity,
                price: line_item.price,
            })
            .collect(),
        created_at: order.created_at,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::errors::{InventoryClientError, PublishError};
    use crate::events::MockMessageBroker;
    use crate::inventory::MockInventoryClient;
    use crate::metrics::PrometheusWorkflowInstrumentation;
    use crate::repositories::{InMemoryOrderRepository, MockOrderRepository};

    use super::*;

    fn two_item_command() -> PlaceOrderCommand {
        PlaceOrderCommand {
            order_line_items: vec![
                OrderLineItemDto {
                    product_code: String::from("A1"),
                    quantity: 2,
                    price: 19.99,
                },
                OrderLineItemDto {
                    product_code: String::from("B2"),
                    quantity: 1,
                    price: 5.49,
                },
            ],
        }
    }

    fn all_in_stock(product_codes: Vec<String>) -> Result<Vec<InventoryStatus>, InventoryClientError> {
        Ok(product_codes
            .into_iter()
            .map(|product_code| InventoryStatus {
                product_code: product_code,
                in_stock: true,
            })
            .collect())
    }

    fn handler_with(
        inventory_client: MockInventoryClient,
        order_repository: MockOrderRepository,
        message_broker: MockMessageBroker,
    ) -> PlaceOrderCommandHandler<MockInventoryClient, MockOrderRepository, MockMessageBroker, PrometheusWorkflowInstrumentation> {
        PlaceOrderCommandHandler::new(
            Arc::new(inventory_client),
            Arc::new(order_repository),
            Arc::new(message_broker),
            Arc::new(PrometheusWorkflowInstrumentation::new().unwrap()),
            String::from("order.placed"),
        )
    }

    #[tokio::test]
    async fn fulfillable_order_is_saved_once_and_published_once() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client
            .expect_check_stock()
            .withf(|product_codes: &Vec<String>| {
                product_codes == &vec![String::from("A1"), String::from("B2")]
            })
            .times(1)
            .returning(all_in_stock);

        let saved_order_id = Arc::new(Mutex::new(None::<String>));
        let saved_line_items = Arc::new(Mutex::new(0usize));
        let saved_order_id_for_mock = saved_order_id.clone();
        let saved_line_items_for_mock = saved_line_items.clone();
        let mut order_repository = MockOrderRepository::new();
        order_repository
            .expect_save()
            .times(1)
            .returning(move |order| {
                *saved_order_id_for_mock.lock().unwrap() = Some(order.id.clone());
                *saved_line_items_for_mock.lock().unwrap() = order.line_items.len();
                Ok(())
            });

        let published_order_id = Arc::new(Mutex::new(None::<String>));
        let published_order_id_for_mock = published_order_id.clone();
        let mut message_broker = MockMessageBroker::new();
        message_broker
            .expect_publish_message()
            .withf(|_, destination_name| destination_name == "order.placed")
            .times(1)
            .returning(move |placed_event, _| {
                *published_order_id_for_mock.lock().unwrap() = Some(placed_event.order_id.clone());
                Ok(())
            });

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let response = handler.handle(&two_item_command()).await.unwrap();

        assert!(uuid::Uuid::parse_str(&response.order_id).is_ok());
        assert_eq!(saved_order_id.lock().unwrap().clone().unwrap(), response.order_id);
        assert_eq!(*saved_line_items.lock().unwrap(), 2);
        assert_eq!(published_order_id.lock().unwrap().clone().unwrap(), response.order_id);
    }

    #[tokio::test]
    async fn each_placement_gets_a_previously_unseen_identifier() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client
            .expect_check_stock()
            .times(2)
            .returning(all_in_stock);

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().times(2).returning(|_| Ok(()));

        let mut message_broker = MockMessageBroker::new();
        message_broker
            .expect_publish_message()
            .times(2)
            .returning(|_, _| Ok(()));

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let first_response = handler.handle(&two_item_command()).await.unwrap();
        let second_response = handler.handle(&two_item_command()).await.unwrap();

        assert_ne!(first_response.order_id, second_response.order_id);
    }

    #[tokio::test]
    async fn empty_inventory_response_rejects_the_order_without_side_effects() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client
            .expect_check_stock()
            .times(1)
            .returning(|_| Ok(vec![]));

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler.handle(&two_item_command()).await;

        match result {
            Err(PlacementError::OutOfStock { product_codes }) => {
                assert_eq!(product_codes, vec![String::from("A1"), String::from("B2")]);
            }
            other => panic!("expected out of stock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn a_code_missing_from_the_response_counts_as_not_in_stock() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client.expect_check_stock().times(1).returning(|_| {
            Ok(vec![InventoryStatus {
                product_code: String::from("A1"),
                in_stock: true,
            }])
        });

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler.handle(&two_item_command()).await;

        match result {
            Err(PlacementError::OutOfStock { product_codes }) => {
                assert_eq!(product_codes, vec![String::from("B2")]);
            }
            other => panic!("expected out of stock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn a_code_reported_out_of_stock_rejects_the_order() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client.expect_check_stock().times(1).returning(|_| {
            Ok(vec![
                InventoryStatus {
                    product_code: String::from("A1"),
                    in_stock: true,
                },
                InventoryStatus {
                    product_code: String::from("B2"),
                    in_stock: false,
                },
            ])
        });

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler.handle(&two_item_command()).await;

        match result {
            Err(PlacementError::OutOfStock { product_codes }) => {
                assert_eq!(product_codes, vec![String::from("B2")]);
            }
            other => panic!("expected out of stock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn a_duplicate_entry_reporting_out_of_stock_wins_over_one_reporting_in_stock() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client.expect_check_stock().times(1).returning(|_| {
            Ok(vec![
                InventoryStatus {
                    product_code: String::from("A1"),
                    in_stock: false,
                },
                InventoryStatus {
                    product_code: String::from("A1"),
                    in_stock: true,
                },
            ])
        });

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler
            .handle(&PlaceOrderCommand {
                order_line_items: vec![OrderLineItemDto {
                    product_code: String::from("A1"),
                    quantity: 1,
                    price: 19.99,
                }],
            })
            .await;

        match result {
            Err(PlacementError::OutOfStock { product_codes }) => {
                assert_eq!(product_codes, vec![String::from("A1")]);
            }
            other => panic!("expected out of stock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn an_out_of_stock_entry_for_an_unrequested_code_still_rejects_the_order() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client.expect_check_stock().times(1).returning(|_| {
            Ok(vec![
                InventoryStatus {
                    product_code: String::from("A1"),
                    in_stock: true,
                },
                InventoryStatus {
                    product_code: String::from("Z9"),
                    in_stock: false,
                },
            ])
        });

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler
            .handle(&PlaceOrderCommand {
                order_line_items: vec![OrderLineItemDto {
                    product_code: String::from("A1"),
                    quantity: 1,
                    price: 19.99,
                }],
            })
            .await;

        match result {
            Err(PlacementError::OutOfStock { product_codes }) => {
                assert_eq!(product_codes, vec![String::from("Z9")]);
            }
            other => panic!("expected out of stock, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn inventory_failure_is_reported_without_side_effects() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client
            .expect_check_stock()
            .times(1)
            .returning(|_| Err(InventoryClientError::Timeout));

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler.handle(&two_item_command()).await;

        match result {
            Err(PlacementError::InventoryUnavailable(InventoryClientError::Timeout)) => {}
            other => panic!("expected inventory unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn store_failure_is_surfaced_and_nothing_is_published() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client
            .expect_check_stock()
            .times(1)
            .returning(all_in_stock);

        let mut order_repository = MockOrderRepository::new();
        order_repository
            .expect_save()
            .times(1)
            .returning(|_| Err(StoreError::Database(String::from("Failed to insert order: connection reset"))));

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler.handle(&two_item_command()).await;

        match result {
            Err(PlacementError::Store(_)) => {}
            other => panic!("expected a store error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn publish_failure_still_leaves_the_order_retrievable() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client
            .expect_check_stock()
            .times(1)
            .returning(all_in_stock);

        let order_repository = InMemoryOrderRepository::new();

        let mut message_broker = MockMessageBroker::new();
        message_broker
            .expect_publish_message()
            .times(1)
            .returning(|_, _| Err(PublishError::Publish(String::from("Failed to publish event to broker: connection reset"))));

        let handler = PlaceOrderCommandHandler::new(
            Arc::new(inventory_client),
            Arc::new(order_repository.clone()),
            Arc::new(message_broker),
            Arc::new(PrometheusWorkflowInstrumentation::new().unwrap()),
            String::from("order.placed"),
        );

        let result = handler.handle(&two_item_command()).await;

        let order_id = match result {
            Err(PlacementError::Publish { order_id, .. }) => order_id,
            other => panic!("expected a publish error, got {:?}", other),
        };

        let stored_order = order_repository.find_by_id(&order_id).await.unwrap();
        let stored_order = stored_order.unwrap();
        assert_eq!(stored_order.id, order_id);
        assert_eq!(stored_order.line_items.len(), 2);
    }

    #[tokio::test]
    async fn an_order_without_line_items_is_rejected_before_any_lookup() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client.expect_check_stock().never();

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler
            .handle(&PlaceOrderCommand {
                order_line_items: vec![],
            })
            .await;

        match result {
            Err(PlacementError::Validation(_)) => {}
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn a_non_positive_quantity_is_rejected_before_any_lookup() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client.expect_check_stock().never();

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler
            .handle(&PlaceOrderCommand {
                order_line_items: vec![OrderLineItemDto {
                    product_code: String::from("A1"),
                    quantity: 0,
                    price: 19.99,
                }],
            })
            .await;

        match result {
            Err(PlacementError::Validation(reason)) => assert!(reason.contains("quantity")),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn a_negative_price_is_rejected_before_any_lookup() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client.expect_check_stock().never();

        let mut order_repository = MockOrderRepository::new();
        order_repository.expect_save().never();

        let mut message_broker = MockMessageBroker::new();
        message_broker.expect_publish_message().never();

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let result = handler
            .handle(&PlaceOrderCommand {
                order_line_items: vec![OrderLineItemDto {
                    product_code: String::from("A1"),
                    quantity: 1,
                    price: -0.01,
                }],
            })
            .await;

        match result {
            Err(PlacementError::Validation(reason)) => assert!(reason.contains("price")),
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_codes_are_checked_in_one_deduplicated_lookup() {
        let mut inventory_client = MockInventoryClient::new();
        inventory_client
            .expect_check_stock()
            .withf(|product_codes: &Vec<String>| product_codes == &vec![String::from("A1")])
            .times(1)
            .returning(all_in_stock);

        let saved_line_items = Arc::new(Mutex::new(0usize));
        let saved_line_items_for_mock = saved_line_items.clone();
        let mut order_repository = MockOrderRepository::new();
        order_repository
            .expect_save()
            .times(1)
            .returning(move |order| {
                *saved_line_items_for_mock.lock().unwrap() = order.line_items.len();
                Ok(())
            });

        let mut message_broker = MockMessageBroker::new();
        message_broker
            .expect_publish_message()
            .times(1)
            .returning(|_, _| Ok(()));

        let handler = handler_with(inventory_client, order_repository, message_broker);

        let response = handler
            .handle(&PlaceOrderCommand {
                order_line_items: vec![
                    OrderLineItemDto {
                        product_code: String::from("A1"),
                        quantity: 2,
                        price: 19.99,
                    },
                    OrderLineItemDto {
                        product_code: String::from("A1"),
                        quantity: 3,
                        price: 19.99,
                    },
                ],
            })
            .await
            .unwrap();

        assert!(!response.order_id.is_empty());
        // both line items survive even though the lookup was deduplicated
        assert_eq!(*saved_line_items.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn get_order_returns_the_stored_order() {
        let order_repository = InMemoryOrderRepository::new();
        let order = build_order(&two_item_command());
        order_repository.save(&order).await.unwrap();

        let handler = GetOrderQueryHandler::new(Arc::new(order_repository));

        let response = handler
            .handle(&GetOrderQuery { id: order.id.clone() })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(response.id, order.id);
        assert_eq!(response.order_line_items.len(), 2);
        assert_eq!(response.order_line_items[0].product_code, "A1");
        assert_eq!(response.order_line_items[0].quantity, 2);
    }

    #[tokio::test]
    async fn get_order_returns_nothing_for_an_unknown_id() {
        let handler = GetOrderQueryHandler::new(Arc::new(InMemoryOrderRepository::new()));

        let response = handler
            .handle(&GetOrderQuery {
                id: String::from("no-such-order"),
            })
            .await
            .unwrap();

        assert!(response.is_none());
    }
}
