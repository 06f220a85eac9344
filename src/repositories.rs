use async_trait::async_trait;
use mongodb::{bson::doc, Client, ClientSession, Collection};
use tokio::sync::Mutex;
use tracing::{event, Level};
use crate::domain::Order;
use crate::errors::StoreError;
use std::{collections::HashMap, sync::Arc};

#[derive(Debug)]
pub struct MongoDbInitializationInfo {
    pub uri: String,
    pub database: String,
    pub collection: String
}

// orders are written once and looked up by id, nothing else
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn save(&self, order: &Order) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StoreError>;
}

#[derive(Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<Mutex<HashMap<String, Order>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        InMemoryOrderRepository {
            orders: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        let mut lock = self.orders.lock().await;
        lock.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let lock = self.orders.lock().await;
        Ok(lock.get(id).cloned())
    }
}

#[derive(Clone)]
pub struct MongoDbOrderRepository {
    order_collection: Collection<Order>,
    client_session: Arc<Mutex<ClientSession>>,
}

impl MongoDbOrderRepository {
    pub fn new(info: &MongoDbInitializationInfo, client: &Client, client_session: Arc<Mutex<ClientSession>>) -> Self {
        let database = client.database(&info.database);

        MongoDbOrderRepository {
            order_collection: database.collection(&info.collection),
            client_session: client_session,
        }
    }
}

#[async_trait]
impl OrderRepository for MongoDbOrderRepository {
    // the insert runs in a transaction held only for this save, committed or
    // aborted on every exit path
    async fn save(&self, order: &Order) -> Result<(), StoreError> {
        let mut session = self.client_session.lock().await;

        match session.start_transaction().await {
            Ok(()) => {},
            Err(e) => return Err(StoreError::Transaction(format!("Failed to start transaction for order {}: {}", order.id, e)))
        }

        match self.order_collection.insert_one(order).session(&mut *session).await {
            Ok(_) => {
                match session.commit_transaction().await {
                    Ok(()) => Ok(()),
                    Err(e) => Err(StoreError::Transaction(format!("Failed to commit order {}: {}", order.id, e)))
                }
            },
            Err(e) => {
                match session.abort_transaction().await {
                    Ok(()) => {},
                    Err(abort_error) => {
                        event!(Level::WARN, "Failed to abort transaction for order {}: {}", order.id, abort_error);
                    }
                }
                Err(StoreError::Database(format!("Failed to insert order {}: {}", order.id, e)))
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, StoreError> {
        match self.order_collection.find_one(doc! {"id": id}).await {
            Ok(found_order) => Ok(found_order),
            Err(e) => {
                Err(StoreError::Database(format!("Failed to find order {}: {}", id, e)))
            }
        }
    }
}
