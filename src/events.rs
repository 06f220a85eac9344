use amqprs::{callbacks::{DefaultChannelCallback, DefaultConnectionCallback}, channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments, ExchangeType, QueueBindArguments, QueueDeclareArguments}, connection::{Connection, OpenConnectionArguments}, BasicProperties, DELIVERY_MODE_PERSISTENT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::errors::PublishError;

pub struct RabbitMqInitializationInfo{
    uri: String,
    port: u16,
    username: String,
    password: String
}

impl RabbitMqInitializationInfo {
    pub fn new(
        uri: String,
        port: u16,
        username: String,
        password: String) -> RabbitMqInitializationInfo{
            RabbitMqInitializationInfo {
                uri: uri,
                port: port,
                username: username,
                password: password
            }
        }
}

// events
// wire schema is fixed for external consumers: {"orderId": "<uuid>"}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlacedEvent {
    pub order_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish_message(
        &self,
        event: &OrderPlacedEvent,
        destination_name: &str,
    ) -> Result<(), PublishError>;
}

// event brokers
pub struct RabbitMqMessageBroker{
    connection: Connection,
}

impl RabbitMqMessageBroker{
    pub async fn new(init_info: RabbitMqInitializationInfo) -> Result<RabbitMqMessageBroker, String>{
        match Connection::open(&OpenConnectionArguments::new(&init_info.uri, init_info.port, &init_info.username, &init_info.password)
        ).await {
            Ok(connection) => {
                match connection.register_callback(DefaultConnectionCallback).await {
                    Ok(()) => {
                        Ok(RabbitMqMessageBroker{
                            connection: connection
                        })
                    },
                    Err(e) => {
                        Err(format!("Failed to register connection callback: {}", e))
                    }
                }
            },
            Err(e) => {
                Err(format!("Failed to open RabbitMQ connection: {}", e))
            }
        }
    }

    // durable fanout exchange with a bound durable queue, so events survive
    // periods with no consumer attached
    pub async fn get_channel(&self, destination: &str) -> Result<Channel, PublishError>{
        match self.connection.open_channel(None).await{
            Ok(channel) => {
                match channel.register_callback(DefaultChannelCallback).await {
                    Ok(()) => {},
                    Err(e) => return Err(PublishError::Channel(format!("Failed to register channel callback: {}", e)))
                }
                match channel.exchange_declare(ExchangeDeclareArguments::new(destination, &ExchangeType::Fanout.to_string())).await {
                    Ok(()) => {},
                    Err(e) => return Err(PublishError::Channel(format!("Failed to declare exchange {}: {}", destination, e)))
                }
                match channel.queue_declare(QueueDeclareArguments::durable_client_named(destination)).await {
                    Ok(_) => {},
                    Err(e) => return Err(PublishError::Channel(format!("Failed to declare queue {}: {}", destination, e)))
                }
                match channel.queue_bind(QueueBindArguments::new(destination, destination, "")).await {
                    Ok(()) => {},
                    Err(e) => return Err(PublishError::Channel(format!("Failed to bind queue {}: {}", destination, e)))
                }

                Ok(channel)
            },
            Err(e) => {
                Err(PublishError::Channel(format!("Failed to get channel: {}", e)))
            }
        }
    }
}

#[async_trait]
impl MessageBroker for RabbitMqMessageBroker{
    async fn publish_message(&self, event: &OrderPlacedEvent, destination_name: &str) -> Result<(), PublishError> {
        match self.get_channel(destination_name).await{
            Ok(channel) => {
                let mut delivery_properties = BasicProperties::default();
                delivery_properties.with_delivery_mode(DELIVERY_MODE_PERSISTENT);
                match serde_json::to_string(&event){
                    Ok(serialized_event) => {
                        event!(Level::DEBUG, "Publishing {} to {}", serialized_event, destination_name);
                        match channel.basic_publish(delivery_properties, serialized_event.into_bytes(), BasicPublishArguments::new(destination_name, "")).await {
                            Ok(()) => Ok(()),
                            Err(e) => Err(PublishError::Publish(format!("Failed to publish event to broker: {}", e)))
                        }
                    },
                    Err(e) => Err(PublishError::Serialize(format!("Failed to serialize event: {}", e)))
                }
            },
            Err(e) => {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_placed_event_uses_the_published_wire_schema() {
        let placed_event = OrderPlacedEvent {
            order_id: String::from("3f2c1d"),
        };

        let serialized = serde_json::to_string(&placed_event).unwrap();

        assert_eq!(serialized, r#"{"orderId":"3f2c1d"}"#);
    }

    #[test]
    fn order_placed_event_round_trips_for_external_consumers() {
        let parsed: OrderPlacedEvent = serde_json::from_str(r#"{"orderId":"abc-123"}"#).unwrap();

        assert_eq!(parsed.order_id, "abc-123");
    }
}
