use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait Response{}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItemDto {
    pub product_code: String,
    pub quantity: i32,
    pub price: f64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_id: String,
}
impl Response for PlaceOrderResponse{}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItemResponse {
    pub product_code: String,
    pub quantity: i32,
    pub price: f64,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetOrderResponse {
    pub id: String,
    pub order_line_items: Vec<OrderLineItemResponse>,
    pub created_at: DateTime<Utc>,
}
impl Response for GetOrderResponse{}

#[derive(Deserialize, Serialize)]
pub struct ApiError{
    pub error: String
}
impl Response for ApiError{}
