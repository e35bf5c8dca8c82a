//! Payment and order records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use motostore_core::{
    AddressId, CardType, OrderId, OrderStatus, PaymentId, PaymentStatus, Price, ProcessingMethod,
    ProductId, UserId,
};

/// Payment fields written at order placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub user_id: UserId,
    pub total: Price,
    pub card_type: CardType,
    pub last_four: String,
    pub cardholder_name: String,
    pub status: PaymentStatus,
    pub method: ProcessingMethod,
}

/// A stored payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub total: Price,
    pub card_type: CardType,
    pub last_four: String,
    pub cardholder_name: String,
    pub status: PaymentStatus,
    pub method: ProcessingMethod,
}

/// Order fields written at order placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub status: OrderStatus,
    pub order_number: String,
    pub tracking_number: String,
    pub confirmed_at: DateTime<Utc>,
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub status: OrderStatus,
    pub order_number: String,
    pub tracking_number: String,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// One order line, snapshotting the product as it was sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Price,
    pub subtotal: Price,
    pub product_name: String,
    pub product_description: Option<String>,
}
