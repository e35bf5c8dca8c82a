//! Payments, orders and order lines over PostgREST.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use motostore_core::{
    AddressId, CardType, OrderId, OrderStatus, PaymentId, PaymentStatus, Price, ProcessingMethod,
    ProductId, UserId,
};

use crate::backend::SupabaseClient;
use crate::db::{OrderRepository, PaymentRepository, Result};
use crate::models::{NewOrder, NewPayment, Order, OrderItem, Payment};

const PAYMENTS: &str = "pagos";
const ORDERS: &str = "pedidos";
const ORDER_ITEMS: &str = "items_pedido";

const ORDER_NUMBER_FUNCTION: &str = "generar_numero_pedido";

#[derive(Debug, Serialize)]
struct PaymentWrite<'a> {
    #[serde(rename = "usuario_id")]
    user_id: UserId,
    total: Decimal,
    #[serde(rename = "tipo_tarjeta")]
    card_type: CardType,
    #[serde(rename = "ultimos_4_digitos")]
    last_four: &'a str,
    #[serde(rename = "nombre_titular")]
    cardholder_name: &'a str,
    #[serde(rename = "estado")]
    status: PaymentStatus,
    #[serde(rename = "metodo_procesamiento")]
    method: ProcessingMethod,
}

#[derive(Debug, Deserialize)]
struct PaymentRow {
    id: PaymentId,
    #[serde(rename = "usuario_id")]
    user_id: UserId,
    total: Decimal,
    #[serde(rename = "tipo_tarjeta")]
    card_type: CardType,
    #[serde(rename = "ultimos_4_digitos")]
    last_four: String,
    #[serde(rename = "nombre_titular")]
    cardholder_name: String,
    #[serde(rename = "estado")]
    status: PaymentStatus,
    #[serde(rename = "metodo_procesamiento", default)]
    method: ProcessingMethod,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            total: Price::store(row.total),
            card_type: row.card_type,
            last_four: row.last_four,
            cardholder_name: row.cardholder_name,
            status: row.status,
            method: row.method,
        }
    }
}

#[derive(Debug, Serialize)]
struct OrderWrite<'a> {
    #[serde(rename = "pago_id")]
    payment_id: PaymentId,
    #[serde(rename = "usuario_id")]
    user_id: UserId,
    #[serde(rename = "direccion_envio_id")]
    address_id: AddressId,
    #[serde(rename = "estado")]
    status: OrderStatus,
    #[serde(rename = "numero_pedido")]
    order_number: &'a str,
    #[serde(rename = "numero_rastreo")]
    tracking_number: &'a str,
    #[serde(rename = "fecha_confirmacion")]
    confirmed_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
    id: OrderId,
    #[serde(rename = "pago_id")]
    payment_id: PaymentId,
    #[serde(rename = "usuario_id")]
    user_id: UserId,
    #[serde(rename = "direccion_envio_id")]
    address_id: AddressId,
    #[serde(rename = "estado")]
    status: OrderStatus,
    #[serde(rename = "numero_pedido")]
    order_number: String,
    #[serde(rename = "numero_rastreo")]
    tracking_number: String,
    #[serde(rename = "fecha_confirmacion", default)]
    confirmed_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            payment_id: row.payment_id,
            user_id: row.user_id,
            address_id: row.address_id,
            status: row.status,
            order_number: row.order_number,
            tracking_number: row.tracking_number,
            confirmed_at: row.confirmed_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct OrderItemWrite<'a> {
    #[serde(rename = "pedido_id")]
    order_id: OrderId,
    #[serde(rename = "producto_id")]
    product_id: ProductId,
    #[serde(rename = "cantidad")]
    quantity: i32,
    #[serde(rename = "precio_unitario")]
    unit_price: Decimal,
    subtotal: Decimal,
    #[serde(rename = "nombre_producto")]
    product_name: &'a str,
    #[serde(rename = "descripcion_producto")]
    product_description: Option<&'a str>,
}

impl<'a> From<&'a OrderItem> for OrderItemWrite<'a> {
    fn from(item: &'a OrderItem) -> Self {
        Self {
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price.amount,
            subtotal: item.subtotal.amount,
            product_name: &item.product_name,
            product_description: item.product_description.as_deref(),
        }
    }
}

/// Empty args object for the order-number function.
#[derive(Debug, Serialize)]
struct NoArgs {}

impl PaymentRepository for SupabaseClient {
    #[instrument(skip(self, payment), fields(user_id = %payment.user_id, total = %payment.total))]
    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment> {
        let row: PaymentRow = self
            .insert_one(
                PAYMENTS,
                &PaymentWrite {
                    user_id: payment.user_id,
                    total: payment.total.amount,
                    card_type: payment.card_type,
                    last_four: &payment.last_four,
                    cardholder_name: &payment.cardholder_name,
                    status: payment.status,
                    method: payment.method,
                },
            )
            .await?;
        Ok(row.into())
    }
}

impl OrderRepository for SupabaseClient {
    #[instrument(skip(self))]
    async fn generate_order_number(&self) -> Result<Option<String>> {
        let number: Option<String> = self.rpc(ORDER_NUMBER_FUNCTION, &NoArgs {}).await?;
        let number = number.filter(|n| !n.trim().is_empty());
        if number.is_none() {
            warn!("Order number generator returned nothing");
        }
        Ok(number)
    }

    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn insert_order(&self, order: &NewOrder) -> Result<Order> {
        let row: OrderRow = self
            .insert_one(
                ORDERS,
                &OrderWrite {
                    payment_id: order.payment_id,
                    user_id: order.user_id,
                    address_id: order.address_id,
                    status: order.status,
                    order_number: &order.order_number,
                    tracking_number: &order.tracking_number,
                    confirmed_at: order.confirmed_at,
                },
            )
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn insert_order_items(&self, items: &[OrderItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let rows: Vec<OrderItemWrite<'_>> = items.iter().map(OrderItemWrite::from).collect();
        let _: Vec<IgnoredAny> = self.insert(ORDER_ITEMS, &rows).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_write_uses_backend_values() {
        let write = PaymentWrite {
            user_id: UserId::random(),
            total: Decimal::new(2500, 2),
            card_type: CardType::Debit,
            last_four: "3456",
            cardholder_name: "Juan Pérez",
            status: PaymentStatus::Completed,
            method: ProcessingMethod::Simulated,
        };
        let json = serde_json::to_value(&write).unwrap();
        assert_eq!(json["tipo_tarjeta"], "Débito");
        assert_eq!(json["ultimos_4_digitos"], "3456");
        assert_eq!(json["estado"], "completado");
        assert_eq!(json["metodo_procesamiento"], "simulado");
    }

    #[test]
    fn test_order_item_write_snapshots_amounts() {
        let item = OrderItem {
            order_id: OrderId::random(),
            product_id: ProductId::random(),
            quantity: 2,
            unit_price: Price::store(Decimal::new(1000, 2)),
            subtotal: Price::store(Decimal::new(2000, 2)),
            product_name: "Casco".to_string(),
            product_description: None,
        };
        let json = serde_json::to_value(OrderItemWrite::from(&item)).unwrap();
        assert_eq!(json["cantidad"], 2);
        assert_eq!(json["nombre_producto"], "Casco");
        assert!(json["descripcion_producto"].is_null());
        assert_eq!(
            serde_json::from_value::<Decimal>(json["subtotal"].clone()).unwrap(),
            Decimal::new(2000, 2)
        );
    }

    #[test]
    fn test_order_row_without_confirmation_time() {
        let row: OrderRow = serde_json::from_str(
            r#"{
                "id": "66666666-6666-4666-8666-666666666666",
                "pago_id": "77777777-7777-4777-8777-777777777777",
                "usuario_id": "88888888-8888-4888-8888-888888888888",
                "direccion_envio_id": "99999999-9999-4999-8999-999999999999",
                "estado": "confirmado",
                "numero_pedido": "PED-000042",
                "numero_rastreo": "MX12345678",
                "fecha_confirmacion": null
            }"#,
        )
        .unwrap();
        let order = Order::from(row);
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.confirmed_at, None);
    }
}
