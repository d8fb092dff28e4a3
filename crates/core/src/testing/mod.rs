//! Testing utilities shared by unit and integration tests.
//!
//! Provides a [`RecordingNotifier`] standing in for real delivery channels,
//! payload and catalog fixtures, and a webhook signing helper.

mod recording_notifier;

pub use recording_notifier::RecordingNotifier;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Compute the `X-Shopify-Hmac-Sha256` value the order source would send for `body`.
pub fn sign_webhook_body(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts any key length");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::Utc;
    use serde_json::{json, Value};

    use crate::catalog::{Product, ProductImport};
    use crate::order::OrderPayload;

    /// Purchase URL of the example catalog entry.
    pub const EXAMPLE_URL: &str = "https://www.amazon.com/dp/B000ABC123";

    /// Create an active product whose SKU equals its ASIN.
    pub fn product(sku: &str, amazon_url: &str) -> Product {
        Product {
            id: 0,
            sku: sku.to_string(),
            asin: sku.to_string(),
            amazon_url: amazon_url.to_string(),
            product_name: format!("Product {}", sku),
            buy_price: Some(10.0),
            sell_price: Some(19.99),
            category: None,
            is_active: true,
            stock_status: "in_stock".to_string(),
            notes: String::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn inactive_product(sku: &str) -> Product {
        Product {
            is_active: false,
            ..product(sku, &format!("https://www.amazon.com/dp/{}", sku))
        }
    }

    /// Catalog entry matching [`example_order_json`]'s mapped line item.
    pub fn example_catalog() -> Vec<ProductImport> {
        vec![ProductImport::new("B000ABC123", "B000ABC123", EXAMPLE_URL).with_name("Garden Hose")]
    }

    /// Order `E-1001`: one catalogued line item and one without a SKU.
    pub fn example_order_json() -> Value {
        json!({
            "id": "E-1001",
            "order_number": 1001,
            "email": "ada@example.com",
            "total_price": "39.98",
            "shipping_address": {
                "first_name": "Ada",
                "last_name": "Lovelace",
                "address1": "12 St James's Square",
                "city": "London",
                "zip": "SW1Y 4JH",
                "country": "GB"
            },
            "line_items": [
                {"id": 1, "title": "Garden Hose", "sku": "B000ABC123", "quantity": 1, "price": "19.99"},
                {"id": 2, "title": "Gift Wrap", "sku": "", "quantity": 1, "price": "19.99"}
            ]
        })
    }

    pub fn example_order_payload() -> OrderPayload {
        serde_json::from_value(example_order_json()).expect("example payload is valid")
    }

    /// An order with `count` catalogued line items.
    pub fn order_json(external_id: &str, count: usize) -> Value {
        let line_items: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "id": i + 1,
                    "title": format!("Item {}", i + 1),
                    "sku": "B000ABC123",
                    "quantity": 1,
                    "price": "19.99"
                })
            })
            .collect();

        json!({
            "id": external_id,
            "total_price": 19.99 * count as f64,
            "line_items": line_items
        })
    }
}
