//! Fixture entities and seeding helpers.
//!
//! `Message` models a chat feed (filtered by circle, newest page shown
//! oldest first) and `CartItem` a shopping cart (unordered, edited in
//! place).

use listsync_core::{Document, Entity};
use listsync_gateway::{Gateway, MemoryGateway};
use listsync_services::{Attachable, Authored, UploadedFile, User};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender_id: None,
            circle_id: None,
            file_url: None,
        }
    }

    pub fn in_circle(mut self, circle_id: impl Into<String>) -> Self {
        self.circle_id = Some(circle_id.into());
        self
    }
}

/// Partial update of a [`Message`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl MessagePatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

impl Entity for Message {
    const NAME: &'static str = "Message";
    type Patch = MessagePatch;

    fn apply_patch(&mut self, patch: &MessagePatch) {
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(url) = &patch.file_url {
            self.file_url = Some(url.clone());
        }
    }
}

impl Authored for Message {
    fn set_author(&mut self, user: &User) {
        self.sender_id = Some(user.id.clone());
    }
}

impl Attachable for Message {
    fn attach(&mut self, file: &UploadedFile) {
        self.file_url = Some(file.url.clone());
    }
}

/// A line in a shopping cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl CartItem {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            price,
            quantity,
        }
    }
}

/// Partial update of a [`CartItem`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CartItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl CartItemPatch {
    pub fn quantity(quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }
}

impl Entity for CartItem {
    const NAME: &'static str = "CartItem";
    type Patch = CartItemPatch;

    fn apply_patch(&mut self, patch: &CartItemPatch) {
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}

/// Turn a `json!` object into a [`Document`].
///
/// Panics on anything but an object.
pub fn document(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture is not a JSON object: {}", other),
    }
}

/// Server form of a cart line with a known id and creation time.
pub fn cart_row(id: &str, created_date: i64, quantity: u32) -> Document {
    document(serde_json::json!({
        "id": id,
        "created_date": created_date,
        "updated_date": created_date,
        "product_id": format!("p-{}", id),
        "name": format!("item {}", id),
        "price": 2.5,
        "quantity": quantity,
    }))
}

/// Server form of a message with a known id and creation time.
pub fn message_row(id: &str, created_date: i64, circle_id: &str, text: &str) -> Document {
    document(serde_json::json!({
        "id": id,
        "created_date": created_date,
        "updated_date": created_date,
        "circle_id": circle_id,
        "text": text,
    }))
}

/// A memory gateway holding `rows` of `entity`.
pub fn seeded_gateway(entity: &str, rows: impl IntoIterator<Item = Document>) -> MemoryGateway {
    let gateway = MemoryGateway::new();
    for row in rows {
        gateway
            .insert_raw(entity, row)
            .expect("fixture rows carry string ids");
    }
    gateway
}

/// Every document the gateway returns for `entity`, unordered.
pub async fn remote_documents<G: Gateway + ?Sized>(gateway: &G, entity: &str) -> Vec<Document> {
    gateway
        .list(entity, None, None)
        .await
        .expect("listing a fixture gateway")
}

/// Route `tracing` output to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}
