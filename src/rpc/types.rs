use serde::{Deserialize, Serialize};

use super::api_types::de_u64;

/// A product model (the catalog entry shared by its variants)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductModel {
  pub id: String,
  #[serde(default)]
  pub brand: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, deserialize_with = "de_u64")]
  pub list_price: u64,
  #[serde(default)]
  pub tags: Vec<String>,
}

/// A purchasable variant of a product model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: String,
  pub product_model_id: String,
  #[serde(default)]
  pub name: String,
  pub size: Option<String>,
  pub color: Option<String>,
  #[serde(default, deserialize_with = "de_u64")]
  pub price: u64,
  #[serde(default, deserialize_with = "de_u64")]
  pub quantity: u64,
  #[serde(default, deserialize_with = "de_u64")]
  pub sold: u64,
  #[serde(default)]
  pub is_active: bool,
}

/// A review comment on a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
  pub id: String,
  pub product_id: String,
  #[serde(default)]
  pub username: String,
  pub body: String,
  pub rating: Option<u8>,
  #[serde(default, deserialize_with = "de_u64")]
  pub upvotes: u64,
  #[serde(default)]
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
  pub tag: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, deserialize_with = "de_u64")]
  pub product_count: u64,
}

/// A discount applied to a tag or a product model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
  pub id: String,
  pub tag: Option<String>,
  pub product_model_id: Option<String>,
  pub discount_percent: Option<u32>,
  #[serde(default)]
  pub starts_at: String,
  #[serde(default)]
  pub ends_at: String,
  #[serde(default)]
  pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
  pub product_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default, deserialize_with = "de_u64")]
  pub quantity: u64,
  #[serde(default, deserialize_with = "de_u64")]
  pub price: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
  #[serde(default)]
  pub items: Vec<CartItem>,
}

impl Cart {
  pub fn total(&self) -> u64 {
    self.items.iter().map(|i| i.price * i.quantity).sum()
  }
}

// ============================================================================
// Write payloads
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductModel {
  pub brand: String,
  pub name: String,
  pub description: String,
  pub list_price: u64,
  pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
  pub product_model_id: String,
  pub size: Option<String>,
  pub color: Option<String>,
  pub price: u64,
  pub quantity: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
  pub product_id: String,
  pub body: String,
  pub rating: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTag {
  pub tag: String,
  pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
  pub tag: Option<String>,
  pub product_model_id: Option<String>,
  pub discount_percent: Option<u32>,
  pub starts_at: String,
  pub ends_at: String,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_product_model_accepts_string_prices() {
    let model: ProductModel = serde_json::from_value(json!({
      "id": "7",
      "brand": "Nike",
      "name": "Air Max",
      "listPrice": "129000"
    }))
    .unwrap();

    assert_eq!(model.list_price, 129_000);
    assert!(model.tags.is_empty());
  }

  #[test]
  fn test_cart_total() {
    let cart = Cart {
      items: vec![
        CartItem {
          product_id: "1".into(),
          name: "Shoe".into(),
          quantity: 2,
          price: 50,
        },
        CartItem {
          product_id: "2".into(),
          name: "Sock".into(),
          quantity: 3,
          price: 5,
        },
      ],
    };
    assert_eq!(cart.total(), 115);
  }
}
