//! Cache keys for ShopNexus reads.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::cache::QueryKey;
use crate::paging::PageRequest;

use super::methods;
use super::transport::MethodId;

/// Resource families. A successful write invalidates every key of its family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
  Products,
  ProductModels,
  Comments,
  Tags,
  Sales,
  Cart,
}

/// One memoizable read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShopKey {
  /// Products, optionally restricted to one model and a search term
  Products {
    product_model_id: Option<String>,
    search: Option<String>,
    page: PageRequest,
  },
  Product { id: String },
  ProductModels {
    search: Option<String>,
    page: PageRequest,
  },
  ProductModel { id: String },
  /// Comments on a product
  Comments { product_id: String, page: PageRequest },
  Tags { page: PageRequest },
  Sales { page: PageRequest },
  Cart,
}

impl ShopKey {
  pub fn method(&self) -> MethodId {
    match self {
      Self::Products { .. } => methods::LIST_PRODUCTS,
      Self::Product { .. } => methods::GET_PRODUCT,
      Self::ProductModels { .. } => methods::LIST_PRODUCT_MODELS,
      Self::ProductModel { .. } => methods::GET_PRODUCT_MODEL,
      Self::Comments { .. } => methods::LIST_COMMENTS,
      Self::Tags { .. } => methods::LIST_TAGS,
      Self::Sales { .. } => methods::LIST_SALES,
      Self::Cart => methods::GET_CART,
    }
  }

  /// Request body sent to the server for this read.
  pub fn params(&self) -> Value {
    let mut params = Map::new();
    match self {
      Self::Products {
        product_model_id,
        search,
        page,
      } => {
        insert_page(&mut params, page);
        if let Some(id) = product_model_id {
          params.insert("productModelId".into(), json!(id));
        }
        if let Some(search) = search.as_deref().map(normalize_search) {
          params.insert("search".into(), json!(search));
        }
      }
      Self::ProductModels { search, page } => {
        insert_page(&mut params, page);
        if let Some(search) = search.as_deref().map(normalize_search) {
          params.insert("search".into(), json!(search));
        }
      }
      Self::Product { id } | Self::ProductModel { id } => {
        params.insert("id".into(), json!(id));
      }
      Self::Comments { product_id, page } => {
        insert_page(&mut params, page);
        params.insert("productId".into(), json!(product_id));
      }
      Self::Tags { page } | Self::Sales { page } => insert_page(&mut params, page),
      Self::Cart => {}
    }
    Value::Object(params)
  }
}

impl QueryKey for ShopKey {
  type Family = Family;

  fn cache_hash(&self) -> String {
    // serde_json maps are ordered, so the params render canonically.
    let input = format!("{}:{}", self.method().path(), self.params());

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
  }

  fn description(&self) -> String {
    match self {
      Self::Products {
        product_model_id,
        search,
        page,
      } => {
        let mut desc = format!("products page {}", page.page);
        if let Some(id) = product_model_id {
          desc.push_str(&format!(" of model {}", id));
        }
        if let Some(s) = search {
          desc.push_str(&format!(" matching {:?}", s));
        }
        desc
      }
      Self::Product { id } => format!("product {}", id),
      Self::ProductModels { search, page } => match search {
        Some(s) => format!("product models page {} matching {:?}", page.page, s),
        None => format!("product models page {}", page.page),
      },
      Self::ProductModel { id } => format!("product model {}", id),
      Self::Comments { product_id, page } => {
        format!("comments on {} page {}", product_id, page.page)
      }
      Self::Tags { page } => format!("tags page {}", page.page),
      Self::Sales { page } => format!("sales page {}", page.page),
      Self::Cart => "cart".to_string(),
    }
  }

  fn family(&self) -> Family {
    match self {
      Self::Products { .. } | Self::Product { .. } => Family::Products,
      Self::ProductModels { .. } | Self::ProductModel { .. } => Family::ProductModels,
      Self::Comments { .. } => Family::Comments,
      Self::Tags { .. } => Family::Tags,
      Self::Sales { .. } => Family::Sales,
      Self::Cart => Family::Cart,
    }
  }
}

fn insert_page(params: &mut Map<String, Value>, page: &PageRequest) {
  let mut pagination = Map::new();
  pagination.insert("page".into(), json!(page.page));
  pagination.insert("limit".into(), json!(page.limit));
  if let Some(cursor) = &page.cursor {
    pagination.insert("cursor".into(), json!(cursor));
  }
  params.insert("pagination".into(), Value::Object(pagination));
}

/// Trims whitespace and lowercases for case-insensitive matching.
fn normalize_search(search: &str) -> String {
  search.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn products(search: Option<&str>, page: u32) -> ShopKey {
    ShopKey::Products {
      product_model_id: None,
      search: search.map(String::from),
      page: PageRequest::number(page, 20),
    }
  }

  #[test]
  fn test_search_is_normalized() {
    assert_eq!(
      products(Some("  Running Shoes "), 1).cache_hash(),
      products(Some("running shoes"), 1).cache_hash()
    );
  }

  #[test]
  fn test_different_pages_have_different_hashes() {
    assert_ne!(
      products(None, 1).cache_hash(),
      products(None, 2).cache_hash()
    );
  }

  #[test]
  fn test_same_params_on_different_methods_differ() {
    let product = ShopKey::Product { id: "1".into() };
    let model = ShopKey::ProductModel { id: "1".into() };
    assert_eq!(product.params(), model.params());
    assert_ne!(product.cache_hash(), model.cache_hash());
  }

  #[test]
  fn test_hash_is_hex_sha256() {
    let hash = ShopKey::Cart.cache_hash();
    assert_eq!(hash.len(), 64);
    assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn test_families() {
    assert_eq!(ShopKey::Product { id: "1".into() }.family(), Family::Products);
    assert_eq!(
      ShopKey::Comments {
        product_id: "1".into(),
        page: PageRequest::first(10)
      }
      .family(),
      Family::Comments
    );
    assert_eq!(ShopKey::Cart.family(), Family::Cart);
  }

  #[test]
  fn test_params_shape() {
    let key = ShopKey::Comments {
      product_id: "42".into(),
      page: PageRequest {
        page: 3,
        limit: 10,
        cursor: Some("tok".into()),
      },
    };
    assert_eq!(
      key.params(),
      json!({
        "productId": "42",
        "pagination": { "page": 3, "limit": 10, "cursor": "tok" }
      })
    );
  }
}
