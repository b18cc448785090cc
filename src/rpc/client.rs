//! Typed ShopNexus client: reads go through the query store, writes invalidate it.

use std::sync::Arc;

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cache::{
  CacheResult, CacheStorage, ErrorHook, MemoryStorage, NoopStorage, QueryStore, StoreOptions,
};
use crate::error::ApiError;
use crate::paging::{Page, PageRequest, PageSource, PagedList};

use super::api_types::ApiListResponse;
use super::keys::{Family, ShopKey};
use super::methods;
use super::transport::{MethodId, Transport};
use super::types::{
  Cart, Comment, NewComment, NewProduct, NewProductModel, NewSale, NewTag, Product, ProductModel,
  Sale, Tag,
};

/// Query store keyed by ShopNexus reads; the backend is picked at startup.
pub type ShopStore = QueryStore<ShopKey, Box<dyn CacheStorage<Family>>>;

/// Build the store. With caching disabled nothing is memoized, but
/// identical concurrent reads still share one call.
pub fn shop_store(
  enabled: bool,
  options: StoreOptions,
  hook: Option<Arc<dyn ErrorHook>>,
) -> ShopStore {
  let storage: Box<dyn CacheStorage<Family>> = if enabled {
    Box::new(MemoryStorage::new())
  } else {
    Box::new(NoopStorage)
  };
  QueryStore::with_storage(storage, options, hook)
}

/// ShopNexus API client.
///
/// Cloning is cheap; clones share the transport and the store.
pub struct ShopClient<T: Transport> {
  transport: Arc<T>,
  store: ShopStore,
  page_size: u32,
}

impl<T: Transport> Clone for ShopClient<T> {
  fn clone(&self) -> Self {
    Self {
      transport: Arc::clone(&self.transport),
      store: self.store.clone(),
      page_size: self.page_size,
    }
  }
}

impl<T: Transport> ShopClient<T> {
  pub fn new(transport: Arc<T>, store: ShopStore, page_size: u32) -> Self {
    Self {
      transport,
      store,
      page_size: page_size.max(1),
    }
  }

  pub fn store(&self) -> &ShopStore {
    &self.store
  }

  pub fn page_size(&self) -> u32 {
    self.page_size
  }

  /// Drop memoized reads of a family; open lists start over on next access.
  pub fn invalidate(&self, family: Family) {
    self.store.invalidate(family);
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub async fn list_products(
    &self,
    product_model_id: Option<String>,
    search: Option<String>,
    page: PageRequest,
  ) -> Result<CacheResult<Page<Product>>, ApiError> {
    self
      .read_page(ShopKey::Products {
        product_model_id,
        search,
        page,
      })
      .await
  }

  pub async fn get_product(&self, id: &str) -> Result<CacheResult<Product>, ApiError> {
    self.read(ShopKey::Product { id: id.to_string() }).await
  }

  pub async fn list_product_models(
    &self,
    search: Option<String>,
    page: PageRequest,
  ) -> Result<CacheResult<Page<ProductModel>>, ApiError> {
    self.read_page(ShopKey::ProductModels { search, page }).await
  }

  pub async fn get_product_model(&self, id: &str) -> Result<CacheResult<ProductModel>, ApiError> {
    self.read(ShopKey::ProductModel { id: id.to_string() }).await
  }

  pub async fn list_comments(
    &self,
    product_id: &str,
    page: PageRequest,
  ) -> Result<CacheResult<Page<Comment>>, ApiError> {
    self
      .read_page(ShopKey::Comments {
        product_id: product_id.to_string(),
        page,
      })
      .await
  }

  pub async fn list_tags(&self, page: PageRequest) -> Result<CacheResult<Page<Tag>>, ApiError> {
    self.read_page(ShopKey::Tags { page }).await
  }

  pub async fn list_sales(&self, page: PageRequest) -> Result<CacheResult<Page<Sale>>, ApiError> {
    self.read_page(ShopKey::Sales { page }).await
  }

  pub async fn get_cart(&self) -> Result<CacheResult<Cart>, ApiError> {
    self.read(ShopKey::Cart).await
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  pub async fn create_product_model(
    &self,
    model: &NewProductModel,
  ) -> Result<ProductModel, ApiError> {
    self
      .write(Family::ProductModels, methods::CREATE_PRODUCT_MODEL, to_params(model)?)
      .await
  }

  pub async fn update_product_model(
    &self,
    id: &str,
    model: &NewProductModel,
  ) -> Result<ProductModel, ApiError> {
    let mut params = to_params(model)?;
    if let Value::Object(map) = &mut params {
      map.insert("id".into(), json!(id));
    }
    self
      .write(Family::ProductModels, methods::UPDATE_PRODUCT_MODEL, params)
      .await
  }

  /// Deleting a model also removes its products.
  pub async fn delete_product_model(&self, id: &str) -> Result<(), ApiError> {
    self
      .write::<IgnoredAny>(
        Family::ProductModels,
        methods::DELETE_PRODUCT_MODEL,
        json!({ "id": id }),
      )
      .await?;
    self.store.invalidate(Family::Products);
    Ok(())
  }

  pub async fn create_product(&self, product: &NewProduct) -> Result<Product, ApiError> {
    self
      .write(Family::Products, methods::CREATE_PRODUCT, to_params(product)?)
      .await
  }

  pub async fn delete_product(&self, id: &str) -> Result<(), ApiError> {
    self
      .write::<IgnoredAny>(Family::Products, methods::DELETE_PRODUCT, json!({ "id": id }))
      .await
      .map(|_| ())
  }

  pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment, ApiError> {
    self
      .write(Family::Comments, methods::CREATE_COMMENT, to_params(comment)?)
      .await
  }

  pub async fn delete_comment(&self, id: &str) -> Result<(), ApiError> {
    self
      .write::<IgnoredAny>(Family::Comments, methods::DELETE_COMMENT, json!({ "id": id }))
      .await
      .map(|_| ())
  }

  pub async fn create_tag(&self, tag: &NewTag) -> Result<Tag, ApiError> {
    self
      .write(Family::Tags, methods::CREATE_TAG, to_params(tag)?)
      .await
  }

  pub async fn delete_tag(&self, tag: &str) -> Result<(), ApiError> {
    self
      .write::<IgnoredAny>(Family::Tags, methods::DELETE_TAG, json!({ "tag": tag }))
      .await
      .map(|_| ())
  }

  pub async fn create_sale(&self, sale: &NewSale) -> Result<Sale, ApiError> {
    self
      .write(Family::Sales, methods::CREATE_SALE, to_params(sale)?)
      .await
  }

  pub async fn delete_sale(&self, id: &str) -> Result<(), ApiError> {
    self
      .write::<IgnoredAny>(Family::Sales, methods::DELETE_SALE, json!({ "id": id }))
      .await
      .map(|_| ())
  }

  pub async fn add_to_cart(&self, product_id: &str, quantity: u64) -> Result<(), ApiError> {
    self
      .write::<IgnoredAny>(
        Family::Cart,
        methods::ADD_CART_ITEM,
        json!({ "productId": product_id, "quantity": quantity.to_string() }),
      )
      .await
      .map(|_| ())
  }

  pub async fn remove_from_cart(&self, product_id: &str) -> Result<(), ApiError> {
    self
      .write::<IgnoredAny>(
        Family::Cart,
        methods::REMOVE_CART_ITEM,
        json!({ "productId": product_id }),
      )
      .await
      .map(|_| ())
  }

  // ==========================================================================
  // Paginated lists
  // ==========================================================================

  pub fn product_pages(
    &self,
    product_model_id: Option<String>,
    search: Option<String>,
  ) -> PagedList<Product, impl PageSource<Product>> {
    let client = self.clone();
    let source = move |page: PageRequest| {
      let client = client.clone();
      let key = ShopKey::Products {
        product_model_id: product_model_id.clone(),
        search: search.clone(),
        page,
      };
      async move { client.read_page(key).await.map(|r| r.data) }
    };
    self.pager(Family::Products, source)
  }

  pub fn product_model_pages(
    &self,
    search: Option<String>,
  ) -> PagedList<ProductModel, impl PageSource<ProductModel>> {
    let client = self.clone();
    let source = move |page: PageRequest| {
      let client = client.clone();
      let key = ShopKey::ProductModels {
        search: search.clone(),
        page,
      };
      async move { client.read_page(key).await.map(|r| r.data) }
    };
    self.pager(Family::ProductModels, source)
  }

  pub fn comment_pages(&self, product_id: &str) -> PagedList<Comment, impl PageSource<Comment>> {
    let client = self.clone();
    let product_id = product_id.to_string();
    let source = move |page: PageRequest| {
      let client = client.clone();
      let key = ShopKey::Comments {
        product_id: product_id.clone(),
        page,
      };
      async move { client.read_page(key).await.map(|r| r.data) }
    };
    self.pager(Family::Comments, source)
  }

  pub fn tag_pages(&self) -> PagedList<Tag, impl PageSource<Tag>> {
    let client = self.clone();
    let source = move |page: PageRequest| {
      let client = client.clone();
      async move {
        client
          .read_page(ShopKey::Tags { page })
          .await
          .map(|r| r.data)
      }
    };
    self.pager(Family::Tags, source)
  }

  pub fn sale_pages(&self) -> PagedList<Sale, impl PageSource<Sale>> {
    let client = self.clone();
    let source = move |page: PageRequest| {
      let client = client.clone();
      async move {
        client
          .read_page(ShopKey::Sales { page })
          .await
          .map(|r| r.data)
      }
    };
    self.pager(Family::Sales, source)
  }

  fn pager<R, P: PageSource<R>>(&self, family: Family, source: P) -> PagedList<R, P> {
    PagedList::new(source, self.page_size).invalidated_by(self.store.subscribe(family))
  }

  // ==========================================================================
  // Plumbing
  // ==========================================================================

  async fn read<R>(&self, key: ShopKey) -> Result<CacheResult<R>, ApiError>
  where
    R: Serialize + DeserializeOwned + Send + 'static,
  {
    let transport = Arc::clone(&self.transport);
    let method = key.method();
    let params = key.params();

    self
      .store
      .query(&key, move || async move {
        let value = transport.call(method, params).await?;
        serde_json::from_value::<R>(value).map_err(ApiError::decode)
      })
      .await
  }

  async fn read_page<R>(&self, key: ShopKey) -> Result<CacheResult<Page<R>>, ApiError>
  where
    R: Serialize + DeserializeOwned + Send + 'static,
  {
    let transport = Arc::clone(&self.transport);
    let method = key.method();
    let params = key.params();

    self
      .store
      .query(&key, move || async move {
        let value = transport.call(method, params).await?;
        let response: ApiListResponse<R> =
          serde_json::from_value(value).map_err(ApiError::decode)?;
        Ok(response.into_page())
      })
      .await
  }

  async fn write<R>(&self, family: Family, method: MethodId, params: Value) -> Result<R, ApiError>
  where
    R: DeserializeOwned,
  {
    self
      .store
      .mutate(family, || async {
        let value = self.transport.call(method, params).await?;
        serde_json::from_value::<R>(value).map_err(ApiError::decode)
      })
      .await
  }
}

fn to_params(payload: &impl Serialize) -> Result<Value, ApiError> {
  serde_json::to_value(payload).map_err(ApiError::decode)
}
