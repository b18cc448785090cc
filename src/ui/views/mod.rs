mod cart;
mod list;
mod login;
mod product_detail;
mod rows;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::app::Client;
use crate::credentials::LocalStorage;
use crate::error::ApiError;
use crate::route::Route;
use crate::rpc::types::{Comment, Product, ProductModel};
use crate::rpc::Family;
use crate::ui::view::View;

use cart::CartView;
use list::ListView;
use login::LoginView;
use product_detail::ProductDetailView;

/// Build the root view for a location.
pub fn for_route(route: &Route, client: &Client, storage: &Arc<LocalStorage>) -> Box<dyn View> {
  let path = route.path();
  match route {
    Route::Catalog => {
      let pages = client.clone();
      Box::new(
        ListView::new("Products", path, client.clone(), Family::Products, move |search| {
          pages.product_pages(None, search)
        })
        .searchable()
        .on_open(open_product),
      )
    }
    Route::ProductDetail { id } => product_detail(id, client),
    Route::Cart => Box::new(CartView::new(client.clone())),
    Route::Login | Route::AdminLogin => {
      Box::new(LoginView::new(route.clone(), Arc::clone(storage)))
    }
    Route::AdminProducts => {
      let pages = client.clone();
      Box::new(
        ListView::new("Products", path, client.clone(), Family::Products, move |search| {
          pages.product_pages(None, search)
        })
        .searchable()
        .on_open(open_product)
        .on_delete(delete_product),
      )
    }
    Route::AdminProductModels => {
      let pages = client.clone();
      Box::new(
        ListView::new(
          "Product models",
          path,
          client.clone(),
          Family::ProductModels,
          move |search| pages.product_model_pages(search),
        )
        .searchable()
        .on_open(open_model_products)
        .on_delete(delete_product_model),
      )
    }
    Route::AdminComments => {
      // Comments are listed per product: pick the product first
      let pages = client.clone();
      Box::new(
        ListView::new(
          "Comments: pick a product",
          path,
          client.clone(),
          Family::Products,
          move |search| pages.product_pages(None, search),
        )
        .searchable()
        .on_open(open_product_comments),
      )
    }
    Route::AdminTags => {
      let pages = client.clone();
      Box::new(
        ListView::new("Tags", path, client.clone(), Family::Tags, move |_| pages.tag_pages())
          .on_delete(delete_tag),
      )
    }
    Route::AdminSales => {
      let pages = client.clone();
      Box::new(
        ListView::new("Sales", path, client.clone(), Family::Sales, move |_| pages.sale_pages())
          .on_delete(delete_sale),
      )
    }
  }
}

fn product_detail(id: &str, client: &Client) -> Box<dyn View> {
  Box::new(ProductDetailView::with_comments(
    id.to_string(),
    client.clone(),
    client.comment_pages(id),
  ))
}

fn open_product(client: &Client, product: &Product) -> Box<dyn View> {
  product_detail(&product.id, client)
}

fn open_model_products(client: &Client, model: &ProductModel) -> Box<dyn View> {
  let pages = client.clone();
  let model_id = model.id.clone();
  Box::new(
    ListView::new(
      "Variants",
      Route::AdminProductModels.path(),
      client.clone(),
      Family::Products,
      move |search| pages.product_pages(Some(model_id.clone()), search),
    )
    .searchable()
    .on_open(open_product)
    .on_delete(delete_product),
  )
}

fn open_product_comments(client: &Client, product: &Product) -> Box<dyn View> {
  let pages = client.clone();
  let product_id = product.id.clone();
  Box::new(
    ListView::<Comment, _>::new(
      "Comments",
      Route::AdminComments.path(),
      client.clone(),
      Family::Comments,
      move |_| pages.comment_pages(&product_id),
    )
    .on_delete(delete_comment),
  )
}

fn delete_product(client: Client, id: String) -> BoxFuture<'static, Result<(), ApiError>> {
  Box::pin(async move { client.delete_product(&id).await })
}

fn delete_product_model(client: Client, id: String) -> BoxFuture<'static, Result<(), ApiError>> {
  Box::pin(async move { client.delete_product_model(&id).await })
}

fn delete_comment(client: Client, id: String) -> BoxFuture<'static, Result<(), ApiError>> {
  Box::pin(async move { client.delete_comment(&id).await })
}

fn delete_tag(client: Client, tag: String) -> BoxFuture<'static, Result<(), ApiError>> {
  Box::pin(async move { client.delete_tag(&tag).await })
}

fn delete_sale(client: Client, id: String) -> BoxFuture<'static, Result<(), ApiError>> {
  Box::pin(async move { client.delete_sale(&id).await })
}
