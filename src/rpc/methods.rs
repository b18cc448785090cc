//! Method identifiers of the ShopNexus services.

use super::transport::MethodId;

const PRODUCT: &str = "shopnexus.product.v1.ProductService";
const COMMENT: &str = "shopnexus.product.v1.CommentService";
const SALE: &str = "shopnexus.product.v1.SaleService";
const CART: &str = "shopnexus.payment.v1.CartService";

pub const LIST_PRODUCTS: MethodId = MethodId::new(PRODUCT, "ListProducts");
pub const GET_PRODUCT: MethodId = MethodId::new(PRODUCT, "GetProduct");
pub const CREATE_PRODUCT: MethodId = MethodId::new(PRODUCT, "CreateProduct");
pub const DELETE_PRODUCT: MethodId = MethodId::new(PRODUCT, "DeleteProduct");

pub const LIST_PRODUCT_MODELS: MethodId = MethodId::new(PRODUCT, "ListProductModels");
pub const GET_PRODUCT_MODEL: MethodId = MethodId::new(PRODUCT, "GetProductModel");
pub const CREATE_PRODUCT_MODEL: MethodId = MethodId::new(PRODUCT, "CreateProductModel");
pub const UPDATE_PRODUCT_MODEL: MethodId = MethodId::new(PRODUCT, "UpdateProductModel");
pub const DELETE_PRODUCT_MODEL: MethodId = MethodId::new(PRODUCT, "DeleteProductModel");

pub const LIST_TAGS: MethodId = MethodId::new(PRODUCT, "ListTags");
pub const CREATE_TAG: MethodId = MethodId::new(PRODUCT, "CreateTag");
pub const DELETE_TAG: MethodId = MethodId::new(PRODUCT, "DeleteTag");

pub const LIST_COMMENTS: MethodId = MethodId::new(COMMENT, "ListComments");
pub const CREATE_COMMENT: MethodId = MethodId::new(COMMENT, "CreateComment");
pub const DELETE_COMMENT: MethodId = MethodId::new(COMMENT, "DeleteComment");

pub const LIST_SALES: MethodId = MethodId::new(SALE, "ListSales");
pub const CREATE_SALE: MethodId = MethodId::new(SALE, "CreateSale");
pub const DELETE_SALE: MethodId = MethodId::new(SALE, "DeleteSale");

pub const GET_CART: MethodId = MethodId::new(CART, "GetCart");
pub const ADD_CART_ITEM: MethodId = MethodId::new(CART, "AddCartItem");
pub const REMOVE_CART_ITEM: MethodId = MethodId::new(CART, "RemoveCartItem");
