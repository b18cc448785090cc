//! Typed access to the ShopNexus RPC API.

pub mod api_types;
pub mod client;
pub mod interceptor;
pub mod keys;
pub mod methods;
pub mod transport;
pub mod types;

pub use client::{shop_store, ShopClient, ShopStore};
pub use interceptor::AuthRedirect;
pub use keys::{Family, ShopKey};
pub use transport::{HttpTransport, MethodId, Transport};
