//! Terminal storefront and admin console for the ShopNexus RPC API.
//!
//! The interesting parts are the request layer: `rpc` (transport, typed
//! client, cache keys), `cache` (the query store) and `paging` (page
//! stitching over cursor and numbered pages). `app` and `ui` are the
//! terminal front end built on them.

pub mod app;
pub mod cache;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod event;
pub mod paging;
pub mod query;
pub mod route;
pub mod rpc;
pub mod ui;
