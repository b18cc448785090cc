//! Request cache for data fetched from the RPC API.
//!
//! This module provides an in-memory query store that:
//! - Memoizes results under strongly typed query keys
//! - Shares one in-flight fetch between concurrent identical queries
//! - Serves stale results while revalidating them in the background
//! - Invalidates whole resource families after a mutation
//! - Routes every failure through a single error hook

mod hooks;
mod storage;
mod store;
mod traits;

pub use hooks::{ErrorHook, Operation};
pub use storage::{CacheStorage, MemoryStorage, NoopStorage, StoredEntry};
pub use store::{QueryStore, StoreOptions};
pub use traits::{CacheResult, CacheSource, QueryKey};
