pub mod store;
pub mod cache;
pub mod sled_store;
pub mod factory;

pub use store::*;
pub use cache::*;
pub use sled_store::SledCacheBackend;
pub use factory::{create_cache_backend, create_cache_store};
