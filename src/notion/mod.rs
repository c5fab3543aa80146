//! Notion integration.
//!
//! - [`serializer`] - element tree to block payloads, batching
//! - [`store`] - the [`RemoteStore`] trait and remote error taxonomy
//! - [`client`] - HTTP implementation of the store
//! - [`rate_limit`] - leaky-bucket limiter shared by all calls
//! - [`retry`] - backoff policy applied uniformly to every call

pub mod client;
pub mod rate_limit;
pub mod retry;
pub mod serializer;
pub mod store;

#[cfg(test)]
pub mod testing;

pub use client::NotionClient;
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use serializer::{
    serialize_blocks, serialize_document, RemoteBlock, SerializeOptions, Serialized,
    MAX_BATCH_SIZE,
};
pub use store::{
    ChildBlock, ChildrenPage, Operation, Parent, ParentKind, RemoteStore, StoreError, StoreResult,
};
