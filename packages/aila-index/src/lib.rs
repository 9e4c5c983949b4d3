pub mod qdrant;
pub mod registry;

mod error;

pub use error::Error;
pub use registry::{IndexRegistry, RegisteredIndex};

use std::{future::Future, pin::Pin};

use aila_domain::document::IndexHit;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only handle over one pre-built retrieval index.
pub trait IndexHandle
where
	Self: Send + Sync,
{
	/// Returns up to `k` hits ordered by the index's own similarity.
	fn retrieve<'a>(&'a self, query: &'a str, k: u32) -> BoxFuture<'a, Result<Vec<IndexHit>>>;
}
