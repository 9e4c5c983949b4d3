use std::{collections::HashMap, sync::Arc};

use crate::{Error, IndexHandle, Result, qdrant::QdrantIndex};

#[derive(Clone)]
pub struct RegisteredIndex {
	pub handle: Arc<dyn IndexHandle>,
	pub top_k: u32,
}

/// Process-wide set of index handles, built once at startup and shared read-only.
#[derive(Clone, Default)]
pub struct IndexRegistry {
	indexes: HashMap<String, RegisteredIndex>,
}
impl IndexRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Connects one Qdrant-backed handle per configured index.
	pub fn from_config(cfg: &aila_config::Config) -> Result<Self> {
		let client = Arc::new(crate::qdrant::connect(&cfg.storage.qdrant)?);
		let mut registry = Self::new();

		for index in &cfg.indexes {
			let handle = QdrantIndex::new(client.clone(), index);

			registry.insert(index.name.clone(), index.top_k, Arc::new(handle))?;
		}

		tracing::info!(indexes = registry.len(), "Index registry loaded.");

		Ok(registry)
	}

	pub fn insert(
		&mut self,
		name: impl Into<String>,
		top_k: u32,
		handle: Arc<dyn IndexHandle>,
	) -> Result<()> {
		let name = name.into();

		if top_k == 0 {
			return Err(Error::InvalidArgument(format!("Index {name} top_k must be positive.")));
		}
		if self.indexes.contains_key(&name) {
			return Err(Error::InvalidArgument(format!("Index {name} is already registered.")));
		}

		self.indexes.insert(name, RegisteredIndex { handle, top_k });

		Ok(())
	}

	pub fn get(&self, name: &str) -> Result<&RegisteredIndex> {
		self.indexes.get(name).ok_or_else(|| Error::UnknownIndex(name.to_string()))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.indexes.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.indexes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.indexes.is_empty()
	}

	/// Fails with the first name in `required` that has no registered handle.
	pub fn ensure_covers<'a>(&self, required: impl IntoIterator<Item = &'a str>) -> Result<()> {
		for name in required {
			if !self.contains(name) {
				return Err(Error::UnknownIndex(name.to_string()));
			}
		}

		Ok(())
	}
}
