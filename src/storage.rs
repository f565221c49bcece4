//! Storage - a cache of every record of one type, fronting the server.
//!
//! ## Example
//!
//! ```ignore
//! use resource_state::{Storage, SyncOptions};
//!
//! let books = Storage::new(book_collection_type);
//!
//! let book = books.find(1, false).await?;          // fetched once, then cached
//! let all = books.find_all(SyncOptions::new(), false).await?;
//! books.save(json!({ "id": 1, "title": "Dune" }), SyncOptions::new()).await?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::SyncError;
use crate::model::{Collection, CollectionType, Lookup, Model, ModelType};
use crate::sync::SyncOptions;

/// Owns one collection of canonical records, at most one per identity.
///
/// Concurrent lookups of the same missing record are not coalesced: each
/// one fetches, and the merge-insert makes them converge on one record.
pub struct Storage {
    records: Collection,
    has_synced: Arc<AtomicBool>,
}

impl Storage {
    pub fn new(collection_type: Arc<CollectionType>) -> Self {
        let records = Collection::new(&collection_type);
        let has_synced = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&has_synced);
        records.once_sync(move |_| flag.store(true, Ordering::SeqCst));
        Storage {
            records,
            has_synced,
        }
    }

    /// Storage over a plain collection of `model_type`.
    pub fn for_model(model_type: Arc<ModelType>) -> Self {
        let name = format!("{}Collection", model_type.name());
        Storage::new(Arc::new(CollectionType::new(name, model_type)))
    }

    pub fn records(&self) -> &Collection {
        &self.records
    }

    pub fn model_type(&self) -> &Arc<ModelType> {
        self.records.model_type()
    }

    /// Whether the collection has completed a full fetch. Never resets.
    pub fn has_synced(&self) -> bool {
        self.has_synced.load(Ordering::SeqCst)
    }

    /// Return the cached record, or fetch it and insert it.
    pub async fn find(
        &self,
        lookup: impl Into<Lookup>,
        force_fetch: bool,
    ) -> Result<Model, SyncError> {
        let lookup = lookup.into();
        if let Some(record) = self.records.get(lookup.clone()) {
            if !force_fetch {
                tracing::debug!(cid = record.cid(), "storage hit");
                return Ok(record);
            }
        }

        let model = self.ensure_model(lookup);
        tracing::debug!(cid = model.cid(), force_fetch, "storage miss, fetching");
        model.fetch(SyncOptions::default()).await?;
        Ok(self.insert(model))
    }

    /// Return the whole collection, fetching it unless it has synced before.
    ///
    /// `options` go to the collection fetch verbatim.
    pub async fn find_all(
        &self,
        options: SyncOptions,
        force_fetch: bool,
    ) -> Result<Collection, SyncError> {
        if self.has_synced() && !force_fetch {
            tracing::debug!(collection = self.records.type_name(), "storage hit");
            return Ok(self.records.clone());
        }

        tracing::debug!(
            collection = self.records.type_name(),
            force_fetch,
            "fetching collection"
        );
        self.records.fetch(options).await?;
        Ok(self.records.clone())
    }

    /// Save a record, inserting it if it was not cached yet.
    ///
    /// When a cached record matches, it is the one saved; an attribute
    /// object or a distinct model passed in becomes the save payload.
    pub async fn save(
        &self,
        lookup: impl Into<Lookup>,
        options: SyncOptions,
    ) -> Result<Model, SyncError> {
        let lookup = lookup.into();
        let record = self.records.get(lookup.clone());

        let (model, attributes) = match &record {
            Some(record) => {
                let attributes = match &lookup {
                    Lookup::Model(model) if !model.ptr_eq(record) => Some(model.attributes()),
                    Lookup::Attributes(attributes) => Some(attributes.clone()),
                    _ => None,
                };
                (record.clone(), attributes)
            }
            None => (self.ensure_model(lookup), None),
        };

        model.save(attributes, options).await?;
        match record {
            // The response may have given it an id another record holds.
            Some(_) => Ok(self.records.get(&model).unwrap_or(model)),
            None => Ok(self.insert(model)),
        }
    }

    /// Merge-insert into the cache and return the canonical record.
    pub fn insert(&self, lookup: impl Into<Lookup>) -> Model {
        self.records.add(lookup)
    }

    /// A record of this store's type built from an id, attributes, or model.
    fn ensure_model(&self, lookup: Lookup) -> Model {
        let kind = self.model_type();
        match lookup {
            Lookup::Model(model) if Arc::ptr_eq(model.kind(), kind) => model,
            Lookup::Model(model) => Model::new(kind, model.attributes()),
            Lookup::Attributes(attributes) => Model::new(kind, attributes),
            Lookup::Id(id) => Model::with_id(kind, id),
        }
    }
}
