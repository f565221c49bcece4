//! Models - attribute-bearing records and the collections that index them.
//!
//! Resource tagging is plain configuration on a type descriptor rather than
//! inheritance: a [`ModelType`] names its identity attribute, its resource,
//! its [`ResourceClient`](crate::ResourceClient) and the transport that
//! performs requests. [`Model`] and [`Collection`] are cheap, shared
//! handles; cloning one yields the same record.
//!
//! ## Example
//!
//! ```ignore
//! use resource_state::{Model, ModelType, resource_model};
//!
//! let patients = resource_model("Patient", "patient", client, transport);
//! let patient = Model::with_id(&patients, 1);
//! patient.fetch(Default::default()).await?;
//! ```

mod collection;
mod lookup;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, Weak};

use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::event_emitter::{EventEmitter, ListenerId};
use crate::params::{HasParams, Params};
use crate::resource::ResourceClient;
use crate::sync::{Method, SyncOptions, SyncTarget, Transport};

pub use collection::{Collection, CollectionType};
pub use lookup::Lookup;

pub(crate) use collection::CollectionInner;
pub(crate) use lookup::id_key;

pub(crate) const SYNC_EVENT: &str = "sync";

static NEXT_CID: AtomicU64 = AtomicU64::new(1);

fn next_cid() -> String {
    format!("c{}", NEXT_CID.fetch_add(1, Ordering::Relaxed))
}

/// Static description of a kind of model.
pub struct ModelType {
    name: String,
    id_attribute: String,
    resource: Option<String>,
    client: Option<Arc<ResourceClient>>,
    transport: Arc<dyn Transport>,
}

impl ModelType {
    pub fn new(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        ModelType {
            name: name.into(),
            id_attribute: "id".to_string(),
            resource: None,
            client: None,
            transport,
        }
    }

    pub fn with_id_attribute(mut self, id_attribute: impl Into<String>) -> Self {
        self.id_attribute = id_attribute.into();
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_client(mut self, client: Arc<ResourceClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn client(&self) -> Option<&Arc<ResourceClient>> {
        self.client.as_ref()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("id_attribute", &self.id_attribute)
            .field("resource", &self.resource)
            .field("client", &self.client.as_ref().map(|c| &c.base_url))
            .finish()
    }
}

/// A model type tagged with a resource and the client that serves it.
pub fn resource_model(
    name: impl Into<String>,
    resource: impl Into<String>,
    client: Arc<ResourceClient>,
    transport: Arc<dyn Transport>,
) -> Arc<ModelType> {
    Arc::new(
        ModelType::new(name, transport)
            .with_resource(resource)
            .with_client(client),
    )
}

struct ModelInner {
    cid: String,
    kind: Arc<ModelType>,
    attributes: RwLock<Map<String, Value>>,
    collection: RwLock<Weak<CollectionInner>>,
    params: Params,
    events: EventEmitter,
}

/// A shared handle to one record.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    pub fn new(kind: &Arc<ModelType>, attributes: Map<String, Value>) -> Self {
        Model {
            inner: Arc::new(ModelInner {
                cid: next_cid(),
                kind: Arc::clone(kind),
                attributes: RwLock::new(attributes),
                collection: RwLock::new(Weak::new()),
                params: Params::new(),
                events: EventEmitter::new(),
            }),
        }
    }

    /// A model holding only its identity attribute.
    pub fn with_id(kind: &Arc<ModelType>, id: impl Into<Value>) -> Self {
        let mut attributes = Map::new();
        attributes.insert(kind.id_attribute().to_string(), id.into());
        Model::new(kind, attributes)
    }

    /// Build from a JSON value; non-object values yield an empty model.
    pub fn from_value(kind: &Arc<ModelType>, value: Value) -> Self {
        match value {
            Value::Object(attributes) => Model::new(kind, attributes),
            _ => Model::new(kind, Map::new()),
        }
    }

    /// Client-side instance id, unique per process.
    pub fn cid(&self) -> &str {
        &self.inner.cid
    }

    pub fn kind(&self) -> &Arc<ModelType> {
        &self.inner.kind
    }

    pub fn type_name(&self) -> &str {
        self.inner.kind.name()
    }

    pub fn id_attribute(&self) -> &str {
        self.inner.kind.id_attribute()
    }

    pub fn id(&self) -> Option<Value> {
        self.get(self.id_attribute()).filter(|id| !id.is_null())
    }

    pub(crate) fn id_key(&self) -> Option<String> {
        self.id().as_ref().and_then(id_key)
    }

    /// True until the record has an identity.
    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    pub fn get(&self, attribute: &str) -> Option<Value> {
        self.attrs().get(attribute).cloned()
    }

    pub fn attributes(&self) -> Map<String, Value> {
        self.attrs().clone()
    }

    /// Merge `attributes` into the record.
    ///
    /// An identity change is propagated to the owning collection's index.
    pub fn set(&self, attributes: Map<String, Value>) {
        if attributes.is_empty() {
            return;
        }
        let previous = self.id_key();
        self.inner
            .attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(attributes);

        if previous != self.id_key() {
            if let Some(collection) = self.collection() {
                collection.reindex(self, previous.as_deref());
            }
        }
    }

    pub fn set_attr(&self, attribute: impl Into<String>, value: impl Into<Value>) {
        let mut attributes = Map::new();
        attributes.insert(attribute.into(), value.into());
        self.set(attributes);
    }

    /// The collection this model belongs to, if it is still alive.
    pub fn collection(&self) -> Option<Collection> {
        self.inner
            .collection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
            .map(Collection::from_inner)
    }

    pub(crate) fn link_collection(&self, collection: &Arc<CollectionInner>) {
        let mut link = self
            .inner
            .collection
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if link.upgrade().is_none() {
            *link = Arc::downgrade(collection);
        }
    }

    pub(crate) fn unlink_collection(&self, collection: &Arc<CollectionInner>) {
        let mut link = self
            .inner
            .collection
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if std::ptr::eq(link.as_ptr(), Arc::as_ptr(collection)) {
            *link = Weak::new();
        }
    }

    /// Same record, not merely equal attributes.
    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read the record from the server and merge the response.
    pub async fn fetch(&self, options: SyncOptions) -> Result<(), SyncError> {
        let transport = Arc::clone(self.kind().transport());
        let response = transport
            .sync(Method::Read, SyncTarget::Model(self), options)
            .await?;
        self.apply_response(response)?;
        self.inner.events.emit(SYNC_EVENT, self);
        Ok(())
    }

    /// Merge `attributes` (if any), then create or update the record remotely.
    pub async fn save(
        &self,
        attributes: Option<Map<String, Value>>,
        options: SyncOptions,
    ) -> Result<(), SyncError> {
        if let Some(attributes) = attributes {
            self.set(attributes);
        }
        let method = if self.is_new() {
            Method::Create
        } else if options.patch {
            Method::Patch
        } else {
            Method::Update
        };

        let transport = Arc::clone(self.kind().transport());
        let response = transport.sync(method, SyncTarget::Model(self), options).await?;
        self.apply_response(response)?;
        self.inner.events.emit(SYNC_EVENT, self);
        Ok(())
    }

    /// Delete the record remotely (unless it was never saved) and drop it
    /// from its collection.
    pub async fn destroy(&self, options: SyncOptions) -> Result<(), SyncError> {
        if !self.is_new() {
            let transport = Arc::clone(self.kind().transport());
            transport
                .sync(Method::Delete, SyncTarget::Model(self), options)
                .await?;
        }
        if let Some(collection) = self.collection() {
            collection.remove(self);
        }
        Ok(())
    }

    pub fn on_sync<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Model) + Send + Sync + 'static,
    {
        self.inner.events.on(SYNC_EVENT, move |data| {
            if let Some(model) = data.downcast_ref::<Model>() {
                listener(model);
            }
        })
    }

    pub fn once_sync<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Model) + Send + Sync + 'static,
    {
        self.inner.events.once(SYNC_EVENT, move |data| {
            if let Some(model) = data.downcast_ref::<Model>() {
                listener(model);
            }
        })
    }

    fn apply_response(&self, response: Option<Value>) -> Result<(), SyncError> {
        match response {
            None | Some(Value::Null) => Ok(()),
            Some(Value::Object(attributes)) => {
                self.set(attributes);
                Ok(())
            }
            Some(other) => Err(SyncError::InvalidResponse {
                expected: "object",
                found: json_kind(&other).to_string(),
            }),
        }
    }

    fn attrs(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.inner
            .attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl HasParams for Model {
    fn param_store(&self) -> &Params {
        &self.inner.params
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("cid", &self.inner.cid)
            .field("type", &self.inner.kind.name())
            .field("attributes", &*self.attrs())
            .finish()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
