use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::event_emitter::{EventEmitter, ListenerId};
use crate::params::{HasParams, Params};
use crate::resource::ResourceClient;
use crate::sync::{Method, SyncOptions, SyncTarget, Transport};

use super::{id_key, json_kind, Lookup, Model, ModelType, SYNC_EVENT};

/// Static description of a kind of collection.
pub struct CollectionType {
    name: String,
    model: Arc<ModelType>,
    resource: Option<String>,
    client: Option<Arc<ResourceClient>>,
    transport: Option<Arc<dyn Transport>>,
}

impl CollectionType {
    pub fn new(name: impl Into<String>, model: Arc<ModelType>) -> Self {
        CollectionType {
            name: name.into(),
            model,
            resource: None,
            client: None,
            transport: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_client(mut self, client: Arc<ResourceClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Use a different transport than the member type's.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &Arc<ModelType> {
        &self.model
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn client(&self) -> Option<&Arc<ResourceClient>> {
        self.client.as_ref()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        self.transport
            .as_ref()
            .unwrap_or_else(|| self.model.transport())
    }
}

impl fmt::Debug for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionType")
            .field("name", &self.name)
            .field("model", &self.model.name())
            .field("resource", &self.resource)
            .finish()
    }
}

/// Members in insertion order, keyed by cid, plus the identity index.
#[derive(Default)]
struct Members {
    by_cid: IndexMap<String, Model>,
    by_id: HashMap<String, String>,
}

pub(crate) struct CollectionInner {
    kind: Arc<CollectionType>,
    members: RwLock<Members>,
    params: Params,
    events: EventEmitter,
}

/// An ordered set of models, unique by identity.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Collection {
    pub fn new(kind: &Arc<CollectionType>) -> Self {
        Collection {
            inner: Arc::new(CollectionInner {
                kind: Arc::clone(kind),
                members: RwLock::new(Members::default()),
                params: Params::new(),
                events: EventEmitter::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<CollectionInner>) -> Self {
        Collection { inner }
    }

    pub fn kind(&self) -> &Arc<CollectionType> {
        &self.inner.kind
    }

    pub fn type_name(&self) -> &str {
        self.inner.kind.name()
    }

    pub fn model_type(&self) -> &Arc<ModelType> {
        self.inner.kind.model()
    }

    pub fn len(&self) -> usize {
        self.members().by_cid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in insertion order.
    pub fn models(&self) -> Vec<Model> {
        self.members().by_cid.values().cloned().collect()
    }

    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Find a member by identity, attribute object, or model (identity first,
    /// then cid).
    pub fn get(&self, lookup: impl Into<Lookup>) -> Option<Model> {
        let lookup = lookup.into();
        let members = self.members();
        self.find_in(&members, &lookup)
    }

    pub fn contains(&self, model: &Model) -> bool {
        self.members()
            .by_cid
            .get(model.cid())
            .is_some_and(|member| member.ptr_eq(model))
    }

    /// Merge-insert. When a member with the same identity exists its
    /// attributes are updated in place and it is returned; otherwise the
    /// record is added.
    pub fn add(&self, lookup: impl Into<Lookup>) -> Model {
        let lookup = lookup.into();
        let candidate = self.prepare(&lookup);

        let existing = {
            let mut members = self
                .inner
                .members
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match self.find_in(&members, &lookup) {
                Some(existing) => Some(existing),
                None => {
                    if let Some(key) = candidate.id_key() {
                        members.by_id.insert(key, candidate.cid().to_string());
                    }
                    members
                        .by_cid
                        .insert(candidate.cid().to_string(), candidate.clone());
                    None
                }
            }
        };

        match existing {
            Some(existing) => {
                match &lookup {
                    Lookup::Model(model) if !model.ptr_eq(&existing) => {
                        existing.set(model.attributes())
                    }
                    Lookup::Attributes(attributes) => existing.set(attributes.clone()),
                    _ => {}
                }
                existing
            }
            None => {
                candidate.link_collection(&self.inner);
                candidate
            }
        }
    }

    pub fn remove(&self, lookup: impl Into<Lookup>) -> Option<Model> {
        let lookup = lookup.into();
        let removed = {
            let mut members = self
                .inner
                .members
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let model = self.find_in(&members, &lookup)?;
            members.by_cid.shift_remove(model.cid());
            members.by_id.retain(|_, cid| cid != model.cid());
            model
        };
        removed.unlink_collection(&self.inner);
        Some(removed)
    }

    /// Read the collection from the server and apply the response.
    ///
    /// The response must be an array of attribute objects. Members are
    /// merge-inserted; members missing from the response are dropped unless
    /// `options.remove` is `Some(false)`. Emits `sync` on success.
    pub async fn fetch(&self, options: SyncOptions) -> Result<(), SyncError> {
        let remove = options.remove.unwrap_or(true);
        let transport = Arc::clone(self.inner.kind.transport());
        let response = transport
            .sync(Method::Read, SyncTarget::Collection(self), options)
            .await?;
        self.apply_response(response, remove)?;
        self.inner.events.emit(SYNC_EVENT, self);
        Ok(())
    }

    pub fn on_sync<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Collection) + Send + Sync + 'static,
    {
        self.inner.events.on(SYNC_EVENT, move |data| {
            if let Some(collection) = data.downcast_ref::<Collection>() {
                listener(collection);
            }
        })
    }

    /// Observe the next `sync` only.
    pub fn once_sync<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Collection) + Send + Sync + 'static,
    {
        self.inner.events.once(SYNC_EVENT, move |data| {
            if let Some(collection) = data.downcast_ref::<Collection>() {
                listener(collection);
            }
        })
    }

    /// Emit `sync` without a fetch, for data loaded out of band.
    pub fn trigger_sync(&self) {
        self.inner.events.emit(SYNC_EVENT, self);
    }

    /// Update the identity index after `model` changed its id.
    ///
    /// If another member already holds the new id, `model` is folded into
    /// that member and leaves the collection.
    pub(crate) fn reindex(&self, model: &Model, previous: Option<&str>) {
        let survivor = {
            let mut members = self
                .inner
                .members
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if !members.by_cid.contains_key(model.cid()) {
                return;
            }
            if let Some(previous) = previous {
                if members.by_id.get(previous).map(String::as_str) == Some(model.cid()) {
                    members.by_id.remove(previous);
                }
            }
            let Some(key) = model.id_key() else {
                return;
            };
            let holder = members
                .by_id
                .get(&key)
                .filter(|cid| cid.as_str() != model.cid())
                .and_then(|cid| members.by_cid.get(cid))
                .cloned();
            match holder {
                Some(holder) => {
                    members.by_cid.shift_remove(model.cid());
                    Some(holder)
                }
                None => {
                    members.by_id.insert(key, model.cid().to_string());
                    None
                }
            }
        };

        if let Some(holder) = survivor {
            tracing::debug!(
                from = model.cid(),
                into = holder.cid(),
                "identity already held, merging members"
            );
            model.unlink_collection(&self.inner);
            holder.set(model.attributes());
        }
    }

    fn apply_response(&self, response: Option<Value>, remove: bool) -> Result<(), SyncError> {
        let items = match response {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(SyncError::InvalidResponse {
                    expected: "array",
                    found: json_kind(&other).to_string(),
                })
            }
        };

        let records = items
            .into_iter()
            .map(|item| match item {
                Value::Object(attributes) => Ok(attributes),
                other => Err(SyncError::InvalidResponse {
                    expected: "array of objects",
                    found: format!("array containing {}", json_kind(&other)),
                }),
            })
            .collect::<Result<Vec<Map<String, Value>>, SyncError>>()?;

        let mut kept = HashSet::with_capacity(records.len());
        for attributes in records {
            let model = self.add(Lookup::Attributes(attributes));
            kept.insert(model.cid().to_string());
        }

        if remove {
            for model in self.models() {
                if !kept.contains(model.cid()) {
                    self.remove(&model);
                }
            }
        }
        Ok(())
    }

    fn prepare(&self, lookup: &Lookup) -> Model {
        let kind = self.model_type();
        match lookup {
            Lookup::Model(model) => model.clone(),
            Lookup::Attributes(attributes) => Model::new(kind, attributes.clone()),
            Lookup::Id(id) => Model::with_id(kind, id.clone()),
        }
    }

    fn find_in(&self, members: &Members, lookup: &Lookup) -> Option<Model> {
        let by_id = |key: Option<String>| {
            key.and_then(|key| members.by_id.get(&key))
                .and_then(|cid| members.by_cid.get(cid))
                .cloned()
        };
        match lookup {
            Lookup::Id(id) => by_id(id_key(id)),
            Lookup::Attributes(attributes) => by_id(
                attributes
                    .get(self.model_type().id_attribute())
                    .and_then(id_key),
            ),
            Lookup::Model(model) => {
                by_id(model.id_key()).or_else(|| members.by_cid.get(model.cid()).cloned())
            }
        }
    }

    fn members(&self) -> RwLockReadGuard<'_, Members> {
        self.inner
            .members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl HasParams for Collection {
    fn param_store(&self) -> &Params {
        &self.inner.params
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("type", &self.inner.kind.name())
            .field("len", &self.len())
            .finish()
    }
}
