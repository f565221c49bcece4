use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ResourceError, SyncError};
use crate::model::id_key;
use crate::params::{HasParams, ParamMap};
use crate::resource::ResourceClient;

use super::{Method, SyncOptions, SyncTarget, Transport};

/// Transport wrapper that routes resource-tagged targets to their URL.
///
/// Untagged targets pass through with their original options. For tagged
/// ones the request URL is resolved before the wrapped transport runs; a
/// resolution failure means the wrapped transport is never called.
pub struct ResourceSync<T> {
    inner: T,
}

/// Wrap `inner` so resource-tagged requests carry their resolved URL.
pub fn resource_sync<T: Transport>(inner: T) -> ResourceSync<T> {
    ResourceSync::new(inner)
}

impl<T: Transport> ResourceSync<T> {
    pub fn new(inner: T) -> Self {
        ResourceSync { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for ResourceSync<T> {
    async fn sync(
        &self,
        method: Method,
        target: SyncTarget<'_>,
        options: SyncOptions,
    ) -> Result<Option<Value>, SyncError> {
        let (method, options) = resolve_request(method, &target, options)?;
        self.inner.sync(method, target, options).await
    }
}

/// Compute the method and options a resource-tagged request goes out with.
///
/// Returns the inputs unchanged when the target has no resource. Otherwise
/// `options.url` is set to the client base URL plus the resolved resource
/// path, and `create` becomes `update` for resources addressed without an id.
pub fn resolve_request(
    method: Method,
    target: &SyncTarget<'_>,
    options: SyncOptions,
) -> Result<(Method, SyncOptions), ResourceError> {
    let Some(resource) = resource_name(target) else {
        return Ok((method, options));
    };

    let client = resource_client(target).ok_or_else(|| ResourceError::NoResourceClient {
        type_name: target.type_name().to_string(),
        cid: target.as_model().map(|model| model.cid().to_string()),
    })?;
    let def = client.find_resource_def(&resource)?;

    let mut method = method;
    let mut entity_id = None;
    if let SyncTarget::Model(model) = target {
        let id_attribute = def
            .id_attribute
            .as_deref()
            .unwrap_or_else(|| model.id_attribute());
        if !id_attribute.is_empty() {
            entity_id = model.get(id_attribute).as_ref().and_then(id_key);
        } else if method == Method::Create {
            tracing::debug!(resource = %def.name, "resource has no id attribute, sending create as update");
            method = Method::Update;
        }
    }

    let url = client.url_for(def, &effective_params(target), entity_id.as_deref())?;
    tracing::debug!(resource = %def.name, %method, %url, "resolved resource url");

    Ok((
        method,
        SyncOptions {
            url: Some(url),
            ..options
        },
    ))
}

/// Own resource; a collection falls back to its member type's.
fn resource_name(target: &SyncTarget<'_>) -> Option<String> {
    match target {
        SyncTarget::Model(model) => model.kind().resource(),
        SyncTarget::Collection(collection) => collection
            .kind()
            .resource()
            .or_else(|| collection.model_type().resource()),
    }
    .map(str::to_string)
}

/// Own client, then the owning collection's, then the collection's member type's.
fn resource_client(target: &SyncTarget<'_>) -> Option<Arc<ResourceClient>> {
    match target {
        SyncTarget::Model(model) => model.kind().client().cloned().or_else(|| {
            model.collection().and_then(|collection| {
                collection
                    .kind()
                    .client()
                    .or_else(|| collection.model_type().client())
                    .cloned()
            })
        }),
        SyncTarget::Collection(collection) => collection
            .kind()
            .client()
            .or_else(|| collection.model_type().client())
            .cloned(),
    }
}

/// Collection params overlaid with the model's own.
fn effective_params(target: &SyncTarget<'_>) -> ParamMap {
    match target {
        SyncTarget::Model(model) => {
            let mut params = model
                .collection()
                .map(|collection| collection.params())
                .unwrap_or_default();
            params.extend(model.params());
            params
        }
        SyncTarget::Collection(collection) => collection.params(),
    }
}
