//! Sync - the seam between records and the network.
//!
//! A [`Transport`] performs one request for a model or collection. The
//! application supplies the real one; [`ResourceSync`] wraps any transport
//! and fills in the request URL for resource-tagged targets.

mod resource_sync;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::model::{Collection, Model};

pub use resource_sync::{resolve_request, resource_sync, ResourceSync};

/// The operation a request performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Create,
    Read,
    Update,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Create => "create",
            Method::Read => "read",
            Method::Update => "update",
            Method::Patch => "patch",
            Method::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request options handed to the transport.
///
/// `url` is filled in by [`ResourceSync`]; the rest passes through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncOptions {
    pub url: Option<String>,
    /// Request data, e.g. filter or sort directives for a collection read.
    pub data: Option<Value>,
    /// Send a partial update instead of a full one.
    pub patch: bool,
    /// Whether a collection fetch drops members missing from the response.
    /// Defaults to `true`.
    pub remove: Option<bool>,
    /// Transport-specific settings.
    pub extra: Map<String, Value>,
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// What a request is about.
#[derive(Debug, Clone, Copy)]
pub enum SyncTarget<'a> {
    Model(&'a Model),
    Collection(&'a Collection),
}

impl SyncTarget<'_> {
    pub fn type_name(&self) -> &str {
        match self {
            SyncTarget::Model(model) => model.type_name(),
            SyncTarget::Collection(collection) => collection.type_name(),
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            SyncTarget::Model(model) => Some(model),
            SyncTarget::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            SyncTarget::Collection(collection) => Some(collection),
            SyncTarget::Model(_) => None,
        }
    }
}

/// Performs a request. Returns the response payload, if any.
///
/// Models expect an attribute object back, collections an array of them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn sync(
        &self,
        method: Method,
        target: SyncTarget<'_>,
        options: SyncOptions,
    ) -> Result<Option<Value>, SyncError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn sync(
        &self,
        method: Method,
        target: SyncTarget<'_>,
        options: SyncOptions,
    ) -> Result<Option<Value>, SyncError> {
        (**self).sync(method, target, options).await
    }
}
