mod error;
mod event_emitter;
mod model;
mod params;
mod resource;
mod storage;
mod sync;

pub use error::{ResourceError, SyncError};
pub use event_emitter::{EventEmitter, ListenerId};
pub use model::{resource_model, Collection, CollectionType, Lookup, Model, ModelType};
pub use params::{HasParams, ParamChange, ParamMap, ParamValue, Params, ALL_PARAMS};
pub use resource::{
    build_resource_path, encode_component, find_resource_def, ParamDef, ParamLocation,
    PathTemplate, ResourceClient, ResourceDef,
};
pub use storage::Storage;
pub use sync::{
    resolve_request, resource_sync, Method, ResourceSync, SyncOptions, SyncTarget, Transport,
};

// Re-exported so transports can be written without a direct dependency.
pub use async_trait::async_trait;
