use std::fmt;

/// Failures raised while resolving a resource URL.
///
/// All of these are detected before the transport is invoked, so a request
/// is never issued for an invalid resource configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No definition with this name is registered on the client.
    ResourceNotFound { resource: String },
    /// A required path or query parameter has no value.
    MissingParam { param: String, resource: String },
    /// A resource-tagged model or collection has no client to resolve against.
    NoResourceClient {
        type_name: String,
        cid: Option<String>,
    },
    /// A client already holds a definition with this name.
    DuplicateResource { resource: String },
    /// A path template could not be compiled.
    InvalidTemplate { template: String, reason: String },
    /// A resource registry document could not be parsed.
    InvalidConfig(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::ResourceNotFound { resource } => {
                write!(f, "unable to find resource definition for {}", resource)
            }
            ResourceError::MissingParam { param, resource } => write!(
                f,
                "param {} is not defined for resource {}",
                param, resource
            ),
            ResourceError::NoResourceClient { type_name, cid } => match cid {
                Some(cid) => write!(f, "resource client not defined for {} ({})", type_name, cid),
                None => write!(f, "resource client not defined for {}", type_name),
            },
            ResourceError::DuplicateResource { resource } => {
                write!(f, "resource {} is already registered", resource)
            }
            ResourceError::InvalidTemplate { template, reason } => {
                write!(f, "invalid path template {:?}: {}", template, reason)
            }
            ResourceError::InvalidConfig(message) => {
                write!(f, "invalid resource configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Failures surfaced by fetch/save/destroy and by [`crate::Storage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// URL resolution failed; the transport was not called.
    Resource(ResourceError),
    /// The transport rejected the request. Opaque to this crate.
    Transport(String),
    /// The transport answered with a payload that cannot be applied.
    InvalidResponse {
        expected: &'static str,
        found: String,
    },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Resource(err) => write!(f, "resource error: {}", err),
            SyncError::Transport(message) => write!(f, "transport error: {}", message),
            SyncError::InvalidResponse { expected, found } => write!(
                f,
                "invalid sync response (expected {}, found {})",
                expected, found
            ),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for SyncError {
    fn from(err: ResourceError) -> Self {
        SyncError::Resource(err)
    }
}
