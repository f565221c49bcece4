//! Resources - named, parameterized REST endpoints and the clients that serve them.
//!
//! A [`ResourceClient`] is a base URL plus a registry of [`ResourceDef`]s.
//! Registries are usually loaded from configuration:
//!
//! ```ignore
//! use resource_state::ResourceClient;
//!
//! let client = ResourceClient::from_json(r#"{
//!     "baseUrl": "http://base/",
//!     "resourceDefs": [
//!         { "name": "patient", "path": "patients",
//!           "params": [{ "name": "registry", "location": "query" }] },
//!         { "name": "patientevaluation", "path": "patients/:patientid/evaluations",
//!           "params": [{ "name": "patientid" }], "idAttribute": "date" }
//!     ]
//! }"#)?;
//!
//! let def = client.find_resource_def("patient")?;
//! ```

mod encode;
mod path;
mod template;

use serde::{Deserialize, Serialize};

use crate::error::ResourceError;
use crate::params::ParamMap;

pub use encode::encode_component;
pub use path::build_resource_path;
pub use template::PathTemplate;

/// Where a parameter ends up in the request URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    #[default]
    Path,
    Query,
}

/// Declaration of one resource parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(default)]
    pub location: ParamLocation,
    /// Explicit required-ness. When unset, path params are required and
    /// query params are optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl ParamDef {
    pub fn path(name: impl Into<String>) -> Self {
        ParamDef {
            name: name.into(),
            location: ParamLocation::Path,
            required: None,
        }
    }

    pub fn query(name: impl Into<String>) -> Self {
        ParamDef {
            name: name.into(),
            location: ParamLocation::Query,
            required: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
            .unwrap_or(self.location == ParamLocation::Path)
    }

    pub fn is_query(&self) -> bool {
        self.location == ParamLocation::Query
    }
}

/// A named URL template for one class of remote entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDef {
    pub name: String,
    #[serde(alias = "pathTemplate")]
    pub path: String,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    /// Identity attribute override. `Some("")` means the resource is
    /// addressed without an id; `None` falls back to the model's own.
    #[serde(default, alias = "idField", skip_serializing_if = "Option::is_none")]
    pub id_attribute: Option<String>,
}

impl ResourceDef {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        ResourceDef {
            name: name.into(),
            path: path.into(),
            params: Vec::new(),
            id_attribute: None,
        }
    }

    pub fn param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    pub fn id_attribute(mut self, id_attribute: impl Into<String>) -> Self {
        self.id_attribute = Some(id_attribute.into());
        self
    }

    /// Resource-relative path for `params` and an optional entity id.
    pub fn path_for(&self, params: &ParamMap, entity_id: Option<&str>) -> Result<String, ResourceError> {
        build_resource_path(self, params, entity_id)
    }
}

/// A base URL plus the resource definitions it serves. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceClient {
    pub base_url: String,
    #[serde(default)]
    resource_defs: Vec<ResourceDef>,
}

impl ResourceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ResourceClient {
            base_url: base_url.into(),
            resource_defs: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ResourceError> {
        let client: ResourceClient =
            serde_json::from_str(json).map_err(|e| ResourceError::InvalidConfig(e.to_string()))?;
        client.validate()
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ResourceError> {
        let client: ResourceClient = serde_json::from_value(value)
            .map_err(|e| ResourceError::InvalidConfig(e.to_string()))?;
        client.validate()
    }

    /// Register a definition. Fails if the name is already taken.
    pub fn with_resource(mut self, def: ResourceDef) -> Result<Self, ResourceError> {
        self.register(def)?;
        Ok(self)
    }

    pub fn register(&mut self, def: ResourceDef) -> Result<(), ResourceError> {
        if self.resource_defs.iter().any(|existing| existing.name == def.name) {
            return Err(ResourceError::DuplicateResource { resource: def.name });
        }
        self.resource_defs.push(def);
        Ok(())
    }

    pub fn resource_defs(&self) -> &[ResourceDef] {
        &self.resource_defs
    }

    pub fn find_resource_def(&self, resource: &str) -> Result<&ResourceDef, ResourceError> {
        find_resource_def(self, resource)
    }

    /// Absolute URL: base URL joined with the resource path.
    pub fn url_for(
        &self,
        def: &ResourceDef,
        params: &ParamMap,
        entity_id: Option<&str>,
    ) -> Result<String, ResourceError> {
        Ok(format!("{}{}", self.base_url, build_resource_path(def, params, entity_id)?))
    }

    fn validate(self) -> Result<Self, ResourceError> {
        let mut checked = ResourceClient::new(self.base_url);
        for def in self.resource_defs {
            checked.register(def)?;
        }
        Ok(checked)
    }
}

/// Look up a definition by name.
pub fn find_resource_def<'a>(
    client: &'a ResourceClient,
    resource: &str,
) -> Result<&'a ResourceDef, ResourceError> {
    client
        .resource_defs
        .iter()
        .find(|def| def.name == resource)
        .ok_or_else(|| ResourceError::ResourceNotFound {
            resource: resource.to_string(),
        })
}
