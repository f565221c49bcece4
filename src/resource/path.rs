use crate::error::ResourceError;
use crate::params::ParamMap;

use super::encode::encode_component;
use super::template::PathTemplate;
use super::ResourceDef;

/// Build the resource-relative request path.
///
/// Required parameters are checked first, so a missing one never yields a
/// partial path. Query params are appended in declaration order. A non-empty
/// `entity_id` is appended after exactly one `/`.
pub fn build_resource_path(
    def: &ResourceDef,
    params: &ParamMap,
    entity_id: Option<&str>,
) -> Result<String, ResourceError> {
    let mut query = Vec::new();
    for param in &def.params {
        let value = params.get(&param.name);
        if param.is_required() && value.is_none() {
            return Err(ResourceError::MissingParam {
                param: param.name.clone(),
                resource: def.name.clone(),
            });
        }
        if let (true, Some(value)) = (param.is_query(), value) {
            query.push(format!(
                "{}={}",
                encode_component(&param.name),
                encode_component(&value.to_string())
            ));
        }
    }

    let template = PathTemplate::compile(&def.path)?;
    let mut path = template.expand(params, &def.name)?;

    if let Some(id) = entity_id.filter(|id| !id.is_empty()) {
        if !path.is_empty() && !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(&encode_component(id));
    }

    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }

    Ok(path)
}
