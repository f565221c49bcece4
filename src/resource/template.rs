use crate::error::ResourceError;
use crate::params::ParamMap;

use super::encode::encode_component;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Param { name: String, optional: bool },
}

/// A compiled path template with `:name` (or optional `:name?`) placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    tokens: Vec<Token>,
}

impl PathTemplate {
    pub fn compile(template: &str) -> Result<Self, ResourceError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != ':' {
                literal.push(c);
                continue;
            }

            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                return Err(ResourceError::InvalidTemplate {
                    template: template.to_string(),
                    reason: "placeholder without a name".to_string(),
                });
            }
            let optional = chars.next_if_eq(&'?').is_some();

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Param { name, optional });
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(PathTemplate {
            source: template.to_string(),
            tokens,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in template order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|token| match token {
            Token::Param { name, .. } => Some(name.as_str()),
            Token::Literal(_) => None,
        })
    }

    /// Substitute placeholders from `params`; values are percent-encoded.
    ///
    /// An unset optional placeholder drops itself and the `/` before it.
    pub fn expand(&self, params: &ParamMap, resource: &str) -> Result<String, ResourceError> {
        let mut path = String::with_capacity(self.source.len());
        for token in &self.tokens {
            match token {
                Token::Literal(text) => path.push_str(text),
                Token::Param { name, optional } => match params.get(name) {
                    Some(value) => path.push_str(&encode_component(&value.to_string())),
                    None if *optional => {
                        if path.ends_with('/') {
                            path.pop();
                        }
                    }
                    None => {
                        return Err(ResourceError::MissingParam {
                            param: name.clone(),
                            resource: resource.to_string(),
                        })
                    }
                },
            }
        }
        Ok(path)
    }
}
