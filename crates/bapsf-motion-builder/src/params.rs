//! Parsing of `type`-tagged parameter tables

use bapsf_motion_core::{Result, ValidationError};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// A scalar broadcast to every axis, or one value per axis
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    /// Resolve to exactly `ndims` values
    pub(crate) fn broadcast(self, param: &str, ndims: usize) -> Result<Vec<T>> {
        match self {
            Self::One(value) => Ok(vec![value; ndims]),
            Self::Many(values) if values.len() == 1 => Ok(vec![values[0].clone(); ndims]),
            Self::Many(values) if values.len() == ndims => Ok(values),
            Self::Many(values) => Err(ValidationError::Shape {
                param: param.to_string(),
                expected: format!("1 or {ndims} values"),
                actual: format!("{} values", values.len()),
            }
            .into()),
        }
    }
}

/// Deserialize the parameters of `item_type`, ignoring the `type` key
pub(crate) fn parse_params<P>(item_type: &str, params: &toml::Table) -> Result<P>
where
    P: DeserializeOwned,
{
    let mut params = params.clone();
    params.remove("type");
    toml::Value::Table(params).try_into().map_err(|e: toml::de::Error| {
        ValidationError::invalid(item_type, e.message().to_string()).into()
    })
}

/// The `type` tag of a layer or exclusion configuration
pub(crate) fn type_tag<'a>(kind: &str, config: &'a toml::Table) -> Result<&'a str> {
    config.get("type").and_then(|v| v.as_str()).ok_or_else(|| {
        ValidationError::MissingParameter {
            param: format!("{kind}.type"),
        }
        .into()
    })
}

pub(crate) fn float_array(values: &[f64]) -> toml::Value {
    toml::Value::Array(values.iter().map(|v| toml::Value::Float(*v)).collect())
}

pub(crate) fn integer_array(values: &[usize]) -> toml::Value {
    toml::Value::Array(values.iter().map(|v| toml::Value::Integer(*v as i64)).collect())
}
