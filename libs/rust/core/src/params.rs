//! Build parameter files.
//!
//! A parameter file is a YAML mapping whose values are strings or lists of
//! strings. Other shapes are rejected here, naming the key, so the rest of
//! the crate only ever sees [`ParamValue`].

use std::path::Path;

use serde_yaml::Value;

use crate::error::{EdgeError, Result};
use crate::metadata::{ParamMap, ParamValue};

pub fn read_params(path: impl AsRef<Path>) -> Result<ParamMap> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| EdgeError::Params { path: path.display().to_string(), reason: e.to_string() })?;
    parse_params(&text).map_err(|e| match e {
        EdgeError::Params { reason, .. } => EdgeError::Params { path: path.display().to_string(), reason },
        other => other,
    })
}

pub fn parse_params(text: &str) -> Result<ParamMap> {
    let invalid = |reason: String| EdgeError::Params { path: "<inline>".into(), reason };
    let doc: Value = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
    let mapping = match doc {
        Value::Null => return Ok(ParamMap::new()),
        Value::Mapping(m) => m,
        _ => return Err(invalid("expected a mapping of parameter names to values".into())),
    };
    let mut params = ParamMap::new();
    for (k, v) in mapping {
        let key = match k {
            Value::String(key) => key,
            other => return Err(invalid(format!("parameter name {other:?} is not a string"))),
        };
        let value = to_param_value(&key, v)?;
        params.insert(key, value);
    }
    Ok(params)
}

fn to_param_value(key: &str, value: Value) -> Result<ParamValue> {
    match value {
        Value::String(s) => Ok(ParamValue::String(s)),
        Value::Sequence(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(EdgeError::validation(key, format!("has unsupported list element {other:?}; only strings are supported"))),
            })
            .collect::<Result<Vec<_>>>()
            .map(ParamValue::List),
        other => Err(EdgeError::validation(key, format!("has unsupported type {other:?}; only string and list of strings are supported"))),
    }
}
