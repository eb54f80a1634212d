//! Build parameters and their encoding into registry custom properties.
//!
//! The registry only stores scalar strings and one opaque "struct" blob per
//! key, so string lists travel as base64-encoded JSON arrays.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{EdgeError, Result};

/// Custom property flagging a version as carrying everything the build needs.
pub const EDGE_COMPATIBLE_KEY: &str = "edgeCompatible";

/// A build parameter value. Any other shape is rejected when parameters are
/// ingested (see [`crate::params`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self { ParamValue::String(s) => Some(s), ParamValue::List(_) => None }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self { ParamValue::String(s.to_string()) }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self { ParamValue::String(s) }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self { ParamValue::List(v) }
}

pub type ParamMap = BTreeMap<String, ParamValue>;

/// Registry metadata value, tagged on the wire by `metadataType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "metadataType")]
pub enum MetadataValue {
    #[serde(rename = "MetadataStringValue")]
    String { string_value: String },
    #[serde(rename = "MetadataStructValue")]
    Struct { struct_value: String },
    /// Int/double/bool/proto values and anything added upstream later.
    #[serde(other)]
    Unknown,
}

impl MetadataValue {
    pub fn string(s: impl Into<String>) -> Self { MetadataValue::String { string_value: s.into() } }
}

pub type CustomProperties = BTreeMap<String, MetadataValue>;

#[derive(Deserialize)]
#[serde(untagged)]
enum EncodedList {
    Array(Vec<String>),
    Items { items: Vec<String> },
}

pub fn encode(params: &ParamMap) -> Result<CustomProperties> {
    let mut props = CustomProperties::new();
    for (key, value) in params {
        let encoded = match value {
            ParamValue::String(s) => MetadataValue::string(s.clone()),
            ParamValue::List(items) => {
                let json = serde_json::to_vec(items)
                    .map_err(|e| EdgeError::Codec { key: key.clone(), reason: e.to_string() })?;
                MetadataValue::Struct { struct_value: STANDARD.encode(json) }
            }
        };
        props.insert(key.clone(), encoded);
    }
    Ok(props)
}

/// Inverse of [`encode`]. Values of kinds this crate does not understand are
/// skipped; a struct blob that is not a base64 JSON string list is an error.
pub fn decode(props: &CustomProperties) -> Result<ParamMap> {
    let mut params = ParamMap::new();
    for (key, value) in props {
        match value {
            MetadataValue::String { string_value } => {
                params.insert(key.clone(), ParamValue::String(string_value.clone()));
            }
            MetadataValue::Struct { struct_value } => {
                params.insert(key.clone(), ParamValue::List(decode_list(key, struct_value)?));
            }
            MetadataValue::Unknown => continue,
        }
    }
    Ok(params)
}

fn decode_list(key: &str, blob: &str) -> Result<Vec<String>> {
    let codec_err = |reason: String| EdgeError::Codec { key: key.to_string(), reason };
    let raw = STANDARD.decode(blob.trim()).map_err(|e| codec_err(e.to_string()))?;
    // older writers wrapped the list as {"items": [...]}
    match serde_json::from_slice::<EncodedList>(&raw).map_err(|e| codec_err(e.to_string()))? {
        EncodedList::Array(items) | EncodedList::Items { items } => Ok(items),
    }
}

/// Copy of `params` with the edge-compatible flag set.
pub fn mark_edge_compatible(params: &ParamMap) -> ParamMap {
    let mut out = params.clone();
    out.insert(EDGE_COMPATIBLE_KEY.to_string(), ParamValue::from("true"));
    out
}
