//! Open-ended parameter bags.
//!
//! `folio.toml` and every `book.toml` may carry arbitrary keys beyond the
//! ones folio understands. They are kept verbatim as [`Params`] so layouts
//! can reference custom fields (`{{ book.params.patreon }}`). Nothing here
//! is validated.

use serde::Serialize;
use std::collections::BTreeMap;

pub type Params = BTreeMap<String, ParamValue>;

/// A dynamically typed configuration value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ParamValue>),
    Map(Params),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ParamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Params> {
        match self {
            ParamValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<toml::Value> for ParamValue {
    fn from(value: toml::Value) -> Self {
        match value {
            toml::Value::String(s) => ParamValue::String(s),
            toml::Value::Integer(i) => ParamValue::Integer(i),
            toml::Value::Float(f) => ParamValue::Float(f),
            toml::Value::Boolean(b) => ParamValue::Bool(b),
            // Dates have no dedicated variant; layouts see their TOML text.
            toml::Value::Datetime(d) => ParamValue::String(d.to_string()),
            toml::Value::Array(items) => {
                ParamValue::List(items.into_iter().map(ParamValue::from).collect())
            }
            toml::Value::Table(table) => ParamValue::Map(params_from_table(table)),
        }
    }
}

/// Convert a raw TOML table into a parameter bag.
pub fn params_from_table(table: toml::Table) -> Params {
    table
        .into_iter()
        .map(|(key, value)| (key, ParamValue::from(value)))
        .collect()
}
