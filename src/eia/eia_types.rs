use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::{
    DataField, Facet, FacetOption, FetchError, Frequency, RouteDetails, RouteSummary,
};

// https://www.eia.gov/opendata/documentation.php
//
// Every endpoint wraps its payload in `{"response": {...}}`. Discovery calls
// put metadata directly in `response`; facet calls use `response.facets`;
// data calls use `response.data` and `response.total`.

#[derive(Debug, Deserialize)]
pub struct RouteWire {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FrequencyWire {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FacetWire {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DataFieldWire {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetailsWire {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub frequency: Vec<FrequencyWire>,
    #[serde(default)]
    pub default_frequency: Option<String>,
    #[serde(default)]
    pub facets: Vec<FacetWire>,
    /// Field id -> metadata, kept in the order the API lists the fields.
    #[serde(default)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct FacetValueWire {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<RouteWire> for RouteSummary {
    fn from(w: RouteWire) -> Self {
        RouteSummary {
            name: w.name.unwrap_or_else(|| w.id.clone()),
            description: w.description.unwrap_or_default(),
            id: w.id,
        }
    }
}

impl RouteDetailsWire {
    pub fn into_details(self, requested_id: &str) -> RouteDetails {
        let id = self.id.unwrap_or_else(|| requested_id.to_string());
        RouteDetails {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            description: self.description.unwrap_or_default(),
            frequencies: self
                .frequency
                .into_iter()
                .map(|f| Frequency {
                    description: f.description.unwrap_or_default(),
                    id: f.id,
                })
                .collect(),
            default_frequency: self.default_frequency,
            facets: self
                .facets
                .into_iter()
                .map(|f| Facet {
                    description: f.description.unwrap_or_else(|| f.id.clone()),
                    id: f.id,
                })
                .collect(),
            data_fields: self
                .data
                .into_iter()
                .map(|(id, meta)| {
                    let meta: DataFieldWire = serde_json::from_value(meta).unwrap_or_default();
                    DataField {
                        label: meta.alias.unwrap_or_else(|| id.clone()),
                        units: meta.units,
                        id,
                    }
                })
                .collect(),
        }
    }
}

impl From<FacetValueWire> for FacetOption {
    fn from(w: FacetValueWire) -> Self {
        let name = w.name.unwrap_or_else(|| w.id.clone());
        FacetOption {
            label: format!("{name} ({})", w.id),
            value: w.id,
        }
    }
}

/// Unwraps `{"response": ...}`.
pub fn response_of(body: &Value) -> Result<&Value, FetchError> {
    body.get("response").ok_or(FetchError::Shape("response"))
}

pub fn member<'a>(response: &'a Value, key: &'static str) -> Result<&'a Value, FetchError> {
    response.get(key).ok_or(FetchError::Shape(key))
}

/// `response.total` arrives as a number on some routes and as a numeric
/// string on others.
pub fn total_of(response: &Value) -> Result<u64, FetchError> {
    match member(response, "total")? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| FetchError::Decode(format!("total `{n}` is not a count"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| FetchError::Decode(format!("total `{s}` is not a count"))),
        _ => Err(FetchError::Shape("total")),
    }
}

pub fn records_of(response: &Value) -> Result<Vec<Map<String, Value>>, FetchError> {
    let data = member(response, "data")?
        .as_array()
        .ok_or(FetchError::Shape("data"))?;
    Ok(data
        .iter()
        .filter_map(|row| row.as_object().cloned())
        .collect())
}
