use crate::types::{FacetSelection, FetchError, Period};

/// Field used to probe a route when nothing better is known. The API returns
/// no rows for a data request that names no data columns.
pub const FALLBACK_PROBE_FIELD: &str = "price";

/// Picks the field to probe a route with: the fallback when the route lists
/// it, otherwise the route's first field.
pub fn probe_field<'a>(field_ids: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut first = None;
    for id in field_ids {
        if id == FALLBACK_PROBE_FIELD {
            return Some(id.to_string());
        }
        first.get_or_insert(id);
    }
    first.map(str::to_string)
}

/// Filter for discovering which periods exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodQuery {
    pub route_id: String,
    pub frequency: String,
    pub facets: FacetSelection,
    pub probe_field: Option<String>,
}

/// Everything that shapes one data fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableQuery {
    pub route_id: String,
    pub frequency: String,
    pub facets: FacetSelection,
    pub fields: Vec<String>,
    pub start: Option<Period>,
    pub end: Option<Period>,
    pub max_rows: Option<usize>,
}

pub(crate) fn filter_params(
    api_key: &str,
    frequency: &str,
    facets: &FacetSelection,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("api_key".to_string(), api_key.to_string()),
        ("frequency".to_string(), frequency.to_lowercase()),
    ];
    for (facet_id, values) in facets {
        for value in values {
            params.push((format!("facets[{facet_id}][]"), value.clone()));
        }
    }
    params
}

impl PeriodQuery {
    pub(crate) fn params(&self, api_key: &str, offset: u64, length: u64) -> Vec<(String, String)> {
        let mut params = filter_params(api_key, &self.frequency, &self.facets);
        let probe = self
            .probe_field
            .as_deref()
            .unwrap_or(FALLBACK_PROBE_FIELD);
        params.push(("data[0]".to_string(), probe.to_string()));
        params.push(("offset".to_string(), offset.to_string()));
        params.push(("length".to_string(), length.to_string()));
        params
    }
}

impl TableQuery {
    pub(crate) fn params(&self, api_key: &str) -> Result<Vec<(String, String)>, FetchError> {
        if self.fields.is_empty() {
            return Err(FetchError::InvalidInput("no data fields selected".into()));
        }

        let mut params = filter_params(api_key, &self.frequency, &self.facets);
        params.push(("offset".to_string(), "0".to_string()));
        for (i, field) in self.fields.iter().enumerate() {
            params.push((format!("data[{i}]"), field.clone()));
        }

        if let Some(start) = &self.start {
            let value = start
                .start_param()
                .ok_or_else(|| FetchError::InvalidInput(format!("unrecognised start period `{start}`")))?;
            params.push(("start".to_string(), value));
        }
        if let Some(end) = &self.end {
            let value = end
                .end_param()
                .ok_or_else(|| FetchError::InvalidInput(format!("unrecognised end period `{end}`")))?;
            params.push(("end".to_string(), value));
        }

        // Newest rows first so a row cap keeps the most recent observations.
        params.push(("sort[0][column]".to_string(), "period".to_string()));
        params.push(("sort[0][direction]".to_string(), "desc".to_string()));

        if let Some(max_rows) = self.max_rows {
            params.push(("length".to_string(), max_rows.to_string()));
        }
        Ok(params)
    }
}
