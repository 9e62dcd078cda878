//! # Statistics API client
//!
//! Wraps the EIA v2 open-data API: route discovery, per-route metadata,
//! facet values, period discovery and filtered data fetches.
//!
//! Nothing here raises on a remote failure. Every call comes back as a
//! [`Fetched`] so the form can tell "the API has nothing" from "the call
//! went wrong" without per-call error plumbing. There is no retry and no
//! caching at this level; routes are fetched fresh each time they are asked
//! for.

mod client;
mod eia_types;
mod query;

use std::fmt::Display;
use std::sync::Arc;

pub use query::*;

use crate::http::Transport;
use crate::types::{
    DataField, FacetOption, Fetched, ObservationTable, Period, RouteDetails, RouteSummary,
};

pub const DEFAULT_EIA_URL: &str = "https://api.eia.gov/v2/electricity/";

/// Everything the form needs from a statistics backend.
pub trait DataSource: Send + Sync {
    fn list_routes(&self) -> Fetched<Vec<RouteSummary>>;

    fn route_details(&self, route_id: &str) -> Fetched<RouteDetails>;

    fn facet_options(&self, route_id: &str, facet_id: &str) -> Fetched<Vec<FacetOption>>;

    fn data_fields(&self, route_id: &str) -> Fetched<Vec<DataField>> {
        match self.route_details(route_id) {
            Fetched::Ready(details) if !details.data_fields.is_empty() => {
                Fetched::Ready(details.data_fields)
            }
            Fetched::Failed(e) => Fetched::Failed(e),
            _ => Fetched::Empty,
        }
    }

    /// Sorted, de-duplicated periods that have data for the filter.
    fn available_periods(&self, query: &PeriodQuery) -> Fetched<Vec<Period>>;

    fn fetch_table(&self, query: &TableQuery) -> Fetched<ObservationTable>;
}

#[derive(Clone)]
pub struct EiaClient {
    url: String,
    api_key: String,
    transport: Arc<dyn Transport>,
}

impl EiaClient {
    pub fn new(url: impl Display, api_key: impl Display, transport: Arc<dyn Transport>) -> Self {
        let mut client = EiaClient {
            url: String::new(),
            api_key: api_key.to_string(),
            transport,
        };
        client.set_url(url);
        client
    }

    fn set_url(&mut self, url: impl Display) {
        let mut url = url.to_string();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.url = url;
    }
}
